//! Bearer-token check for the admin area. The original left admin routes
//! unauthenticated; here the boundary is explicit.

use salvo::http::header::AUTHORIZATION;
use salvo::prelude::*;
use salvo::Scribe;

use crate::error::AppError;

use super::AppState;

/// Blocks the request with 401 unless it carries the configured admin
/// bearer token. When no token is configured the check is disabled
/// (development mode; a warning is logged at startup).
#[handler]
pub async fn require_admin(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let Ok(state) = depot.obtain::<AppState>() else {
        AppError::Config("application state missing".to_string()).render(res);
        ctrl.skip_rest();
        return;
    };

    let Some(expected) = state.config.admin_token.as_deref() else {
        return;
    };

    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected);

    if !authorized {
        AppError::Unauthorized.render(res);
        ctrl.skip_rest();
    }
}
