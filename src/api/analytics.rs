use salvo::prelude::*;

use crate::error::AppError;
use crate::models::DashboardStats;

use super::envelope::ApiEnvelope;
use super::{auth, state};

pub fn routes() -> Router {
    Router::with_path("analytics")
        .hoop(auth::require_admin)
        .push(Router::with_path("dashboard").get(dashboard))
}

#[handler]
pub async fn dashboard(depot: &mut Depot) -> Result<Json<ApiEnvelope<DashboardStats>>, AppError> {
    let state = state(depot)?;
    let stats = state.repo.dashboard_stats().await?;
    Ok(Json(ApiEnvelope::data(stats)))
}
