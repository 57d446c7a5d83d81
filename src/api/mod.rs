//! HTTP surface: the route tree, the response envelope, and the admin
//! auth boundary. Handlers stay thin; persistence lives in [`crate::db`]
//! and generation in [`crate::ai`].

pub mod ai;
pub mod analytics;
pub mod auth;
pub mod categories;
mod envelope;
pub mod posts;

use std::sync::Arc;

use salvo::logging::Logger;
use salvo::prelude::*;

use crate::ai::GeminiClient;
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};

pub use envelope::{ApiEnvelope, Pagination};

/// Shared per-process state, injected into every request's depot. The
/// repository handle is passed in explicitly at startup; nothing here is
/// a process-wide global.
#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    pub ai: Option<Arc<GeminiClient>>,
    pub config: Arc<Config>,
}

pub(crate) fn state(depot: &Depot) -> Result<&AppState> {
    depot
        .obtain::<AppState>()
        .map_err(|_| AppError::Config("application state missing".to_string()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .hoop(affix_state::inject(state))
        .hoop(Logger::new())
        .push(
            Router::with_path("api")
                .push(posts::routes())
                .push(categories::routes())
                .push(ai::routes())
                .push(analytics::routes()),
        )
}
