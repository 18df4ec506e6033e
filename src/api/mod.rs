//! Typed access to the portal REST API.
//! `Dispatcher` owns transport and credential attachment; the sibling modules
//! are thin per-resource wrappers over it.

mod dispatcher;
pub mod models;
pub mod auth;
pub mod users;
pub mod equipment;
pub mod requests;
pub mod analytics;

pub use dispatcher::{Dispatcher, PUBLIC_ENDPOINTS};
pub use models::*;

use tracing::info;

use crate::error::{AppError, AppResult};

/// List endpoints answer 404 when there is nothing to list.
pub(crate) fn empty_on_not_found<T>(res: AppResult<Vec<T>>, what: &str) -> AppResult<Vec<T>> {
    match res {
        Err(AppError::NotFound { .. }) => {
            info!(target: "lendportal::api", "api.list {} returned 404, treating as empty", what);
            Ok(Vec::new())
        }
        other => other,
    }
}
