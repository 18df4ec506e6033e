use super::dispatcher::Dispatcher;
use super::models::AnalyticsSummary;
use crate::error::AppResult;

/// Inventory and approval counts for the admin dashboard.
pub async fn summary(d: &Dispatcher) -> AppResult<AnalyticsSummary> {
    d.get_json("/analytics/summary", &[]).await
}
