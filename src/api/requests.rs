use std::collections::HashMap;

use super::dispatcher::Dispatcher;
use super::models::{
    BorrowRequest, EnrichedRequest, EntityId, Equipment, NewBorrowRequest, RequestStatus, StatusUpdate,
    UNKNOWN_EQUIPMENT,
};
use super::{empty_on_not_found, equipment};
use crate::error::{AppError, AppResult};
use crate::identity::Role;

const REQUEST_API: &str = "/requests";

fn user_path(user_id: &str) -> String {
    format!("{}/user/{}", REQUEST_API, urlencoding::encode(user_id))
}

/// Borrow requests owned by one user, optionally filtered by status.
pub async fn for_user(d: &Dispatcher, user_id: &str, status: Option<RequestStatus>) -> AppResult<Vec<BorrowRequest>> {
    let query: Vec<(&str, &str)> = status.map(|s| vec![("status", s.as_str())]).unwrap_or_default();
    empty_on_not_found(d.get_json(&user_path(user_id), &query).await, "requests")
}

/// Requests across all users in a given state (the approval queue).
pub async fn by_status(d: &Dispatcher, status: RequestStatus) -> AppResult<Vec<BorrowRequest>> {
    empty_on_not_found(d.get_json(REQUEST_API, &[("status", status.as_str())]).await, "requests")
}

/// What the dashboard and request screens show for `role`.
pub async fn queue_for(d: &Dispatcher, role: Role, user_id: Option<&str>) -> AppResult<Vec<BorrowRequest>> {
    match role {
        Role::Student => {
            let Some(uid) = user_id else {
                return Err(AppError::validation("missing_user_id".to_string(), "no user id in the current session".to_string()));
            };
            for_user(d, uid, None).await
        }
        Role::Staff | Role::Admin => by_status(d, RequestStatus::Pending).await,
    }
}

/// Attach equipment names to requests.
pub fn enrich(requests: Vec<BorrowRequest>, inventory: &[Equipment]) -> Vec<EnrichedRequest> {
    let names: HashMap<&EntityId, &str> = inventory.iter().map(|e| (&e.equipment_id, e.name.as_str())).collect();
    requests
        .into_iter()
        .map(|request| {
            let equipment_name = names.get(&request.equipment_id).copied().unwrap_or(UNKNOWN_EQUIPMENT).to_string();
            let display_id = request.display_id().cloned();
            EnrichedRequest { request, equipment_name, display_id }
        })
        .collect()
}

pub async fn enriched_for_user(d: &Dispatcher, user_id: &str) -> AppResult<Vec<EnrichedRequest>> {
    let requests = for_user(d, user_id, None).await?;
    let inventory = equipment::list(d, None).await?;
    Ok(enrich(requests, &inventory))
}

/// Validate against current stock, then submit. The backend may return the
/// stored request or an empty body.
pub async fn create(d: &Dispatcher, request: &NewBorrowRequest) -> AppResult<Option<BorrowRequest>> {
    let stock = equipment::available(d).await?;
    request.validate(&stock)?;
    d.post_optional(REQUEST_API, request).await
}

pub async fn update_status(d: &Dispatcher, id: &EntityId, status: RequestStatus) -> AppResult<Option<BorrowRequest>> {
    let path = format!("{}/{}", REQUEST_API, urlencoding::encode(&id.to_string()));
    d.put_optional(&path, &StatusUpdate { status }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enrich_falls_back_to_unknown_equipment() {
        let inventory: Vec<Equipment> = serde_json::from_value(json!([
            {"equipmentId": 1, "name": "Camera"}
        ]))
        .unwrap();
        let requests: Vec<BorrowRequest> = serde_json::from_value(json!([
            {"requestId": 11, "equipmentId": 1, "status": "PENDING"},
            {"id": 12, "equipmentId": 2, "status": "REJECTED"}
        ]))
        .unwrap();
        let out = enrich(requests, &inventory);
        assert_eq!(out[0].equipment_name, "Camera");
        assert_eq!(out[0].display_id, Some(EntityId::Number(11)));
        assert_eq!(out[1].equipment_name, UNKNOWN_EQUIPMENT);
        assert_eq!(out[1].display_id, Some(EntityId::Number(12)));
    }

    #[test]
    fn user_paths_are_encoded() {
        assert_eq!(user_path("7"), "/requests/user/7");
        assert_eq!(user_path("a/b"), "/requests/user/a%2Fb");
    }
}
