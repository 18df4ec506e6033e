//! Wire types for the portal REST API. Field names follow the backend's camelCase JSON.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Backend identifiers arrive as numbers or strings depending on the entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{n}"),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for EntityId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AppError::validation("invalid_id".to_string(), "identifier must not be empty".to_string()));
        }
        Ok(s.parse::<i64>().map(EntityId::Number).unwrap_or_else(|_| EntityId::Text(s.to_string())))
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self { EntityId::Number(n) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Condition {
    #[default]
    New,
    Good,
    Fair,
    Poor,
    Damaged,
}

impl Condition {
    pub const ALL: [Condition; 5] = [Condition::New, Condition::Good, Condition::Fair, Condition::Poor, Condition::Damaged];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "NEW",
            Condition::Good => "GOOD",
            Condition::Fair => "FAIR",
            Condition::Poor => "POOR",
            Condition::Damaged => "DAMAGED",
        }
    }
}

impl FromStr for Condition {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let up = s.trim().to_ascii_uppercase();
        Condition::ALL.into_iter().find(|c| c.as_str() == up).ok_or_else(|| {
            AppError::validation(
                "invalid_condition".to_string(),
                format!("condition must be one of NEW, GOOD, FAIR, POOR, DAMAGED (got '{s}')"),
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Returned => "RETURNED",
        }
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" | "APPROVE" => Ok(RequestStatus::Approved),
            "REJECTED" | "REJECT" => Ok(RequestStatus::Rejected),
            "RETURNED" | "RETURN" => Ok(RequestStatus::Returned),
            _ => Err(AppError::validation("invalid_status".to_string(), format!("unknown request status '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserDetails {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserDetails {
    pub fn display_name(&self) -> &str {
        self.preferred_username.as_deref().or(self.email.as_deref()).unwrap_or("user")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub equipment_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_quantity: u32,
    #[serde(default)]
    pub borrowed_count: u32,
    #[serde(default)]
    pub available_quantity: u32,
}

/// Body for creating or updating an equipment item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentInput {
    pub name: String,
    pub category: String,
    pub condition: Condition,
    pub total_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EquipmentInput {
    /// Trimmed copy, or a validation error naming the first bad field.
    pub fn normalized(&self) -> AppResult<Self> {
        let name = self.name.trim().to_string();
        let category = self.category.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("invalid_equipment".to_string(), "name is required".to_string()));
        }
        if category.is_empty() {
            return Err(AppError::validation("invalid_equipment".to_string(), "category is required".to_string()));
        }
        if self.total_quantity < 1 {
            return Err(AppError::validation("invalid_equipment".to_string(), "total quantity must be at least 1".to_string()));
        }
        let description = self.description.as_deref().map(str::trim).filter(|d| !d.is_empty()).map(str::to_string);
        Ok(Self { name, category, condition: self.condition, total_quantity: self.total_quantity, description })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub equipment_id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    #[serde(default)]
    pub requested_quantity: u32,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    pub status: RequestStatus,
}

impl BorrowRequest {
    /// `requestId` when the backend sends one, else `id`.
    pub fn display_id(&self) -> Option<&EntityId> {
        self.request_id.as_ref().or(self.id.as_ref())
    }
}

/// A request joined with the name of the equipment it asks for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRequest {
    #[serde(flatten)]
    pub request: BorrowRequest,
    pub equipment_name: String,
    pub display_id: Option<EntityId>,
}

pub const UNKNOWN_EQUIPMENT: &str = "Unknown Equipment";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewBorrowRequest {
    pub equipment_id: EntityId,
    pub requested_quantity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    pub status: RequestStatus,
}

impl NewBorrowRequest {
    pub fn new(equipment_id: EntityId, requested_quantity: u32, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self { equipment_id, requested_quantity, start_date, end_date, user_id: None, status: RequestStatus::Pending }
    }

    /// Check the form against the equipment currently in stock.
    pub fn validate(&self, available: &[Equipment]) -> AppResult<()> {
        if self.requested_quantity == 0 {
            return Err(AppError::validation("invalid_request".to_string(), "quantity must be at least 1".to_string()));
        }
        if self.start_date > self.end_date {
            return Err(AppError::validation("invalid_request".to_string(), "start date must not be after end date".to_string()));
        }
        let Some(item) = available.iter().find(|e| e.equipment_id == self.equipment_id) else {
            return Err(AppError::validation(
                "invalid_request".to_string(),
                format!("equipment {} is not available for borrowing", self.equipment_id),
            ));
        };
        if self.requested_quantity > item.available_quantity {
            return Err(AppError::validation(
                "invalid_request".to_string(),
                format!("only {} of {} available", item.available_quantity, item.name),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: RequestStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    #[serde(default)]
    pub total_equipment: u64,
    #[serde(default)]
    pub pending_requests_count: Option<u64>,
    #[serde(default)]
    pub available_items: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: i64, available: u32) -> Equipment {
        Equipment {
            equipment_id: EntityId::Number(id),
            name: format!("item-{id}"),
            category: "Sports".into(),
            condition: Some(Condition::Good),
            description: None,
            total_quantity: available + 1,
            borrowed_count: 1,
            available_quantity: available,
        }
    }

    fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

    #[test]
    fn equipment_accepts_backend_shape() {
        let e: Equipment = serde_json::from_value(json!({
            "equipmentId": "3f2a-11", "name": "Microscope", "category": "Lab",
            "condition": "FAIR", "totalQuantity": 4, "borrowedCount": 1, "availableQuantity": 3
        }))
        .unwrap();
        assert_eq!(e.equipment_id, EntityId::Text("3f2a-11".into()));
        assert_eq!(e.condition, Some(Condition::Fair));
        assert_eq!(e.available_quantity, 3);
        let n: Equipment = serde_json::from_value(json!({"equipmentId": 9, "name": "Ball"})).unwrap();
        assert_eq!(n.equipment_id, EntityId::Number(9));
        assert_eq!(n.total_quantity, 0);
    }

    #[test]
    fn equipment_input_trims_and_validates() {
        let raw = EquipmentInput {
            name: "  Tripod ".into(),
            category: " AV".into(),
            condition: Condition::New,
            total_quantity: 2,
            description: Some("   ".into()),
        };
        let ok = raw.normalized().unwrap();
        assert_eq!(ok.name, "Tripod");
        assert_eq!(ok.category, "AV");
        assert_eq!(ok.description, None);

        assert!(EquipmentInput { name: " ".into(), ..raw.clone() }.normalized().is_err());
        assert!(EquipmentInput { category: "".into(), ..raw.clone() }.normalized().is_err());
        assert!(EquipmentInput { total_quantity: 0, ..raw }.normalized().is_err());
    }

    #[test]
    fn new_request_serializes_camel_case_with_pending_status() {
        let r = NewBorrowRequest::new(EntityId::Number(4), 2, date("2025-03-01"), date("2025-03-05"));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, json!({
            "equipmentId": 4, "requestedQuantity": 2,
            "startDate": "2025-03-01", "endDate": "2025-03-05", "status": "PENDING"
        }));
    }

    #[test]
    fn new_request_validation() {
        let stock = vec![item(1, 3), item(2, 0)];
        let ok = NewBorrowRequest::new(1.into(), 3, date("2025-01-01"), date("2025-01-01"));
        assert!(ok.validate(&stock).is_ok());
        assert!(NewBorrowRequest { requested_quantity: 0, ..ok.clone() }.validate(&stock).is_err());
        assert!(NewBorrowRequest { requested_quantity: 4, ..ok.clone() }.validate(&stock).is_err());
        assert!(NewBorrowRequest { equipment_id: 7.into(), ..ok.clone() }.validate(&stock).is_err());
        assert!(NewBorrowRequest { start_date: date("2025-02-01"), ..ok }.validate(&stock).is_err());
    }

    #[test]
    fn display_id_prefers_request_id() {
        let mut r: BorrowRequest = serde_json::from_value(json!({
            "id": 10, "requestId": "R-10", "equipmentId": 1, "status": "APPROVED"
        }))
        .unwrap();
        assert_eq!(r.display_id(), Some(&EntityId::Text("R-10".into())));
        r.request_id = None;
        assert_eq!(r.display_id(), Some(&EntityId::Number(10)));
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("approve".parse::<RequestStatus>().unwrap(), RequestStatus::Approved);
        assert_eq!("Returned".parse::<RequestStatus>().unwrap(), RequestStatus::Returned);
        assert_eq!("damaged".parse::<Condition>().unwrap(), Condition::Damaged);
        assert!("broken".parse::<Condition>().is_err());
        assert_eq!("42".parse::<EntityId>().unwrap(), EntityId::Number(42));
        assert_eq!("ab-1".parse::<EntityId>().unwrap(), EntityId::Text("ab-1".into()));
    }

    #[test]
    fn analytics_defaults_missing_counts() {
        let a: AnalyticsSummary = serde_json::from_value(json!({"totalEquipment": 12})).unwrap();
        assert_eq!(a.total_equipment, 12);
        assert_eq!(a.pending_requests_count, None);
        assert_eq!(a.available_items, 0);
    }
}
