use super::dispatcher::Dispatcher;
use super::empty_on_not_found;
use super::models::{EntityId, Equipment, EquipmentInput};
use crate::error::AppResult;

const EQUIPMENT_API: &str = "/equipment";

fn item_path(id: &EntityId) -> String {
    format!("{}/{}", EQUIPMENT_API, urlencoding::encode(&id.to_string()))
}

/// All equipment, optionally filtered by a name/category search term.
/// The backend answers 404 for an empty inventory; that is an empty list here.
pub async fn list(d: &Dispatcher, search: Option<&str>) -> AppResult<Vec<Equipment>> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let query: Vec<(&str, &str)> = search.map(|s| vec![("search", s)]).unwrap_or_default();
    empty_on_not_found(d.get_json(EQUIPMENT_API, &query).await, "equipment")
}

/// Items with at least one unit in stock.
pub async fn available(d: &Dispatcher) -> AppResult<Vec<Equipment>> {
    let all = list(d, None).await?;
    Ok(all.into_iter().filter(|e| e.available_quantity > 0).collect())
}

pub async fn get(d: &Dispatcher, id: &EntityId) -> AppResult<Equipment> {
    d.get_json(&item_path(id), &[]).await
}

pub async fn create(d: &Dispatcher, input: &EquipmentInput) -> AppResult<Equipment> {
    let body = input.normalized()?;
    d.post_json(EQUIPMENT_API, &body).await
}

pub async fn update(d: &Dispatcher, id: &EntityId, input: &EquipmentInput) -> AppResult<Equipment> {
    let body = input.normalized()?;
    d.put_json(&item_path(id), &body).await
}

pub async fn delete(d: &Dispatcher, id: &EntityId) -> AppResult<()> {
    d.delete(&item_path(id)).await
}
