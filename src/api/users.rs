use super::dispatcher::Dispatcher;
use super::models::UserDetails;
use crate::error::AppResult;

pub async fn me(d: &Dispatcher) -> AppResult<UserDetails> {
    d.get_json("/users/me", &[]).await
}
