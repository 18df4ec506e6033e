use super::dispatcher::Dispatcher;
use super::models::{LoginRequest, LoginResponse};
use crate::error::{AppError, AppResult};

pub const LOGIN_ENDPOINT: &str = "/auth/login";

/// Exchange email and password for an access token.
pub async fn login(d: &Dispatcher, email: &str, password: &str) -> AppResult<LoginResponse> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::validation("invalid_login".to_string(), "email and password are required".to_string()));
    }
    let body = LoginRequest { email: email.to_string(), password: password.to_string() };
    d.post_json(LOGIN_ENDPOINT, &body).await
}
