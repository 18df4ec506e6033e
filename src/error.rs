//! Unified client error model.
//! Every service call, session operation and CLI command reports failures through
//! `AppError`, so screens can render an inline message and keep running.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    Decode { code: String, message: String },
    Extraction { code: String, message: String },
    Auth { code: String, message: String },
    Network { code: String, message: String },
    Api { code: String, message: String, status: u16 },
    NotFound { code: String, message: String },
    Validation { code: String, message: String },
    Storage { code: String, message: String },
    Config { code: String, message: String },
    Cancelled { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Decode { code, .. }
            | AppError::Extraction { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Network { code, .. }
            | AppError::Api { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Validation { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Config { code, .. }
            | AppError::Cancelled { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Decode { message, .. }
            | AppError::Extraction { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Network { message, .. }
            | AppError::Api { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Validation { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Config { message, .. }
            | AppError::Cancelled { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn decode<S: Into<String>>(code: S, msg: S) -> Self { AppError::Decode { code: code.into(), message: msg.into() } }
    pub fn extraction<S: Into<String>>(code: S, msg: S) -> Self { AppError::Extraction { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn network<S: Into<String>>(code: S, msg: S) -> Self { AppError::Network { code: code.into(), message: msg.into() } }
    pub fn api<S: Into<String>>(status: u16, code: S, msg: S) -> Self { AppError::Api { code: code.into(), message: msg.into(), status } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn storage<S: Into<String>>(code: S, msg: S) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn config<S: Into<String>>(code: S, msg: S) -> Self { AppError::Config { code: code.into(), message: msg.into() } }
    pub fn cancelled<S: Into<String>>(code: S, msg: S) -> Self { AppError::Cancelled { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to an HTTP-like status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Decode { .. } | AppError::Extraction { .. } => 401,
            AppError::Auth { .. } => 401,
            AppError::Network { .. } => 503,
            AppError::Api { status, .. } => *status,
            AppError::NotFound { .. } => 404,
            AppError::Validation { .. } => 400,
            AppError::Storage { .. } => 500,
            AppError::Config { .. } => 500,
            AppError::Cancelled { .. } => 499,
            AppError::Internal { .. } => 500,
        }
    }

    /// True for failures that end the current login (session must be cleared).
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, AppError::Decode { .. } | AppError::Extraction { .. } | AppError::Auth { .. })
    }

    /// Short message suitable for an inline alert on a screen.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Decode { .. } | AppError::Extraction { .. } => {
                "Login failed. Please check your credentials.".to_string()
            }
            AppError::Auth { .. } => "Your session has ended. Please log in again.".to_string(),
            AppError::Network { .. } => "Could not reach the portal. Please check the API connection.".to_string(),
            AppError::Api { message, .. } | AppError::Validation { message, .. } => message.clone(),
            AppError::NotFound { .. } => "The requested item was not found.".to_string(),
            AppError::Cancelled { .. } => "Request superseded by navigation.".to_string(),
            AppError::Storage { .. } | AppError::Config { .. } | AppError::Internal { .. } => {
                format!("Unexpected error: {}", self.message())
            }
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

impl From<crate::identity::DecodeError> for AppError {
    fn from(err: crate::identity::DecodeError) -> Self {
        AppError::Decode { code: err.code().into(), message: err.to_string() }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            AppError::Internal { code: "request_setup".into(), message: err.to_string() }
        } else if err.is_decode() {
            AppError::Internal { code: "response_decode".into(), message: err.to_string() }
        } else {
            AppError::Network { code: "network_error".into(), message: err.to_string() }
        }
    }
}
