use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a bearer credential could not be turned into claims.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("credential is empty")]
    Empty,
    #[error("expected 3 dot-separated segments, found {0}")]
    SegmentCount(usize),
    #[error("payload segment is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload segment is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("payload segment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload segment is not a JSON object")]
    NotAnObject,
}

impl DecodeError {
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::Empty => "credential_empty",
            DecodeError::SegmentCount(_) => "credential_segments",
            DecodeError::Base64(_) => "credential_base64",
            DecodeError::Utf8(_) => "credential_utf8",
            DecodeError::Json(_) => "credential_json",
            DecodeError::NotAnObject => "credential_not_object",
        }
    }
}

/// Claim set carried in the payload segment of a credential.
///
/// Claims are kept as the raw JSON object; typed accessors read the paths the
/// portal cares about and ignore anything they don't understand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn from_map(map: Map<String, Value>) -> Self { Self(map) }

    pub fn get(&self, name: &str) -> Option<&Value> { self.0.get(name) }

    /// Role names under `realm_access.roles`. Non-string entries are skipped.
    pub fn granted_roles(&self) -> Vec<&str> {
        self.0
            .get("realm_access")
            .and_then(|r| r.get("roles"))
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn preferred_username(&self) -> Option<&str> {
        self.0.get("preferred_username").and_then(|v| v.as_str())
    }

    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(|v| v.as_str())
    }

    /// Expiry as unix seconds, if the credential carries one.
    pub fn expires_at(&self) -> Option<i64> {
        self.0.get("exp").and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
    }

    /// A credential without `exp` never counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(exp) => exp <= now.timestamp(),
            None => false,
        }
    }
}

/// Decode the payload of a `header.payload.signature` credential.
///
/// The signature is not verified; the backend does that on every call.
pub fn decode_claims(credential: &str) -> Result<Claims, DecodeError> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(DecodeError::Empty);
    }
    let segments: Vec<&str> = credential.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }
    // Accept padded payloads too; the URL-safe engine itself is strict about '='.
    let payload = segments[1].trim_end_matches('=');
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload)?;
    let text = String::from_utf8(bytes)?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => Ok(Claims(map)),
        _ => Err(DecodeError::NotAnObject),
    }
}
