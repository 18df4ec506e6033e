use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::PortalConfig;
use crate::error::{AppError, AppResult};
use crate::identity::SessionContext;

/// Endpoints that must never receive a credential.
pub const PUBLIC_ENDPOINTS: &[&str] = &["/auth/login"];

/// Strip any query string, force a leading `/` and drop trailing slashes.
fn normalize_endpoint(path: &str) -> String {
    let p = path.split('?').next().unwrap_or("").trim().trim_end_matches('/');
    if p.starts_with('/') { p.to_string() } else { format!("/{p}") }
}

/// Sends API calls, attaching the stored credential to every non-public endpoint.
#[derive(Clone)]
pub struct Dispatcher {
    base: String,
    client: reqwest::Client,
    session: SessionContext,
    public_paths: Arc<Vec<String>>,
}

impl Dispatcher {
    pub fn new(config: &PortalConfig, session: SessionContext) -> AppResult<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::config("http_client".to_string(), e.to_string()))?;
        let public_paths = config.public_endpoints.iter().map(|p| normalize_endpoint(p)).collect();
        Ok(Self {
            base: config.api_base_url.trim_end_matches('/').to_string(),
            client,
            session,
            public_paths: Arc::new(public_paths),
        })
    }

    pub fn session(&self) -> &SessionContext { &self.session }

    pub fn base_url(&self) -> &str { &self.base }

    /// False for allow-listed endpoints; query strings are ignored when matching.
    pub fn requires_auth(&self, path: &str) -> bool {
        !self.public_paths.contains(&normalize_endpoint(path))
    }

    pub fn endpoint(&self, path: &str) -> AppResult<Url> {
        let path = path.trim();
        let joined = if path.starts_with('/') { format!("{}{}", self.base, path) } else { format!("{}/{}", self.base, path) };
        Url::parse(&joined).map_err(|e| AppError::internal("request_setup".to_string(), format!("bad endpoint '{path}': {e}")))
    }

    /// Build a request for `path`. A store read failure rejects the call here
    /// rather than sending it without a credential.
    pub fn request(&self, method: Method, path: &str) -> AppResult<RequestBuilder> {
        let url = self.endpoint(path)?;
        let mut rb = self.client.request(method, url).header(CONTENT_TYPE, "application/json");
        if self.requires_auth(path) {
            if let Some(token) = self.session.credential()? {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    AppError::internal("request_setup".to_string(), "stored credential is not a valid header value".to_string())
                })?;
                rb = rb.header(AUTHORIZATION, value);
            }
        }
        Ok(rb)
    }

    /// Fully built request, for callers that want to inspect it before sending.
    pub fn prepare(&self, method: Method, path: &str) -> AppResult<reqwest::Request> {
        Ok(self.request(method, path)?.build()?)
    }

    async fn dispatch<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> AppResult<Response> {
        let mut rb = self.request(method.clone(), path)?;
        if !query.is_empty() {
            rb = rb.query(query);
        }
        if let Some(b) = body {
            rb = rb.json(b);
        }
        let request = rb.build()?;
        let authed = request.headers().contains_key(AUTHORIZATION);
        let started = Instant::now();
        let resp = self.client.execute(request).await.map_err(|e| {
            warn!(target: "lendportal::dispatch", "api.call method={} path={} failed: {}", method, path, e);
            AppError::from(e)
        })?;
        debug!(
            target: "lendportal::dispatch",
            "api.call method={} path={} status={} auth={} elapsed_ms={}",
            method, path, resp.status().as_u16(), authed, started.elapsed().as_millis()
        );
        check_status(resp).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> AppResult<T> {
        let resp = self.dispatch::<()>(Method::GET, path, query, None).await?;
        Ok(resp.json().await?)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let resp = self.dispatch(Method::POST, path, &[], Some(body)).await?;
        Ok(resp.json().await?)
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let resp = self.dispatch(Method::PUT, path, &[], Some(body)).await?;
        Ok(resp.json().await?)
    }

    /// Like `post_json`, but an empty body yields `None`.
    pub async fn post_optional<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<Option<T>> {
        let resp = self.dispatch(Method::POST, path, &[], Some(body)).await?;
        read_optional(resp).await
    }

    /// Like `put_json`, but an empty body yields `None`.
    pub async fn put_optional<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<Option<T>> {
        let resp = self.dispatch(Method::PUT, path, &[], Some(body)).await?;
        read_optional(resp).await
    }

    pub async fn delete(&self, path: &str) -> AppResult<()> {
        self.dispatch::<()>(Method::DELETE, path, &[], None).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("base", &self.base).field("public_paths", &self.public_paths).finish()
    }
}

async fn read_optional<T: DeserializeOwned>(resp: Response) -> AppResult<Option<T>> {
    let text = resp.text().await?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| AppError::internal("response_decode".to_string(), e.to_string()))
}

/// Map non-2xx responses onto the error taxonomy, keeping the backend's `message`.
async fn check_status(resp: Response) -> AppResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() { format!("HTTP {}", status.as_u16()) } else { trimmed.chars().take(200).collect() }
        });
    Err(match status {
        StatusCode::UNAUTHORIZED => AppError::auth("unauthorized".to_string(), message),
        StatusCode::NOT_FOUND => AppError::not_found("not_found".to_string(), message),
        _ => AppError::api(status.as_u16(), "api_error".to_string(), message),
    })
}
