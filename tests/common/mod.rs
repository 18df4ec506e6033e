//! In-process mock of the portal backend, served by axum on an ephemeral port.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine;
use serde_json::{json, Value};

use lendportal::config::PortalConfig;
use lendportal::portal::Portal;

pub const STAFF_EMAIL: &str = "staff@school.test";
pub const STUDENT_EMAIL: &str = "student@school.test";
pub const ADMIN_EMAIL: &str = "admin@school.test";
pub const ROLELESS_EMAIL: &str = "guest@school.test";
pub const BROKEN_EMAIL: &str = "broken@school.test";
pub const PASSWORD: &str = "secret";

/// Build an unsigned credential whose payload segment is `claims`.
pub fn token(claims: Value) -> String {
    let enc = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!("{}.{}.sig", enc.encode(r#"{"alg":"RS256","typ":"JWT"}"#), enc.encode(claims.to_string()))
}

pub fn role_token(roles: &[&str], username: &str) -> String {
    token(json!({
        "realm_access": {"roles": roles},
        "preferred_username": username,
        "sub": format!("kc-{username}"),
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

struct Account {
    token: String,
    user: Value,
    password: String,
}

pub struct MockBackend {
    accounts: Mutex<HashMap<String, Account>>,
    pub seen: Mutex<Vec<Seen>>,
    pub equipment: Mutex<Vec<Value>>,
    pub requests: Mutex<Vec<Value>>,
    /// Answer 404 on the equipment list, as the backend does for an empty inventory.
    pub equipment_missing: AtomicBool,
    /// Answer 401 on every protected endpoint.
    pub reject_all: AtomicBool,
    /// Answer 500 on `/users/me`.
    pub users_me_fails: AtomicBool,
    pub pending_count: Mutex<Option<u64>>,
    next_id: AtomicI64,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        let backend = Arc::new(Self {
            accounts: Mutex::new(HashMap::new()),
            seen: Mutex::new(Vec::new()),
            equipment: Mutex::new(vec![
                json!({"equipmentId": 1, "name": "Projector", "category": "AV", "condition": "GOOD",
                       "totalQuantity": 5, "borrowedCount": 1, "availableQuantity": 4}),
                json!({"equipmentId": 2, "name": "Football", "category": "Sports", "condition": "FAIR",
                       "totalQuantity": 10, "borrowedCount": 10, "availableQuantity": 0}),
            ]),
            requests: Mutex::new(Vec::new()),
            equipment_missing: AtomicBool::new(false),
            reject_all: AtomicBool::new(false),
            users_me_fails: AtomicBool::new(false),
            pending_count: Mutex::new(None),
            next_id: AtomicI64::new(100),
        });
        backend.add_account(STAFF_EMAIL, role_token(&["offline_access", "STAFF"], "sam"), json!({"id": 7, "preferred_username": "sam", "email": STAFF_EMAIL}));
        backend.add_account(STUDENT_EMAIL, role_token(&["STUDENT"], "stu"), json!({"id": 42, "preferred_username": "stu", "email": STUDENT_EMAIL}));
        backend.add_account(ADMIN_EMAIL, role_token(&["STUDENT", "ADMIN"], "ada"), json!({"id": 1, "preferred_username": "ada", "email": ADMIN_EMAIL}));
        backend.add_account(ROLELESS_EMAIL, role_token(&["offline_access"], "guest"), json!({"id": 99}));
        backend.add_account(BROKEN_EMAIL, "not-a-credential".to_string(), json!({"id": 98}));
        backend
    }

    pub fn add_account(&self, email: &str, token: String, user: Value) {
        self.add_account_with_password(email, PASSWORD, token, user);
    }

    pub fn add_account_with_password(&self, email: &str, password: &str, token: String, user: Value) {
        let account = Account { token, user, password: password.to_string() };
        self.accounts.lock().unwrap().insert(email.to_string(), account);
    }

    pub fn seen_for(&self, method: &str, path: &str) -> Vec<Seen> {
        self.seen.lock().unwrap().iter().filter(|s| s.method == method && s.path == path).cloned().collect()
    }

    fn record(&self, method: &str, path: String, headers: &HeaderMap) {
        let authorization = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
        self.seen.lock().unwrap().push(Seen { method: method.to_string(), path, authorization });
    }

    fn user_for(&self, headers: &HeaderMap) -> Result<Value, (StatusCode, Json<Value>)> {
        if self.reject_all.load(Ordering::SeqCst) {
            return Err(fail(StatusCode::UNAUTHORIZED, "token expired"));
        }
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "missing credential"))?;
        self.accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.token == bearer)
            .map(|a| a.user.clone())
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "unknown credential"))
    }

    fn fresh_id(&self) -> i64 { self.next_id.fetch_add(1, Ordering::SeqCst) }
}

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn fail(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"message": message})))
}

type Shared = State<Arc<MockBackend>>;

async fn login(State(b): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    b.record("POST", "/api/auth/login".into(), &headers);
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    let accounts = b.accounts.lock().unwrap();
    match accounts.get(email) {
        Some(a) if password == a.password => Ok(Json(json!({"access_token": a.token}))),
        _ => Err(fail(StatusCode::UNAUTHORIZED, "Invalid email or password")),
    }
}

async fn me(State(b): Shared, headers: HeaderMap) -> Reply {
    b.record("GET", "/api/users/me".into(), &headers);
    let user = b.user_for(&headers)?;
    if b.users_me_fails.load(Ordering::SeqCst) {
        return Err(fail(StatusCode::INTERNAL_SERVER_ERROR, "user service unavailable"));
    }
    Ok(Json(user))
}

async fn list_equipment(State(b): Shared, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Reply {
    b.record("GET", "/api/equipment".into(), &headers);
    b.user_for(&headers)?;
    if b.equipment_missing.load(Ordering::SeqCst) {
        return Err(fail(StatusCode::NOT_FOUND, "No equipment found"));
    }
    let items = b.equipment.lock().unwrap().clone();
    let items: Vec<Value> = match q.get("search") {
        Some(term) => {
            let term = term.to_lowercase();
            items
                .into_iter()
                .filter(|e| e["name"].as_str().unwrap_or_default().to_lowercase().contains(&term))
                .collect()
        }
        None => items,
    };
    Ok(Json(Value::Array(items)))
}

async fn create_equipment(State(b): Shared, headers: HeaderMap, Json(mut body): Json<Value>) -> Reply {
    b.record("POST", "/api/equipment".into(), &headers);
    b.user_for(&headers)?;
    let total = body["totalQuantity"].clone();
    body["equipmentId"] = json!(b.fresh_id());
    body["borrowedCount"] = json!(0);
    body["availableQuantity"] = total;
    b.equipment.lock().unwrap().push(body.clone());
    Ok(Json(body))
}

fn find_equipment(b: &MockBackend, id: &str) -> Result<usize, (StatusCode, Json<Value>)> {
    b.equipment
        .lock()
        .unwrap()
        .iter()
        .position(|e| e["equipmentId"].to_string() == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Equipment not found"))
}

async fn get_equipment(State(b): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    b.record("GET", format!("/api/equipment/{id}"), &headers);
    b.user_for(&headers)?;
    let idx = find_equipment(&b, &id)?;
    Ok(Json(b.equipment.lock().unwrap()[idx].clone()))
}

async fn update_equipment(State(b): Shared, headers: HeaderMap, Path(id): Path<String>, Json(body): Json<Value>) -> Reply {
    b.record("PUT", format!("/api/equipment/{id}"), &headers);
    b.user_for(&headers)?;
    let idx = find_equipment(&b, &id)?;
    let mut items = b.equipment.lock().unwrap();
    if let (Some(item), Some(fields)) = (items[idx].as_object_mut(), body.as_object()) {
        for (k, v) in fields {
            item.insert(k.clone(), v.clone());
        }
    }
    Ok(Json(items[idx].clone()))
}

async fn delete_equipment(State(b): Shared, headers: HeaderMap, Path(id): Path<String>) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    b.record("DELETE", format!("/api/equipment/{id}"), &headers);
    b.user_for(&headers)?;
    let idx = find_equipment(&b, &id)?;
    b.equipment.lock().unwrap().remove(idx);
    Ok(StatusCode::NO_CONTENT)
}

async fn requests_by_status(State(b): Shared, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Reply {
    b.record("GET", "/api/requests".into(), &headers);
    b.user_for(&headers)?;
    let wanted = q.get("status").cloned();
    let all = b.requests.lock().unwrap().clone();
    let matching: Vec<Value> = all
        .into_iter()
        .filter(|r| wanted.as_deref().map_or(true, |s| r["status"] == s))
        .collect();
    Ok(Json(Value::Array(matching)))
}

async fn requests_for_user(State(b): Shared, headers: HeaderMap, Path(uid): Path<String>) -> Reply {
    b.record("GET", format!("/api/requests/user/{uid}"), &headers);
    b.user_for(&headers)?;
    let mine: Vec<Value> = b
        .requests
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r["userId"].to_string() == uid)
        .cloned()
        .collect();
    if mine.is_empty() {
        return Err(fail(StatusCode::NOT_FOUND, "No requests for user"));
    }
    Ok(Json(Value::Array(mine)))
}

/// Create answers with an empty body, like the real backend.
async fn create_request(State(b): Shared, headers: HeaderMap, Json(mut body): Json<Value>) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    b.record("POST", "/api/requests".into(), &headers);
    b.user_for(&headers)?;
    body["requestId"] = json!(b.fresh_id());
    b.requests.lock().unwrap().push(body);
    Ok(StatusCode::CREATED)
}

async fn update_request(State(b): Shared, headers: HeaderMap, Path(id): Path<String>, Json(body): Json<Value>) -> Reply {
    b.record("PUT", format!("/api/requests/{id}"), &headers);
    b.user_for(&headers)?;
    let mut requests = b.requests.lock().unwrap();
    let req = requests
        .iter_mut()
        .find(|r| r["requestId"].to_string() == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Request not found"))?;
    req["status"] = body["status"].clone();
    Ok(Json(req.clone()))
}

async fn analytics(State(b): Shared, headers: HeaderMap) -> Reply {
    b.record("GET", "/api/analytics/summary".into(), &headers);
    b.user_for(&headers)?;
    let items = b.equipment.lock().unwrap();
    let available: u64 = items.iter().map(|e| e["availableQuantity"].as_u64().unwrap_or(0)).sum();
    Ok(Json(json!({
        "totalEquipment": items.len(),
        "pendingRequestsCount": *b.pending_count.lock().unwrap(),
        "availableItems": available,
    })))
}

pub fn router(backend: Arc<MockBackend>) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/users/me", get(me))
        .route("/api/equipment", get(list_equipment).post(create_equipment))
        .route("/api/equipment/{id}", get(get_equipment).put(update_equipment).delete(delete_equipment))
        .route("/api/requests", get(requests_by_status).post(create_request))
        .route("/api/requests/user/{id}", get(requests_for_user))
        .route("/api/requests/{id}", put(update_request))
        .route("/api/analytics/summary", get(analytics))
        .with_state(backend)
}

/// Serve the mock on 127.0.0.1:0 and return the API base URL.
pub async fn spawn(backend: Arc<MockBackend>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let app = router(backend);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock backend error: {e:?}");
        }
    });
    format!("http://{addr}/api")
}

pub fn config(base: &str) -> PortalConfig {
    PortalConfig { api_base_url: base.to_string(), session_file: None, ..PortalConfig::default() }
}

/// A running mock plus an in-memory portal pointed at it.
pub async fn harness() -> (Arc<MockBackend>, Portal) {
    let backend = MockBackend::new();
    let base = spawn(backend.clone()).await;
    let portal = Portal::bootstrap(config(&base)).expect("bootstrap portal");
    (backend, portal)
}
