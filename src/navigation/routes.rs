//! Static route table: every navigable path and the roles allowed to view it.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::identity::{RequiredRoles, Role};

pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Login,
    Dashboard,
    Profile,
    EquipmentList,
    EquipmentAdd,
    EquipmentEdit,
    Requests,
    NewRequest,
    Approvals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Redirect(&'static str),
    Protected(RequiredRoles),
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: &'static str,
    pub screen: Option<Screen>,
    pub access: Access,
}

/// A concrete path matched against a table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub path: String,
    pub pattern: &'static str,
    /// `None` for redirect-only entries such as `/`.
    pub screen: Option<Screen>,
    pub access: Access,
    pub params: BTreeMap<String, String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

static ROUTES: Lazy<Vec<RouteEntry>> = Lazy::new(|| {
    let requesters = RequiredRoles::any_of([Role::Student, Role::Admin, Role::Staff]);
    let reviewers = RequiredRoles::any_of([Role::Admin, Role::Staff]);
    vec![
        RouteEntry { pattern: LOGIN_PATH, screen: Some(Screen::Login), access: Access::Public },
        RouteEntry { pattern: "/", screen: None, access: Access::Redirect(LANDING_PATH) },
        RouteEntry { pattern: "/dashboard", screen: Some(Screen::Dashboard), access: Access::Protected(RequiredRoles::Any) },
        RouteEntry { pattern: "/profile", screen: Some(Screen::Profile), access: Access::Protected(RequiredRoles::Any) },
        RouteEntry { pattern: "/equipment", screen: Some(Screen::EquipmentList), access: Access::Protected(RequiredRoles::One(Role::Admin)) },
        RouteEntry { pattern: "/equipment/add", screen: Some(Screen::EquipmentAdd), access: Access::Protected(RequiredRoles::One(Role::Admin)) },
        RouteEntry { pattern: "/equipment/edit/:id", screen: Some(Screen::EquipmentEdit), access: Access::Protected(RequiredRoles::One(Role::Admin)) },
        RouteEntry { pattern: "/requests", screen: Some(Screen::Requests), access: Access::Protected(requesters.clone()) },
        RouteEntry { pattern: "/requests/new", screen: Some(Screen::NewRequest), access: Access::Protected(requesters) },
        RouteEntry { pattern: "/approvals", screen: Some(Screen::Approvals), access: Access::Protected(reviewers) },
    ]
});

pub fn table() -> &'static [RouteEntry] { &ROUTES }

/// Strip query/fragment and trailing slashes; always returns a leading `/`.
pub fn normalize(path: &str) -> String {
    let p = path.split(['?', '#']).next().unwrap_or("");
    let p = p.trim().trim_end_matches('/');
    if p.is_empty() {
        "/".to_string()
    } else if p.starts_with('/') {
        p.to_string()
    } else {
        format!("/{p}")
    }
}

fn match_pattern(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    let pat: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if pat.len() != segs.len() {
        return None;
    }
    let mut params = BTreeMap::new();
    for (p, s) in pat.iter().zip(segs.iter()) {
        if let Some(name) = p.strip_prefix(':') {
            let value = urlencoding::decode(s).map(|c| c.into_owned()).unwrap_or_else(|_| s.to_string());
            params.insert(name.to_string(), value);
        } else if p != s {
            return None;
        }
    }
    Some(params)
}

/// Look up a path. Literal entries win over parameterized ones.
pub fn resolve(path: &str) -> Option<RouteMatch> {
    let path = normalize(path);
    let mut found: Option<(&RouteEntry, BTreeMap<String, String>)> = None;
    for entry in ROUTES.iter() {
        if let Some(params) = match_pattern(entry.pattern, &path) {
            let literal = params.is_empty();
            found = Some((entry, params));
            if literal { break; }
        }
    }
    let (entry, params) = found?;
    Some(RouteMatch {
        path,
        pattern: entry.pattern,
        screen: entry.screen,
        access: entry.access.clone(),
        params,
    })
}
