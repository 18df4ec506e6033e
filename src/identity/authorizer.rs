use tracing::{debug, warn};

use super::role::Role;
use super::session::SessionContext;
use crate::navigation::routes::{self, Access, RouteMatch};

/// Roles a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredRoles {
    /// Any authenticated user.
    Any,
    One(Role),
    AnyOf(Vec<Role>),
}

impl RequiredRoles {
    pub fn any_of<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        RequiredRoles::AnyOf(roles.into_iter().collect())
    }

    /// Normalized allowed set; `None` means any authenticated role.
    pub fn allowed(&self) -> Option<Vec<Role>> {
        match self {
            RequiredRoles::Any => None,
            RequiredRoles::One(r) => Some(vec![*r]),
            RequiredRoles::AnyOf(rs) => Some(rs.clone()),
        }
    }

    pub fn permits(&self, role: Option<Role>) -> bool {
        match self.allowed() {
            None => true,
            Some(set) => role.map(|r| set.contains(&r)).unwrap_or(false),
        }
    }
}

impl From<Role> for RequiredRoles {
    fn from(r: Role) -> Self { RequiredRoles::One(r) }
}

impl From<&[Role]> for RequiredRoles {
    fn from(rs: &[Role]) -> Self { RequiredRoles::AnyOf(rs.to_vec()) }
}

impl From<Option<Role>> for RequiredRoles {
    fn from(r: Option<Role>) -> Self { r.map(RequiredRoles::One).unwrap_or(RequiredRoles::Any) }
}

/// Outcome of a guard check. Denials redirect rather than error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// No session: send the user to log in.
    RedirectToLogin,
    /// Valid session, insufficient role: send the user to the landing page.
    RedirectToLanding,
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool { matches!(self, GuardDecision::Allow) }
}

/// Result of resolving a navigation target through the route table and guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(RouteMatch),
    Redirect { to: String, decision: GuardDecision },
    NotFound(String),
}

/// Gates navigation on session state and route roles.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    session: SessionContext,
    login_path: String,
    landing_path: String,
}

impl AccessGuard {
    pub fn new(session: SessionContext) -> Self {
        Self::with_paths(session, routes::LOGIN_PATH, routes::LANDING_PATH)
    }

    pub fn with_paths(session: SessionContext, login_path: &str, landing_path: &str) -> Self {
        Self { session, login_path: login_path.to_string(), landing_path: landing_path.to_string() }
    }

    pub fn login_path(&self) -> &str { &self.login_path }
    pub fn landing_path(&self) -> &str { &self.landing_path }

    pub fn check(&self, required: &RequiredRoles) -> GuardDecision {
        // An unreadable store is treated as no session at all.
        let active = self.session.is_active().unwrap_or_else(|e| {
            warn!(target: "lendportal::guard", "guard.session unreadable: {}", e);
            false
        });
        if !active {
            return GuardDecision::RedirectToLogin;
        }
        if let RequiredRoles::Any = required {
            return GuardDecision::Allow;
        }
        let role = self.session.get_role().unwrap_or_else(|e| {
            warn!(target: "lendportal::guard", "guard.role unreadable: {}", e);
            None
        });
        if required.permits(role) {
            GuardDecision::Allow
        } else {
            debug!(target: "lendportal::guard", "guard.deny role={:?} required={:?}", role, required);
            GuardDecision::RedirectToLanding
        }
    }

    /// Resolve `path` through the route table and apply the guard.
    pub fn check_path(&self, path: &str) -> Navigation {
        self.check_path_depth(path, 0)
    }

    fn check_path_depth(&self, path: &str, depth: u8) -> Navigation {
        let Some(m) = routes::resolve(path) else { return Navigation::NotFound(path.to_string()) };
        match &m.access {
            Access::Public => Navigation::Render(m),
            Access::Redirect(target) => {
                if depth > 4 {
                    return Navigation::NotFound(path.to_string());
                }
                match self.check_path_depth(target, depth + 1) {
                    Navigation::Render(_) => Navigation::Redirect { to: target.to_string(), decision: GuardDecision::Allow },
                    other => other,
                }
            }
            Access::Protected(required) => match self.check(required) {
                GuardDecision::Allow => Navigation::Render(m),
                GuardDecision::RedirectToLogin => {
                    Navigation::Redirect { to: self.login_path.clone(), decision: GuardDecision::RedirectToLogin }
                }
                GuardDecision::RedirectToLanding => {
                    Navigation::Redirect { to: self.landing_path.clone(), decision: GuardDecision::RedirectToLanding }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::routes::Screen;
    use base64::Engine;
    use serde_json::json;

    fn session_as(roles: &[&str], role: Role) -> SessionContext {
        let enc = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let tok = format!("h.{}.s", enc.encode(json!({"realm_access": {"roles": roles}}).to_string()));
        let s = SessionContext::in_memory();
        s.save(&tok, role, None).unwrap();
        s
    }

    #[test]
    fn student_denied_staff_route_goes_to_landing() {
        let guard = AccessGuard::new(session_as(&["STUDENT"], Role::Student));
        let req = RequiredRoles::any_of([Role::Admin, Role::Staff]);
        assert_eq!(guard.check(&req), GuardDecision::RedirectToLanding);
    }

    #[test]
    fn anonymous_always_goes_to_login() {
        let guard = AccessGuard::new(SessionContext::in_memory());
        for req in [
            RequiredRoles::Any,
            RequiredRoles::One(Role::Student),
            RequiredRoles::any_of(Role::PRECEDENCE),
        ] {
            assert_eq!(guard.check(&req), GuardDecision::RedirectToLogin);
        }
    }

    #[test]
    fn any_allows_every_authenticated_role() {
        for (granted, role) in [("ADMIN", Role::Admin), ("STAFF", Role::Staff), ("STUDENT", Role::Student)] {
            let guard = AccessGuard::new(session_as(&[granted], role));
            assert!(guard.check(&RequiredRoles::Any).is_allowed());
            assert!(guard.check(&RequiredRoles::One(role)).is_allowed());
        }
    }

    #[test]
    fn staff_reaches_approvals_but_not_equipment() {
        let guard = AccessGuard::new(session_as(&["STAFF"], Role::Staff));
        assert!(matches!(guard.check_path("/approvals"), Navigation::Render(m) if m.screen == Some(Screen::Approvals)));
        assert_eq!(
            guard.check_path("/equipment/edit/12"),
            Navigation::Redirect { to: "/dashboard".into(), decision: GuardDecision::RedirectToLanding }
        );
    }

    #[test]
    fn root_redirects_through_guard() {
        let anon = AccessGuard::new(SessionContext::in_memory());
        assert_eq!(
            anon.check_path("/"),
            Navigation::Redirect { to: "/login".into(), decision: GuardDecision::RedirectToLogin }
        );
        assert!(matches!(anon.check_path("/login"), Navigation::Render(_)));

        let admin = AccessGuard::new(session_as(&["ADMIN"], Role::Admin));
        assert_eq!(
            admin.check_path("/"),
            Navigation::Redirect { to: "/dashboard".into(), decision: GuardDecision::Allow }
        );
        assert_eq!(admin.check_path("/nowhere"), Navigation::NotFound("/nowhere".into()));
    }

    #[test]
    fn required_roles_conversions() {
        assert_eq!(RequiredRoles::from(None::<Role>), RequiredRoles::Any);
        assert_eq!(RequiredRoles::from(Role::Admin).allowed(), Some(vec![Role::Admin]));
        let slice: &[Role] = &[Role::Staff, Role::Admin];
        assert!(RequiredRoles::from(slice).permits(Some(Role::Admin)));
        assert!(!RequiredRoles::from(slice).permits(None));
    }
}
