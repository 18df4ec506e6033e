use crate::identity::Role;

use super::routes::{LANDING_PATH, LOGIN_PATH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    Go(&'static str),
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: String,
    pub action: NavAction,
}

impl NavLink {
    fn go(label: &str, path: &'static str) -> Self {
        Self { label: label.to_string(), action: NavAction::Go(path) }
    }
}

/// Navigation bar entries for the current session state.
///
/// `active` is the raw authentication flag; `role` may be `None` for an active
/// session whose stored role could not be read, which still gets the common links.
pub fn nav_links(active: bool, role: Option<Role>) -> Vec<NavLink> {
    if !active {
        return vec![NavLink::go("Login", LOGIN_PATH)];
    }
    let mut links = vec![NavLink::go("Dashboard", LANDING_PATH)];
    if let Some(role) = role {
        match role {
            Role::Student => {
                links.push(NavLink::go("My Requests", "/requests"));
                links.push(NavLink::go("New Request", "/requests/new"));
            }
            Role::Staff => {
                links.push(NavLink::go("Approvals", "/approvals"));
            }
            Role::Admin => {
                links.push(NavLink::go("Approvals", "/approvals"));
                links.push(NavLink::go("Manage Equipment", "/equipment"));
            }
        }
    }
    let profile = match role {
        Some(r) => format!("Profile ({r})"),
        None => "Profile".to_string(),
    };
    links.push(NavLink::go(&profile, "/profile"));
    links.push(NavLink { label: "Logout".to_string(), action: NavAction::Logout });
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(links: &[NavLink]) -> Vec<&str> { links.iter().map(|l| l.label.as_str()).collect() }

    #[test]
    fn anonymous_sees_login_only() {
        assert_eq!(labels(&nav_links(false, Some(Role::Admin))), vec!["Login"]);
    }

    #[test]
    fn per_role_links() {
        assert_eq!(
            labels(&nav_links(true, Some(Role::Student))),
            vec!["Dashboard", "My Requests", "New Request", "Profile (STUDENT)", "Logout"]
        );
        assert_eq!(labels(&nav_links(true, Some(Role::Staff))), vec!["Dashboard", "Approvals", "Profile (STAFF)", "Logout"]);
        assert_eq!(
            labels(&nav_links(true, Some(Role::Admin))),
            vec!["Dashboard", "Approvals", "Manage Equipment", "Profile (ADMIN)", "Logout"]
        );
        assert_eq!(labels(&nav_links(true, None)), vec!["Dashboard", "Profile", "Logout"]);
    }

    #[test]
    fn every_link_target_passes_the_guard_for_its_role() {
        use crate::navigation::routes::{resolve, Access};
        for role in Role::PRECEDENCE {
            for link in nav_links(true, Some(role)) {
                let NavAction::Go(path) = link.action else { continue };
                let m = resolve(path).unwrap();
                if let Access::Protected(req) = m.access {
                    assert!(req.permits(Some(role)), "{role} shown {path} it cannot open");
                }
            }
        }
    }
}
