use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use super::credential::Claims;
use crate::error::AppError;

/// Application role. Precedence runs Admin > Staff > Student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Staff,
    Student,
}

impl Role {
    /// Highest precedence first.
    pub const PRECEDENCE: [Role; 3] = [Role::Admin, Role::Staff, Role::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
            Role::Student => "STUDENT",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    /// Role names are matched exactly, as the identity provider issues them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::PRECEDENCE
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AppError::extraction("unknown_role".to_string(), format!("unrecognized role '{s}'")))
    }
}

/// Pick the application role from a claim set: the first entry of
/// `Role::PRECEDENCE` present in `realm_access.roles`.
pub fn extract_role(claims: Option<&Claims>) -> Option<Role> {
    let granted = claims?.granted_roles();
    Role::PRECEDENCE.into_iter().find(|r| granted.contains(&r.as_str()))
}
