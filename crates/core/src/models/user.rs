//! Signed-in user identity.

use serde::{Deserialize, Serialize};

use crate::types::{Email, Role, UserId};

/// The authenticated user as returned by login.
///
/// The client keeps a copy of this only as a cache; the session cookie is
/// what the backend trusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub username: String,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
}

impl User {
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_role_defaults_to_customer() {
        let user: User = serde_json::from_value(serde_json::json!({
            "username": "rajat",
            "email": "rajat@example.in",
        }))
        .unwrap();
        assert_eq!(user.role, Role::Customer);
        assert!(!user.is_staff());
    }
}
