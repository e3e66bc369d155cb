//! User aggregate for the companion user store.
//!
//! The password field is already hashed when it reaches the persistence
//! layer; credentials are produced and verified elsewhere.

use serde::{Deserialize, Serialize};

/// A role granted to a user (plain name, e.g. `"USER"` or `"ADMIN"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Option<i64>,
    pub name: String,
}

/// An application user with a set of roles.
///
/// Email is the secondary lookup key and is unique in the backends able to
/// enforce it (relational unique index, document store by convention).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    /// Pre-hashed password, stored verbatim.
    pub password: String,
    pub name: String,
    pub last_name: String,
    pub active: bool,
    pub roles: Vec<Role>,
}

impl User {
    /// Copy of this user carrying the given id, as returned from `save`.
    pub fn with_id(&self, id: i64) -> User {
        User {
            id: Some(id),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_json_roundtrip() {
        let user = User {
            id: Some(3),
            email: "jan.kowalski@example.com".to_string(),
            password: "$2a$10$abcdefghijklmnopqrstuv".to_string(),
            name: "Jan".to_string(),
            last_name: "Kowalski".to_string(),
            active: true,
            roles: vec![Role {
                id: Some(1),
                name: "USER".to_string(),
            }],
        };

        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }
}
