//! User accounts as the domain core sees them.
//!
//! Registration mechanics (password policy, token issuance) live outside
//! this crate; the core only needs identity, email, and the admin flag.

use common::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account type controlling access policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    Admin,
    Comum,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Admin => "Admin",
            UserType::Comum => "Comum",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized user type strings.
#[derive(Debug, Error)]
#[error("unknown user type: {0}")]
pub struct ParseUserTypeError(String);

impl std::str::FromStr for UserType {
    type Err = ParseUserTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(UserType::Admin),
            "Comum" => Ok(UserType::Comum),
            other => Err(ParseUserTypeError(other.to_string())),
        }
    }
}

/// A user account. Owns zero or more cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Opaque hash; never inspected by the domain core.
    pub password_hash: String,
    pub user_type: UserType,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag() {
        let user = User {
            id: UserId::new(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "hash".to_string(),
            user_type: UserType::Admin,
        };
        assert!(user.is_admin());

        let user = User {
            user_type: UserType::Comum,
            ..user
        };
        assert!(!user.is_admin());
    }

    #[test]
    fn user_type_string_roundtrip() {
        for t in [UserType::Admin, UserType::Comum] {
            assert_eq!(t.as_str().parse::<UserType>().unwrap(), t);
        }
        assert!("Root".parse::<UserType>().is_err());
    }
}
