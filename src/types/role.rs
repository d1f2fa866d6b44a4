use serde::{Deserialize, Serialize};

/// Account role. Admins may verify stores/breweries, change roles, and
/// moderate content they do not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Basic,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Basic => "basic",
            Role::Admin => "admin",
        }
    }

    /// Maps a stored role string back to the enum. Unknown values fall
    /// back to `Basic` so a corrupted row never grants privileges.
    #[must_use]
    pub fn from_db(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            "basic" => Role::Basic,
            other => {
                tracing::error!("Invalid role in database: '{}'", other);
                Role::Basic
            }
        }
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::from_db(Role::Admin.as_str()), Role::Admin);
        assert_eq!(Role::from_db(Role::Basic.as_str()), Role::Basic);
    }

    #[test]
    fn test_unknown_role_falls_back_to_basic() {
        assert_eq!(Role::from_db("superuser"), Role::Basic);
    }
}
