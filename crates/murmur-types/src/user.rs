use serde::{Deserialize, Serialize};

use crate::identity::{Identity, Rank, UserId};

/// A stored user account.
///
/// `password_hash` holds a PHC-format string and must never leave the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub rank: Rank,
}

impl UserRecord {
    /// The identity assertion issued for this account.
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.username.clone(), self.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let user = UserRecord {
            id: UserId::new(),
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            rank: Rank::User,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("alice"));
    }
}
