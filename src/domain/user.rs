use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

/// Store-assigned user identifier.
pub type UserId = i64;

pub type SkillId = i64;

/// A marketplace participant. Users post orders (as owners) and fulfill
/// other users' orders (as workers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique across the ledger
    pub name: String,
    /// Current balance in cents. Only order transactions move it after creation.
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

impl User {
    pub fn skill_names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub user_id: UserId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            name: "alice".into(),
            balance: 0,
            created_at: Utc::now(),
            skills: vec![
                Skill {
                    id: 1,
                    user_id: 1,
                    name: "rust".into(),
                },
                Skill {
                    id: 2,
                    user_id: 1,
                    name: "sql".into(),
                },
            ],
        }
    }

    #[test]
    fn test_skill_names() {
        assert_eq!(user().skill_names(), vec!["rust", "sql"]);
    }
}
