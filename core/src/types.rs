use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Stored lock value of a task nobody holds
pub const AVAILABLE: &str = "";

/// Opaque identifier grouping the tasks handed out by one claim
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockToken(String);

impl LockToken {
    /// Fresh random token (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LockToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for LockToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lock state of a task record.
///
/// Persisted as a single string column: the empty string means available,
/// anything else is the token of the batch holding the task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LockState {
    Available,
    Held(LockToken),
}

impl LockState {
    pub fn as_stored(&self) -> &str {
        match self {
            LockState::Available => AVAILABLE,
            LockState::Held(token) => token.as_str(),
        }
    }

    pub fn token(&self) -> Option<&LockToken> {
        match self {
            LockState::Available => None,
            LockState::Held(token) => Some(token),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, LockState::Available)
    }
}

impl From<String> for LockState {
    fn from(value: String) -> Self {
        if value.is_empty() {
            LockState::Available
        } else {
            LockState::Held(LockToken(value))
        }
    }
}

impl From<LockState> for String {
    fn from(value: LockState) -> Self {
        value.as_stored().to_string()
    }
}

/// Tie-break direction among tasks of equal priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeOrder {
    /// Lowest sequence first (FIFO)
    OldestFirst,
    /// Highest sequence first (LIFO)
    NewestFirst,
}

/// A persisted unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub payload: JsonValue,
    pub priority: i64,
    pub sequence: i64,
    pub lock: LockState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// New available record stamped with the current time
    pub fn new(id: impl Into<String>, payload: JsonValue, priority: i64, sequence: i64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            payload,
            priority,
            sequence,
            lock: LockState::Available,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        self.lock.is_available()
    }
}

/// Tasks held under one token, keyed by task id
pub type LockedTasks = HashMap<String, JsonValue>;

/// Every held batch, keyed by token
pub type RunningTasks = HashMap<LockToken, LockedTasks>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_state_round_trips_through_stored_string() {
        assert_eq!(LockState::from(String::new()), LockState::Available);

        let token = LockToken::from("batch-1");
        let held = LockState::Held(token.clone());
        assert_eq!(held.as_stored(), "batch-1");
        assert_eq!(LockState::from(String::from(held.clone())), held);
        assert_eq!(held.token(), Some(&token));
    }

    #[test]
    fn test_generated_tokens_are_distinct_uuids() {
        let a = LockToken::generate();
        let b = LockToken::generate();

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_lock_state_serializes_as_plain_string() {
        let json = serde_json::to_value(LockState::Held(LockToken::from("t"))).unwrap();
        assert_eq!(json, serde_json::json!("t"));

        let parsed: LockState = serde_json::from_value(serde_json::json!("")).unwrap();
        assert!(parsed.is_available());
    }

    #[test]
    fn test_new_record_is_available() {
        let record = TaskRecord::new("a", serde_json::json!({"n": 1}), 3, 7);
        assert!(record.is_available());
        assert_eq!(record.sequence, 7);
        assert_eq!(record.created_at, record.updated_at);
    }
}
