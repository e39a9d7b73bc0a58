//! Game space and session models

use serde::{Deserialize, Serialize};

/// Physical seat/console resource, occupied by at most one session at a time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSpace {
    pub id: String,
    pub label: String,
    pub occupied: bool,
}

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// One timed occupancy of a game space, billable on close.
///
/// `duration_secs` is set exactly once, at closure, and is non-negative.
/// A closed session is immutable and owns exactly one invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub space_id: String,
    pub game_id: String,
    /// Unix millis
    pub started_at: i64,
    /// Unix millis, None until closed
    pub ended_at: Option<i64>,
    /// Set at closure, end - start in whole seconds
    pub duration_secs: Option<i64>,
    pub status: SessionStatus,
    /// Invoice produced at closure
    pub invoice_id: Option<String>,
    /// Operator who opened the session
    pub created_by: String,
}

impl GameSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

/// Open session payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOpen {
    pub space_id: String,
    pub game_id: String,
}

/// Response for an opened session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOpened {
    pub session_id: String,
    pub space_id: String,
    pub game_name: String,
    pub started_at: i64,
}
