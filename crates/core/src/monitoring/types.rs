//! Types for monitoring system operations.

use std::ops::BitOr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monitoring event id, as the monitoring API renders it.
pub type EventId = String;

/// Trigger id shared by the problem/recovery events it raised.
pub type TriggerId = String;

/// Errors that can occur during monitoring system operations.
#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {0}")]
    Http(u16),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Kind of a monitoring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The trigger fired.
    Problem,
    /// The trigger returned to OK.
    Recovery,
}

impl EventKind {
    /// Zabbix renders problem events with value 1.
    pub fn from_value(value: &str) -> Self {
        if value.trim() == "1" {
            EventKind::Problem
        } else {
            EventKind::Recovery
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Problem => "problem",
            EventKind::Recovery => "recovery",
        }
    }
}

/// Note appended to an event (an acknowledge message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub message: String,
    /// Unix time the note was added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<i64>,
}

impl Annotation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            clock: None,
        }
    }
}

/// A monitoring event with its annotations, in the order the API returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<TriggerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<i64>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// `event.acknowledge` action bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckAction(u32);

impl AckAction {
    pub const ACKNOWLEDGE: AckAction = AckAction(2);
    pub const ADD_MESSAGE: AckAction = AckAction(4);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: AckAction) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for AckAction {
    type Output = AckAction;

    fn bitor(self, rhs: AckAction) -> AckAction {
        AckAction(self.0 | rhs.0)
    }
}

/// Remote operations of the monitoring system.
#[async_trait]
pub trait Monitoring: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch one event with its annotations. `Ok(None)` when it does not exist.
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, MonitoringError>;

    /// Most recent problem events of a trigger, newest first, at most `limit`.
    async fn recent_problem_events(
        &self,
        trigger_id: &str,
        limit: u32,
    ) -> Result<Vec<Event>, MonitoringError>;

    /// Append `message` to an event, applying `action`.
    async fn acknowledge(
        &self,
        event_id: &str,
        action: AckAction,
        message: &str,
    ) -> Result<(), MonitoringError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_from_value() {
        assert_eq!(EventKind::from_value("1"), EventKind::Problem);
        assert_eq!(EventKind::from_value(" 1 "), EventKind::Problem);
        assert_eq!(EventKind::from_value("0"), EventKind::Recovery);
        assert_eq!(EventKind::from_value(""), EventKind::Recovery);
    }

    #[test]
    fn test_ack_action_bits() {
        let action = AckAction::ACKNOWLEDGE | AckAction::ADD_MESSAGE;
        assert_eq!(action.bits(), 6);
        assert!(action.contains(AckAction::ACKNOWLEDGE));
        assert!(action.contains(AckAction::ADD_MESSAGE));
        assert!(!AckAction::ADD_MESSAGE.contains(AckAction::ACKNOWLEDGE));
    }
}
