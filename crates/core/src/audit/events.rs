use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ticketing::TicketId;

/// Ticket action recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Open,
    Close,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Open => "OPEN",
            AuditAction::Close => "CLOSE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit entry: a ticket was opened or closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub ticket_id: TicketId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<String>,
}

impl AuditEntry {
    pub fn opened(ticket_id: TicketId) -> Self {
        Self {
            action: AuditAction::Open,
            ticket_id,
            activity_id: None,
            activity_name: None,
        }
    }

    pub fn closed(ticket_id: TicketId) -> Self {
        Self {
            action: AuditAction::Close,
            ..Self::opened(ticket_id)
        }
    }

    pub fn with_activity(mut self, id: Option<String>, name: Option<String>) -> Self {
        self.activity_id = id.filter(|s| !s.is_empty());
        self.activity_name = name.filter(|s| !s.is_empty());
        self
    }

    /// Render as a single log line:
    /// `YYYY-MM-DD HH:MM:SS ACTION ticket=<N> [activity=<id>] [name="<name>"]`
    pub fn to_line(&self, at: NaiveDateTime) -> String {
        let mut line = format!(
            "{} {} ticket={}",
            at.format("%Y-%m-%d %H:%M:%S"),
            self.action,
            self.ticket_id
        );
        if let Some(id) = &self.activity_id {
            line.push_str(&format!(" activity={}", id));
        }
        if let Some(name) = &self.activity_name {
            line.push_str(&format!(" name={:?}", name));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap()
    }

    #[test]
    fn test_line_without_activity() {
        let line = AuditEntry::opened(52606).to_line(at());
        assert_eq!(line, "2026-03-14 09:26:53 OPEN ticket=52606");
    }

    #[test]
    fn test_line_with_activity() {
        let line = AuditEntry::closed(52606)
            .with_activity(Some("310".to_string()), Some("Erro no Solicita".to_string()))
            .to_line(at());
        assert_eq!(
            line,
            "2026-03-14 09:26:53 CLOSE ticket=52606 activity=310 name=\"Erro no Solicita\""
        );
    }

    #[test]
    fn test_with_activity_drops_empty_values() {
        let entry = AuditEntry::opened(1).with_activity(Some(String::new()), None);
        assert!(entry.activity_id.is_none());
        assert!(entry.activity_name.is_none());
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&AuditEntry::closed(7)).unwrap();
        assert!(json.contains("\"action\":\"CLOSE\""));
        assert!(!json.contains("activity_id"));
    }
}
