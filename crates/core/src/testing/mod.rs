//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the remote collaborator
//! traits, so the open, correlate and close workflows can be exercised
//! without a ticketing or monitoring server.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketbridge_core::testing::{fixtures, MockMonitoring, MockTicketingSystem};
//!
//! let monitoring = MockMonitoring::new();
//! monitoring
//!     .add_event(fixtures::problem_event("150", "T1", 1_700_000_000, &["CITSmartTicketID=7003"]))
//!     .await;
//!
//! let ticketing = MockTicketingSystem::new();
//! ticketing.push_restore(fixtures::ticket_record(7003, Some(42))).await;
//! ```

mod memory_audit;
mod mock_monitoring;
mod mock_ticketing;

pub use memory_audit::MemoryAuditLog;
pub use mock_monitoring::{MockMonitoring, RecordedAcknowledge};
pub use mock_ticketing::{MockTicketingSystem, TicketingCall, TicketingOp};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::Value;

    use crate::monitoring::{Annotation, Event, EventKind};
    use crate::ticketing::{TicketId, TicketRecord, TicketingError, WorkItemId};

    /// Create a problem event on `trigger_id` annotated with `messages`.
    pub fn problem_event(id: &str, trigger_id: &str, clock: i64, messages: &[&str]) -> Event {
        Event {
            id: id.to_string(),
            kind: EventKind::Problem,
            trigger_id: Some(trigger_id.to_string()),
            clock: Some(clock),
            annotations: messages.iter().map(|m| Annotation::new(*m)).collect(),
        }
    }

    /// Create an unannotated recovery event on `trigger_id`.
    pub fn recovery_event(id: &str, trigger_id: &str, clock: i64) -> Event {
        Event {
            kind: EventKind::Recovery,
            ..problem_event(id, trigger_id, clock, &[])
        }
    }

    /// Create a ticket record as restore would return it.
    pub fn ticket_record(ticket_id: TicketId, work_item_id: Option<WorkItemId>) -> TicketRecord {
        let mut record = TicketRecord::new(ticket_id);
        record.insert("idSolicitacaoServico", Value::from(ticket_id));
        if let Some(work_item_id) = work_item_id {
            record.insert("idItemTrabalho", Value::from(work_item_id));
        }
        record.insert("dtLastModification", Value::from("2026-01-05 08:00:00"));
        record.insert("idUsuarioResponsavelAtual", Value::from(3));
        record.insert("idAtividade", Value::from(310));
        record.insert("nomeAtividade", Value::from("Erro no Solicita"));
        record
    }

    /// HTTP failure of a ticketing endpoint.
    pub fn http_error(endpoint: &str, status: u16) -> TicketingError {
        TicketingError::Http {
            endpoint: endpoint.to_string(),
            status,
        }
    }
}
