//! Workflow error taxonomy and process exit codes.

use thiserror::Error;

use crate::monitoring::{EventId, MonitoringError};
use crate::ticketing::{TicketId, TicketingError};

/// Process exit codes, one per fatal error kind.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// Failure outside the workflow taxonomy.
    pub const FAILURE: i32 = 1;
    /// Reserved for argument errors (what clap exits with).
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const SAVE: i32 = 4;
    pub const MISSING_WORK_ITEM: i32 = 5;
    pub const CORRELATION_NOT_FOUND: i32 = 6;
    pub const MALFORMED_RESPONSE: i32 = 7;
    pub const REMOTE: i32 = 8;
    pub const TRANSPORT: i32 = 9;
    pub const CONFIG: i32 = 10;
}

/// Errors surfaced by the open and close workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Ticket was created but its number could not be recovered")]
    TicketIdUnknown,

    #[error("No ticket found for event {event_id}")]
    CorrelationNotFound {
        event_id: EventId,
        /// Most recent problem event examined, kept for diagnostics.
        problem_event_id: Option<EventId>,
    },

    #[error("Could not determine the work item of ticket {0}")]
    MissingWorkItem(TicketId),

    #[error("Save of ticket {ticket_id} failed in cycle {cycle}: {source}")]
    Save {
        ticket_id: TicketId,
        cycle: u8,
        #[source]
        source: TicketingError,
    },
}

impl WorkflowError {
    /// Exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkflowError::Auth(_) => exit_code::AUTH,
            WorkflowError::Transport(_) => exit_code::TRANSPORT,
            WorkflowError::Remote(_) => exit_code::REMOTE,
            WorkflowError::MalformedResponse(_) => exit_code::MALFORMED_RESPONSE,
            WorkflowError::TicketIdUnknown => exit_code::SUCCESS,
            WorkflowError::CorrelationNotFound { .. } => exit_code::CORRELATION_NOT_FOUND,
            WorkflowError::MissingWorkItem(_) => exit_code::MISSING_WORK_ITEM,
            WorkflowError::Save { .. } => exit_code::SAVE,
        }
    }

    /// Whether the run must stop. A ticket with an unknown number was still created.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WorkflowError::TicketIdUnknown)
    }
}

impl From<TicketingError> for WorkflowError {
    fn from(e: TicketingError) -> Self {
        match e {
            TicketingError::AuthenticationFailed(msg) => WorkflowError::Auth(msg),
            TicketingError::Timeout | TicketingError::ConnectionFailed(_) => {
                WorkflowError::Transport(e.to_string())
            }
            TicketingError::MalformedResponse { .. } => {
                WorkflowError::MalformedResponse(e.to_string())
            }
            TicketingError::Http { .. } | TicketingError::ApiError(_) => {
                WorkflowError::Remote(e.to_string())
            }
        }
    }
}

impl From<MonitoringError> for WorkflowError {
    fn from(e: MonitoringError) -> Self {
        match e {
            MonitoringError::Timeout | MonitoringError::ConnectionFailed(_) => {
                WorkflowError::Transport(e.to_string())
            }
            MonitoringError::MalformedResponse(_) => {
                WorkflowError::MalformedResponse(e.to_string())
            }
            MonitoringError::Http(_)
            | MonitoringError::Rpc { .. }
            | MonitoringError::ApiError(_) => WorkflowError::Remote(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_fatal_kinds() {
        let errors = [
            WorkflowError::Auth("x".to_string()),
            WorkflowError::Transport("x".to_string()),
            WorkflowError::Remote("x".to_string()),
            WorkflowError::MalformedResponse("x".to_string()),
            WorkflowError::CorrelationNotFound {
                event_id: "1".to_string(),
                problem_event_id: None,
            },
            WorkflowError::MissingWorkItem(1),
            WorkflowError::Save {
                ticket_id: 1,
                cycle: 1,
                source: TicketingError::Timeout,
            },
        ];
        let mut codes: Vec<i32> = errors.iter().map(WorkflowError::exit_code).collect();
        assert!(errors.iter().all(WorkflowError::is_fatal));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&exit_code::SUCCESS));
        assert!(!codes.contains(&exit_code::USAGE));
        assert!(!codes.contains(&exit_code::FAILURE));
    }

    #[test]
    fn test_ticket_id_unknown_is_partial_success() {
        assert!(!WorkflowError::TicketIdUnknown.is_fatal());
        assert_eq!(WorkflowError::TicketIdUnknown.exit_code(), exit_code::SUCCESS);
    }

    #[test]
    fn test_ticketing_error_classification() {
        assert!(matches!(
            WorkflowError::from(TicketingError::AuthenticationFailed("HTTP 401".into())),
            WorkflowError::Auth(_)
        ));
        assert!(matches!(
            WorkflowError::from(TicketingError::Timeout),
            WorkflowError::Transport(_)
        ));
        assert!(matches!(
            WorkflowError::from(TicketingError::Http {
                endpoint: "restoreRequest".into(),
                status: 500
            }),
            WorkflowError::Remote(_)
        ));
        assert!(matches!(
            WorkflowError::from(TicketingError::MalformedResponse {
                endpoint: "restoreRequest".into(),
                reason: "not JSON".into()
            }),
            WorkflowError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_monitoring_error_classification() {
        assert!(matches!(
            WorkflowError::from(MonitoringError::ConnectionFailed("refused".into())),
            WorkflowError::Transport(_)
        ));
        assert!(matches!(
            WorkflowError::from(MonitoringError::Rpc {
                code: -32602,
                message: "Invalid params.".into(),
                data: None
            }),
            WorkflowError::Remote(_)
        ));
    }

    #[test]
    fn test_save_error_keeps_cause() {
        let err = WorkflowError::Save {
            ticket_id: 5001,
            cycle: 1,
            source: TicketingError::Http {
                endpoint: "saveOrUpdate".into(),
                status: 500,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("5001"));
        assert!(msg.contains("HTTP 500"));
        assert_eq!(err.exit_code(), exit_code::SAVE);
    }
}
