//! Monitoring-driven entry points: open on a problem, close on recovery.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::closure::{ClosureEngine, ClosureReport, ClosureRequest};
use crate::correlator::{EventCorrelator, TicketMarker};
use crate::error::WorkflowError;
use crate::monitoring::{AckAction, EventKind, Monitoring};
use crate::opener::{OpenOutcome, Opener};
use crate::ticketing::{ResolutionParams, TicketId, WorkItemId};

/// What `open_for_event` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventOpen {
    /// The event is not a problem; nothing was opened.
    Skipped,
    Opened {
        outcome: OpenOutcome,
        annotated: bool,
    },
}

/// What `close_for_event` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventClose {
    pub problem_event_id: String,
    #[serde(flatten)]
    pub report: ClosureReport,
    pub annotated: bool,
}

/// Ties the monitoring system to the open and close workflows.
pub struct IncidentBridge {
    monitoring: Arc<dyn Monitoring>,
    correlator: EventCorrelator,
    opener: Opener,
    closure: ClosureEngine,
    closed_marker: TicketMarker,
}

impl IncidentBridge {
    pub fn new(
        monitoring: Arc<dyn Monitoring>,
        correlator: EventCorrelator,
        opener: Opener,
        closure: ClosureEngine,
        closed_marker: TicketMarker,
    ) -> Self {
        Self {
            monitoring,
            correlator,
            opener,
            closure,
            closed_marker,
        }
    }

    /// Open a ticket for a problem event and mark the event with its number.
    pub async fn open_for_event(
        &self,
        event_id: &str,
        event_value: &str,
        description: &str,
    ) -> Result<EventOpen, WorkflowError> {
        if EventKind::from_value(event_value) != EventKind::Problem {
            info!(event_id, event_value, "Not a problem event, nothing to open");
            return Ok(EventOpen::Skipped);
        }

        let outcome = self.opener.open(description).await?;
        let annotated = match outcome.ticket_id {
            Some(ticket_id) => {
                let message = self.correlator.marker().render(ticket_id, Some(description));
                self.annotate(event_id, ticket_id, &message).await
            }
            None => false,
        };

        Ok(EventOpen::Opened { outcome, annotated })
    }

    /// Close the ticket correlated with `event_id`.
    pub async fn close_for_event(
        &self,
        event_id: &str,
        work_item_id: Option<WorkItemId>,
        resolution: ResolutionParams,
    ) -> Result<EventClose, WorkflowError> {
        let correlation = self.correlator.resolve_ticket(event_id).await;
        let (Some(ticket_id), Some(problem_event_id)) =
            (correlation.ticket_id, correlation.problem_event_id.clone())
        else {
            return Err(WorkflowError::CorrelationNotFound {
                event_id: event_id.to_string(),
                problem_event_id: correlation.problem_event_id,
            });
        };

        let request = ClosureRequest::new(ticket_id, resolution).with_work_item(work_item_id);
        let report = self.closure.close(&request).await?;

        let message = self.closed_marker.render(ticket_id, None);
        let annotated = self.annotate(&problem_event_id, ticket_id, &message).await;

        Ok(EventClose {
            problem_event_id,
            report,
            annotated,
        })
    }

    async fn annotate(&self, event_id: &str, ticket_id: TicketId, message: &str) -> bool {
        let action = AckAction::ACKNOWLEDGE | AckAction::ADD_MESSAGE;
        match self.monitoring.acknowledge(event_id, action, message).await {
            Ok(()) => {
                info!(event_id, ticket_id, "Event annotated");
                true
            }
            Err(e) => {
                warn!(event_id, ticket_id, error = %e, "Failed to annotate event");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_open_serialization() {
        let skipped = serde_json::to_value(EventOpen::Skipped).unwrap();
        assert_eq!(skipped, json!({"status": "skipped"}));

        let opened = serde_json::to_value(EventOpen::Opened {
            outcome: OpenOutcome {
                ticket_id: Some(5001),
                activity_opened: true,
                delegated: false,
            },
            annotated: true,
        })
        .unwrap();
        assert_eq!(opened["status"], json!("opened"));
        assert_eq!(opened["annotated"], json!(true));
        assert_eq!(opened["outcome"]["ticket_id"], json!(5001));
        assert_eq!(opened["outcome"]["delegated"], json!(false));
    }
}
