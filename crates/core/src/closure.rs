//! Driving a ticket to its resolved state.
//!
//! The ticketing workflow engine needs two restore/resolve/save cycles: the
//! first save moves the ticket into an intermediate flow state (the server
//! rewrites fields while doing so) and only the second one reaches the
//! terminal state. The work item is claimed once, before the first cycle.

use std::fmt;
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audit::{record_best_effort, AuditEntry, AuditLog};
use crate::error::WorkflowError;
use crate::ticketing::{
    ConcurrencyCheck, ResolutionParams, TicketId, TicketRecord, TicketingSystem, WorkItemId,
};

/// Number of restore/resolve/save cycles a closure performs.
pub const CLOSURE_CYCLES: u8 = 2;

/// Timestamp format the ticketing system uses for `dtLastModification`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Step of the closure state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "cycle", rename_all = "snake_case")]
pub enum ClosureState {
    Fetched(u8),
    Captured,
    ResolutionApplied(u8),
    Saved(u8),
    Closed,
}

impl fmt::Display for ClosureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosureState::Fetched(cycle) => write!(f, "fetched({})", cycle),
            ClosureState::Captured => f.write_str("captured"),
            ClosureState::ResolutionApplied(cycle) => write!(f, "resolution_applied({})", cycle),
            ClosureState::Saved(cycle) => write!(f, "saved({})", cycle),
            ClosureState::Closed => f.write_str("closed"),
        }
    }
}

/// What to close and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureRequest {
    pub ticket_id: TicketId,
    /// Work item to act on; derived from the ticket when absent.
    pub work_item_id: Option<WorkItemId>,
    pub resolution: ResolutionParams,
}

impl ClosureRequest {
    pub fn new(ticket_id: TicketId, resolution: ResolutionParams) -> Self {
        Self {
            ticket_id,
            work_item_id: None,
            resolution,
        }
    }

    pub fn with_work_item(mut self, work_item_id: Option<WorkItemId>) -> Self {
        self.work_item_id = work_item_id;
        self
    }
}

/// Summary of a completed closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosureReport {
    pub ticket_id: TicketId,
    /// Work item used by the final cycle.
    pub work_item_id: WorkItemId,
    /// Whether the advisory concurrent-access check went through.
    pub concurrency_validated: bool,
    pub states: Vec<ClosureState>,
}

impl ClosureReport {
    /// Number of saves performed.
    pub fn saves(&self) -> usize {
        self.states
            .iter()
            .filter(|s| matches!(s, ClosureState::Saved(_)))
            .count()
    }
}

/// Records state transitions while a closure runs.
struct Transitions {
    ticket_id: TicketId,
    states: Vec<ClosureState>,
}

impl Transitions {
    fn new(ticket_id: TicketId) -> Self {
        Self {
            ticket_id,
            states: Vec::with_capacity(8),
        }
    }

    fn enter(&mut self, state: ClosureState) {
        debug!(ticket_id = self.ticket_id, state = %state, "Closure state");
        self.states.push(state);
    }
}

/// Closes tickets through the ticketing system's save protocol.
pub struct ClosureEngine {
    ticketing: Arc<dyn TicketingSystem>,
    audit: Arc<dyn AuditLog>,
}

impl ClosureEngine {
    pub fn new(ticketing: Arc<dyn TicketingSystem>, audit: Arc<dyn AuditLog>) -> Self {
        Self { ticketing, audit }
    }

    /// Resolve and close a ticket.
    pub async fn close(&self, request: &ClosureRequest) -> Result<ClosureReport, WorkflowError> {
        let ticket_id = request.ticket_id;
        let mut transitions = Transitions::new(ticket_id);
        info!(ticket_id, backend = self.ticketing.name(), "Closing ticket");

        self.ticketing
            .login()
            .await
            .map_err(|e| WorkflowError::Auth(e.to_string()))?;

        // Cycle 1: restore, capture, validate, resolve, save.
        let mut first = self.ticketing.restore(ticket_id).await?;
        transitions.enter(ClosureState::Fetched(1));

        let work_item_id = request
            .work_item_id
            .or_else(|| first.work_item_id())
            .ok_or(WorkflowError::MissingWorkItem(ticket_id))?;
        first.set_identity(ticket_id, work_item_id);

        self.ticketing.groups_for_capture(work_item_id).await?;
        let captured_stamp = self.ticketing.capture(&first).await?;
        transitions.enter(ClosureState::Captured);

        let last_modification = captured_stamp
            .or_else(|| first.last_modification().map(String::from))
            .unwrap_or_else(now_timestamp);
        let concurrency_validated = self
            .validate_concurrent_access(&first, work_item_id, last_modification)
            .await;

        self.resolve_and_save(&mut first, request, 1, &mut transitions).await?;

        // Cycle 2: the workflow engine changed the ticket; start from a fresh copy.
        let mut second = self.ticketing.restore(ticket_id).await?;
        transitions.enter(ClosureState::Fetched(2));

        let final_work_item = second.work_item_id().unwrap_or(work_item_id);
        if final_work_item != work_item_id {
            debug!(
                ticket_id,
                previous = work_item_id,
                current = final_work_item,
                "Work item changed between cycles"
            );
        }
        second.set_identity(ticket_id, final_work_item);

        self.resolve_and_save(&mut second, request, 2, &mut transitions).await?;
        transitions.enter(ClosureState::Closed);
        info!(ticket_id, work_item_id = final_work_item, "Ticket closed");

        let entry = AuditEntry::closed(ticket_id).with_activity(
            second.activity_id().or_else(|| first.activity_id()),
            second.activity_name().or_else(|| first.activity_name()),
        );
        record_best_effort(self.audit.as_ref(), &entry);

        Ok(ClosureReport {
            ticket_id,
            work_item_id: final_work_item,
            concurrency_validated,
            states: transitions.states,
        })
    }

    /// Advisory check; the save itself is the authoritative guard.
    async fn validate_concurrent_access(
        &self,
        record: &TicketRecord,
        work_item_id: WorkItemId,
        last_modification: String,
    ) -> bool {
        let check = ConcurrencyCheck {
            ticket_id: record_ticket_id(record),
            work_item_id,
            assigned_user: record.assigned_user(),
            last_modification,
        };
        match self.ticketing.validate_concurrent_access(&check).await {
            Ok(answer) => {
                debug!(
                    ticket_id = check.ticket_id,
                    answer = %answer,
                    "Concurrent access validated"
                );
                true
            }
            Err(e) => {
                warn!(
                    ticket_id = check.ticket_id,
                    error = %e,
                    "Concurrent access validation failed, continuing"
                );
                false
            }
        }
    }

    async fn resolve_and_save(
        &self,
        record: &mut TicketRecord,
        request: &ClosureRequest,
        cycle: u8,
        transitions: &mut Transitions,
    ) -> Result<(), WorkflowError> {
        record.apply_resolution(&request.resolution, &now_timestamp());
        transitions.enter(ClosureState::ResolutionApplied(cycle));

        self.ticketing
            .save(record)
            .await
            .map_err(|source| WorkflowError::Save {
                ticket_id: request.ticket_id,
                cycle,
                source,
            })?;
        transitions.enter(ClosureState::Saved(cycle));
        info!(ticket_id = request.ticket_id, cycle, "Ticket saved");
        Ok(())
    }
}

fn record_ticket_id(record: &TicketRecord) -> TicketId {
    record
        .get(crate::ticketing::fields::ID)
        .and_then(serde_json::Value::as_u64)
        .unwrap_or_default()
}
