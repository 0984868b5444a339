//! Opening tickets through the self-service portal.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audit::{record_best_effort, AuditEntry, AuditLog};
use crate::config::PortalConfig;
use crate::error::WorkflowError;
use crate::ticketing::extract::extract_ticket_id_with_source;
use crate::ticketing::{extract_task_id, Delegation, TicketId, TicketRecord, TicketingSystem};

/// Result of an open run.
///
/// The ticket exists once the commit succeeded, even when its number could
/// not be read back from the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenOutcome {
    pub ticket_id: Option<TicketId>,
    pub activity_opened: bool,
    pub delegated: bool,
}

impl OpenOutcome {
    /// The new ticket number, or `TicketIdUnknown`.
    pub fn ticket_id(&self) -> Result<TicketId, WorkflowError> {
        self.ticket_id.ok_or(WorkflowError::TicketIdUnknown)
    }
}

/// Creates tickets, opens their activity and hands them to the default group.
pub struct Opener {
    ticketing: Arc<dyn TicketingSystem>,
    audit: Arc<dyn AuditLog>,
    portal: PortalConfig,
}

impl Opener {
    pub fn new(
        ticketing: Arc<dyn TicketingSystem>,
        audit: Arc<dyn AuditLog>,
        portal: PortalConfig,
    ) -> Self {
        Self {
            ticketing,
            audit,
            portal,
        }
    }

    /// Open a ticket carrying `description` (the configured default when blank).
    pub async fn open(&self, description: &str) -> Result<OpenOutcome, WorkflowError> {
        let description = match description.trim() {
            "" => self.portal.default_description.as_str(),
            text => text,
        };
        info!(backend = self.ticketing.name(), "Opening ticket");

        self.ticketing
            .login()
            .await
            .map_err(|e| WorkflowError::Auth(e.to_string()))?;

        self.ticketing.add_service_request(description).await?;
        let body = self.ticketing.commit_requests().await?;

        let ticket_id = match extract_ticket_id_with_source(&body) {
            Some((id, source)) => {
                info!(ticket_id = id, source = ?source, "Ticket created");
                Some(id)
            }
            None => {
                warn!(
                    body_len = body.len(),
                    "Ticket created but its number was not found in the response"
                );
                None
            }
        };

        let activity_page = match self.ticketing.open_activity().await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!(ticket_id = ?ticket_id, error = %e, "Failed to open activity");
                None
            }
        };

        let Some(ticket_id) = ticket_id else {
            return Ok(OpenOutcome {
                ticket_id: None,
                activity_opened: activity_page.is_some(),
                delegated: false,
            });
        };

        // One restore serves both the delegation ids and the audit activity.
        let record = match self.ticketing.restore(ticket_id).await {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(ticket_id, error = %e, "Could not restore new ticket");
                None
            }
        };

        let delegation = self.delegation_for(
            ticket_id,
            description,
            record.as_ref(),
            activity_page.as_deref(),
        );
        let delegated = match self.ticketing.delegate(&delegation).await {
            Ok(()) => {
                info!(
                    ticket_id,
                    task_id = %delegation.task_id,
                    group_id = %delegation.group_id,
                    "Ticket delegated"
                );
                true
            }
            Err(e) => {
                warn!(ticket_id, error = %e, "Failed to delegate ticket");
                false
            }
        };

        let entry = AuditEntry::opened(ticket_id).with_activity(
            record
                .as_ref()
                .and_then(TicketRecord::activity_id)
                .or_else(|| Some(self.portal.activity_id.clone())),
            record
                .as_ref()
                .and_then(TicketRecord::activity_name)
                .or_else(|| Some(self.portal.activity_name.clone())),
        );
        record_best_effort(self.audit.as_ref(), &entry);

        Ok(OpenOutcome {
            ticket_id: Some(ticket_id),
            activity_opened: activity_page.is_some(),
            delegated,
        })
    }

    fn delegation_for(
        &self,
        ticket_id: TicketId,
        justification: &str,
        record: Option<&TicketRecord>,
        activity_page: Option<&str>,
    ) -> Delegation {
        let task_id = record
            .and_then(TicketRecord::work_item_id)
            .map(|id| id.to_string())
            .or_else(|| activity_page.and_then(extract_task_id))
            .unwrap_or_default();
        if task_id.is_empty() {
            warn!(ticket_id, "Task id unknown, delegating without it");
        }

        Delegation {
            request_id: record
                .and_then(TicketRecord::request_id)
                .unwrap_or(ticket_id)
                .to_string(),
            task_id,
            group_id: self.portal.default_group_id.clone(),
            justification: justification.to_string(),
        }
    }
}
