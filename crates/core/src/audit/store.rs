use thiserror::Error;

use super::AuditEntry;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only sink for ticket audit entries
pub trait AuditLog: Send + Sync {
    /// Append one entry
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Append an entry, logging and swallowing any failure.
///
/// The audit log is diagnostic only; it never fails a workflow.
pub fn record_best_effort(log: &dyn AuditLog, entry: &AuditEntry) {
    match log.record(entry) {
        Ok(()) => tracing::debug!(
            action = %entry.action,
            ticket_id = entry.ticket_id,
            "Audit entry recorded"
        ),
        Err(e) => tracing::warn!(
            action = %entry.action,
            ticket_id = entry.ticket_id,
            error = %e,
            "Failed to write audit entry"
        ),
    }
}
