//! In-memory audit log for testing.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::audit::{AuditEntry, AuditError, AuditLog};

/// Audit log keeping entries in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
    failing: Arc<Mutex<bool>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with an I/O error.
    pub fn set_failing(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        lock(&self.entries).clone()
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        if *lock(&self.failing) {
            return Err(AuditError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "audit log is read-only",
            )));
        }
        lock(&self.entries).push(entry.clone());
        Ok(())
    }
}
