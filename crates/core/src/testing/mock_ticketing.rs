//! Mock ticketing system for testing.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ticketing::{
    ConcurrencyCheck, Delegation, TicketId, TicketRecord, TicketingError, TicketingSystem,
    WorkItemId,
};

/// Remote operation of the ticketing system, used to key injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketingOp {
    Login,
    Restore,
    GroupsForCapture,
    Capture,
    ValidateConcurrentAccess,
    Save,
    AddServiceRequest,
    CommitRequests,
    OpenActivity,
    Delegate,
}

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketingCall {
    Login,
    Restore(TicketId),
    GroupsForCapture(WorkItemId),
    Capture(TicketRecord),
    ValidateConcurrentAccess(ConcurrencyCheck),
    Save(TicketRecord),
    AddServiceRequest(String),
    CommitRequests,
    OpenActivity,
    Delegate(Delegation),
}

impl TicketingCall {
    pub fn op(&self) -> TicketingOp {
        match self {
            TicketingCall::Login => TicketingOp::Login,
            TicketingCall::Restore(_) => TicketingOp::Restore,
            TicketingCall::GroupsForCapture(_) => TicketingOp::GroupsForCapture,
            TicketingCall::Capture(_) => TicketingOp::Capture,
            TicketingCall::ValidateConcurrentAccess(_) => TicketingOp::ValidateConcurrentAccess,
            TicketingCall::Save(_) => TicketingOp::Save,
            TicketingCall::AddServiceRequest(_) => TicketingOp::AddServiceRequest,
            TicketingCall::CommitRequests => TicketingOp::CommitRequests,
            TicketingCall::OpenActivity => TicketingOp::OpenActivity,
            TicketingCall::Delegate(_) => TicketingOp::Delegate,
        }
    }
}

/// Mock implementation of the TicketingSystem trait.
///
/// Provides controllable behavior for testing:
/// - Record every call in order
/// - Queue the records successive restores return
/// - Inject failures per operation
/// - Control the capture stamp and the portal response bodies
///
/// # Example
///
/// ```rust,ignore
/// let ticketing = MockTicketingSystem::new();
/// ticketing.push_restore(fixtures::ticket_record(5001, Some(42))).await;
/// ticketing.fail_next(TicketingOp::Save, fixtures::http_error("saveOrUpdate", 500)).await;
///
/// // ... run a closure ...
///
/// assert_eq!(ticketing.saved_records().await.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockTicketingSystem {
    calls: Arc<RwLock<Vec<TicketingCall>>>,
    /// Returned by successive restores, front first.
    restores: Arc<RwLock<VecDeque<TicketRecord>>>,
    /// Returned once the queue is empty.
    default_record: Arc<RwLock<Option<TicketRecord>>>,
    /// Failures keyed by operation and 1-based call number.
    failures: Arc<RwLock<HashMap<(TicketingOp, usize), TicketingError>>>,
    /// Calls per operation; survives `clear_recorded`.
    call_counts: Arc<RwLock<HashMap<TicketingOp, usize>>>,
    capture_stamp: Arc<RwLock<Option<String>>>,
    commit_body: Arc<RwLock<String>>,
    activity_body: Arc<RwLock<String>>,
}

impl Default for MockTicketingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTicketingSystem {
    /// Create a new mock ticketing system.
    ///
    /// Commits answer with `{"ticketNumber": 5001}` until told otherwise.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            restores: Arc::new(RwLock::new(VecDeque::new())),
            default_record: Arc::new(RwLock::new(None)),
            failures: Arc::new(RwLock::new(HashMap::new())),
            call_counts: Arc::new(RwLock::new(HashMap::new())),
            capture_stamp: Arc::new(RwLock::new(None)),
            commit_body: Arc::new(RwLock::new(json!({"ticketNumber": 5001}).to_string())),
            activity_body: Arc::new(RwLock::new(String::new())),
        }
    }

    /// Queue the record the next restore returns.
    pub async fn push_restore(&self, record: TicketRecord) {
        self.restores.write().await.push_back(record);
    }

    /// Record returned by restores once the queue is drained.
    pub async fn set_default_record(&self, record: TicketRecord) {
        *self.default_record.write().await = Some(record);
    }

    /// Make the next call of `op` fail with `error`. Failures queue up.
    pub async fn fail_next(&self, op: TicketingOp, error: TicketingError) {
        let made = self.call_counts.read().await.get(&op).copied().unwrap_or(0);
        let mut failures = self.failures.write().await;
        let scheduled = failures
            .keys()
            .filter(|(o, _)| *o == op)
            .map(|(_, nth)| *nth)
            .max()
            .unwrap_or(0);
        failures.insert((op, made.max(scheduled) + 1), error);
    }

    /// Make the `nth` call (1-based, counted from creation) of `op` fail.
    pub async fn fail_call(&self, op: TicketingOp, nth: usize, error: TicketingError) {
        self.failures.write().await.insert((op, nth), error);
    }

    pub async fn set_capture_stamp(&self, stamp: Option<&str>) {
        *self.capture_stamp.write().await = stamp.map(String::from);
    }

    pub async fn set_commit_body(&self, body: impl Into<String>) {
        *self.commit_body.write().await = body.into();
    }

    pub async fn set_activity_body(&self, body: impl Into<String>) {
        *self.activity_body.write().await = body.into();
    }

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<TicketingCall> {
        self.calls.read().await.clone()
    }

    /// Recorded operations, in order.
    pub async fn ops(&self) -> Vec<TicketingOp> {
        self.calls.read().await.iter().map(TicketingCall::op).collect()
    }

    /// Number of calls of `op`.
    pub async fn count(&self, op: TicketingOp) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    /// Records passed to `save`, in order (including failed saves).
    pub async fn saved_records(&self) -> Vec<TicketRecord> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                TicketingCall::Save(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    /// Delegations sent, in order.
    pub async fn delegations(&self) -> Vec<Delegation> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                TicketingCall::Delegate(delegation) => Some(delegation.clone()),
                _ => None,
            })
            .collect()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Record `call`, then fail if a failure is queued for its operation.
    async fn enter(&self, call: TicketingCall) -> Result<(), TicketingError> {
        let op = call.op();
        self.calls.write().await.push(call);
        let nth = {
            let mut counts = self.call_counts.write().await;
            let count = counts.entry(op).or_insert(0);
            *count += 1;
            *count
        };
        match self.failures.write().await.remove(&(op, nth)) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TicketingSystem for MockTicketingSystem {
    fn name(&self) -> &str {
        "mock"
    }

    async fn login(&self) -> Result<(), TicketingError> {
        self.enter(TicketingCall::Login).await
    }

    async fn restore(&self, ticket_id: TicketId) -> Result<TicketRecord, TicketingError> {
        self.enter(TicketingCall::Restore(ticket_id)).await?;
        if let Some(record) = self.restores.write().await.pop_front() {
            return Ok(record);
        }
        Ok(self
            .default_record
            .read()
            .await
            .clone()
            .unwrap_or_else(|| TicketRecord::new(ticket_id)))
    }

    async fn groups_for_capture(&self, work_item_id: WorkItemId) -> Result<(), TicketingError> {
        self.enter(TicketingCall::GroupsForCapture(work_item_id))
            .await
    }

    async fn capture(&self, record: &TicketRecord) -> Result<Option<String>, TicketingError> {
        self.enter(TicketingCall::Capture(record.clone())).await?;
        Ok(self.capture_stamp.read().await.clone())
    }

    async fn validate_concurrent_access(
        &self,
        check: &ConcurrencyCheck,
    ) -> Result<Value, TicketingError> {
        self.enter(TicketingCall::ValidateConcurrentAccess(check.clone()))
            .await?;
        Ok(json!({"valid": true}))
    }

    async fn save(&self, record: &TicketRecord) -> Result<(), TicketingError> {
        self.enter(TicketingCall::Save(record.clone())).await
    }

    async fn add_service_request(&self, description: &str) -> Result<(), TicketingError> {
        self.enter(TicketingCall::AddServiceRequest(description.to_string()))
            .await
    }

    async fn commit_requests(&self) -> Result<String, TicketingError> {
        self.enter(TicketingCall::CommitRequests).await?;
        Ok(self.commit_body.read().await.clone())
    }

    async fn open_activity(&self) -> Result<String, TicketingError> {
        self.enter(TicketingCall::OpenActivity).await?;
        Ok(self.activity_body.read().await.clone())
    }

    async fn delegate(&self, delegation: &Delegation) -> Result<(), TicketingError> {
        self.enter(TicketingCall::Delegate(delegation.clone())).await
    }
}
