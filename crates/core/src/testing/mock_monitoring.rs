//! Mock monitoring system for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::monitoring::{
    AckAction, Annotation, Event, EventId, EventKind, Monitoring, MonitoringError,
};

/// A recorded acknowledge call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAcknowledge {
    pub event_id: EventId,
    pub action: AckAction,
    pub message: String,
}

/// Mock implementation of the Monitoring trait.
///
/// Events live in memory; acknowledging one appends an annotation to it, so
/// a later lookup sees the marker like the real API would.
#[derive(Debug, Clone)]
pub struct MockMonitoring {
    events: Arc<RwLock<HashMap<EventId, Event>>>,
    acknowledges: Arc<RwLock<Vec<RecordedAcknowledge>>>,
    /// Trigger and limit of every `recent_problem_events` query.
    window_queries: Arc<RwLock<Vec<(String, u32)>>>,
    /// When set, every call fails with a connection error.
    unavailable: Arc<RwLock<bool>>,
    /// When set, acknowledges fail with a JSON-RPC error.
    reject_acknowledges: Arc<RwLock<bool>>,
}

impl Default for MockMonitoring {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMonitoring {
    /// Create a new mock monitoring system with no events.
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
            acknowledges: Arc::new(RwLock::new(Vec::new())),
            window_queries: Arc::new(RwLock::new(Vec::new())),
            unavailable: Arc::new(RwLock::new(false)),
            reject_acknowledges: Arc::new(RwLock::new(false)),
        }
    }

    /// Add or replace an event.
    pub async fn add_event(&self, event: Event) {
        self.events.write().await.insert(event.id.clone(), event);
    }

    pub async fn event(&self, event_id: &str) -> Option<Event> {
        self.events.read().await.get(event_id).cloned()
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    pub async fn set_reject_acknowledges(&self, reject: bool) {
        *self.reject_acknowledges.write().await = reject;
    }

    /// All recorded acknowledge calls, in order.
    pub async fn acknowledges(&self) -> Vec<RecordedAcknowledge> {
        self.acknowledges.read().await.clone()
    }

    /// Trigger and limit of each problem-event query, in order.
    pub async fn window_queries(&self) -> Vec<(String, u32)> {
        self.window_queries.read().await.clone()
    }

    async fn check_available(&self) -> Result<(), MonitoringError> {
        if *self.unavailable.read().await {
            return Err(MonitoringError::ConnectionFailed(
                "mock monitoring unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Monitoring for MockMonitoring {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, MonitoringError> {
        self.check_available().await?;
        Ok(self.event(event_id).await)
    }

    async fn recent_problem_events(
        &self,
        trigger_id: &str,
        limit: u32,
    ) -> Result<Vec<Event>, MonitoringError> {
        self.check_available().await?;
        self.window_queries
            .write()
            .await
            .push((trigger_id.to_string(), limit));

        let mut problems: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.kind == EventKind::Problem)
            .filter(|e| e.trigger_id.as_deref() == Some(trigger_id))
            .cloned()
            .collect();
        problems.sort_by(|a, b| b.clock.cmp(&a.clock).then_with(|| b.id.cmp(&a.id)));
        problems.truncate(limit as usize);
        Ok(problems)
    }

    async fn acknowledge(
        &self,
        event_id: &str,
        action: AckAction,
        message: &str,
    ) -> Result<(), MonitoringError> {
        self.check_available().await?;
        self.acknowledges.write().await.push(RecordedAcknowledge {
            event_id: event_id.to_string(),
            action,
            message: message.to_string(),
        });

        if *self.reject_acknowledges.read().await {
            return Err(MonitoringError::Rpc {
                code: -32500,
                message: "Application error.".to_string(),
                data: Some("Acknowledges are disabled.".to_string()),
            });
        }

        match self.events.write().await.get_mut(event_id) {
            Some(event) if action.contains(AckAction::ADD_MESSAGE) => {
                event.annotations.push(Annotation::new(message));
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(MonitoringError::Rpc {
                code: -32500,
                message: "Application error.".to_string(),
                data: Some("No permissions to referred object or it does not exist!".to_string()),
            }),
        }
    }
}
