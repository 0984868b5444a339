//! Zabbix JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::MonitoringConfig;

use super::{AckAction, Annotation, Event, EventKind, Monitoring, MonitoringError};

/// `event.get` object type for trigger events.
const OBJECT_TRIGGER: u8 = 0;
/// `event.get` source for trigger events.
const SOURCE_TRIGGER: u8 = 0;

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

/// Zabbix event as returned by `event.get`. Numbers arrive as strings.
#[derive(Debug, Deserialize)]
struct ZabbixEvent {
    eventid: String,
    #[serde(default)]
    objectid: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    clock: Option<String>,
    #[serde(default)]
    acknowledges: Vec<ZabbixAcknowledge>,
}

#[derive(Debug, Deserialize)]
struct ZabbixAcknowledge {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    clock: Option<String>,
}

impl ZabbixEvent {
    fn into_event(self) -> Event {
        Event {
            kind: EventKind::from_value(self.value.as_deref().unwrap_or_default()),
            trigger_id: self.objectid.filter(|id| !id.is_empty() && id != "0"),
            clock: parse_clock(self.clock.as_deref()),
            annotations: self
                .acknowledges
                .into_iter()
                .map(|ack| Annotation {
                    message: ack.message.unwrap_or_default(),
                    clock: parse_clock(ack.clock.as_deref()),
                })
                .collect(),
            id: self.eventid,
        }
    }
}

fn parse_clock(clock: Option<&str>) -> Option<i64> {
    clock.and_then(|c| c.trim().parse::<i64>().ok())
}

fn event_output() -> Value {
    json!(["eventid", "objectid", "value", "clock"])
}

fn acknowledge_output() -> Value {
    json!(["message", "clock"])
}

fn get_event_params(event_id: &str) -> Value {
    json!({
        "eventids": [event_id],
        "output": event_output(),
        "select_acknowledges": acknowledge_output(),
    })
}

fn recent_problems_params(trigger_id: &str, limit: u32) -> Value {
    json!({
        "object": OBJECT_TRIGGER,
        "source": SOURCE_TRIGGER,
        "objectids": [trigger_id],
        "value": 1,
        "output": event_output(),
        "select_acknowledges": acknowledge_output(),
        "sortfield": ["clock"],
        "sortorder": "DESC",
        "limit": limit,
    })
}

fn acknowledge_params(event_id: &str, action: AckAction, message: &str) -> Value {
    json!({
        "eventids": [event_id],
        "action": action.bits(),
        "message": message,
    })
}

/// JSON-RPC request body; carries the token only when `auth` is given.
fn rpc_payload(method: &str, params: Value, id: u64, auth: Option<&str>) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": id,
    });
    if let Some(token) = auth {
        payload["auth"] = json!(token);
    }
    payload
}

fn map_transport_error(e: reqwest::Error) -> MonitoringError {
    if e.is_timeout() {
        MonitoringError::Timeout
    } else if e.is_connect() {
        MonitoringError::ConnectionFailed(e.to_string())
    } else {
        MonitoringError::ApiError(e.to_string())
    }
}

/// Zabbix API client authenticated with an API token.
pub struct ZabbixClient {
    client: Client,
    config: MonitoringConfig,
    request_id: AtomicU64,
}

impl ZabbixClient {
    /// Create a new Zabbix client.
    pub fn new(config: MonitoringConfig) -> Result<Self, MonitoringError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs as u64))
            .timeout(Duration::from_secs(config.read_timeout_secs as u64))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| {
                MonitoringError::ApiError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            request_id: AtomicU64::new(1),
        })
    }

    /// Perform one JSON-RPC call and unwrap its `result`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, MonitoringError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let auth_in_body = self.config.auth_in_body;
        let payload = rpc_payload(
            method,
            params,
            id,
            auth_in_body.then_some(self.config.api_token.as_str()),
        );
        debug!(method, id, auth_in_body, "Zabbix API call");

        let mut request = self.client.post(&self.config.api_url).json(&payload);
        if !auth_in_body {
            request = request.bearer_auth(&self.config.api_token);
        }
        let response = request
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitoringError::Http(status.as_u16()));
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| MonitoringError::MalformedResponse(e.to_string()))?;

        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: RpcResponse<T>) -> Result<T, MonitoringError> {
    if let Some(error) = envelope.error {
        return Err(MonitoringError::Rpc {
            code: error.code,
            message: error.message,
            data: error.data,
        });
    }
    envelope
        .result
        .ok_or_else(|| MonitoringError::MalformedResponse("missing result".to_string()))
}

#[async_trait]
impl Monitoring for ZabbixClient {
    fn name(&self) -> &str {
        "zabbix"
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, MonitoringError> {
        let events: Vec<ZabbixEvent> = self.call("event.get", get_event_params(event_id)).await?;
        Ok(events.into_iter().next().map(ZabbixEvent::into_event))
    }

    async fn recent_problem_events(
        &self,
        trigger_id: &str,
        limit: u32,
    ) -> Result<Vec<Event>, MonitoringError> {
        let events: Vec<ZabbixEvent> = self
            .call("event.get", recent_problems_params(trigger_id, limit))
            .await?;
        Ok(events.into_iter().map(ZabbixEvent::into_event).collect())
    }

    async fn acknowledge(
        &self,
        event_id: &str,
        action: AckAction,
        message: &str,
    ) -> Result<(), MonitoringError> {
        let _: Value = self
            .call(
                "event.acknowledge",
                acknowledge_params(event_id, action, message),
            )
            .await?;
        Ok(())
    }
}
