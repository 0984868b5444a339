//! Types for ticketing system operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ResolutionConfig;

/// Ticket number (`idSolicitacaoServico`).
pub type TicketId = u64;

/// Claimable work item of a ticket (`idItemTrabalho`).
pub type WorkItemId = u64;

/// Errors that can occur during ticketing system operations.
#[derive(Debug, Error)]
pub enum TicketingError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("{endpoint} returned HTTP {status}")]
    Http { endpoint: String, status: u16 },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("API error: {0}")]
    ApiError(String),
}

/// Field names of the ticket DTO this crate reads or writes.
pub mod fields {
    pub const ID: &str = "id";
    pub const WORK_ITEM: &str = "idItemTrabalho";
    pub const REQUEST_ID: &str = "idSolicitacaoServico";
    pub const LAST_MODIFICATION: &str = "dtLastModification";
    pub const ASSIGNED_USER: &str = "idUsuarioResponsavelAtual";
    pub const STATUS: &str = "idStatus";
    pub const FLOW_ACTION: &str = "acaoFluxo";
    pub const SOLUTION_CATEGORY: &str = "idCategoriaSolucao";
    pub const INCIDENT_CAUSE: &str = "idCausaIncidente";
    pub const SOLUTION_TEXT: &str = "solucaoResposta";
    pub const CAUSE_TEXT: &str = "detalhamentoCausa";
    pub const VIEW: &str = "view";
    pub const COMMENT_MODE: &str = "commentMode";
    pub const ORIGINAL: &str = "original";
    pub const ACTIVITY_ID: [&str; 3] = ["idAtividade", "id_atividade", "idActivity"];
    pub const ACTIVITY_NAME: [&str; 3] = ["nomeAtividade", "dsAtividade", "atividade"];
}

/// Reads a strictly positive integer from a JSON number or digit string.
pub(crate) fn positive_integer(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().filter(|v| *v > 0),
        Value::String(s) => s.trim().parse::<u64>().ok().filter(|v| *v > 0),
        _ => None,
    }
}

/// Reads a non-empty text value; numbers are rendered as text.
fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Server-side ticket representation as returned by `restoreRequest`.
///
/// The DTO is owned by the ticketing system: fields this crate does not know
/// about are carried through to `saveOrUpdate` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketRecord(Map<String, Value>);

impl TicketRecord {
    /// Minimal record holding only its `id`.
    pub fn new(ticket_id: TicketId) -> Self {
        let mut map = Map::new();
        map.insert(fields::ID.to_string(), Value::from(ticket_id));
        Self(map)
    }

    /// Accepts only a JSON object carrying an `id` member.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) if map.contains_key(fields::ID) => Ok(Self(map)),
            Value::Object(_) => Err("object has no `id` member".to_string()),
            other => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn work_item_id(&self) -> Option<WorkItemId> {
        self.get(fields::WORK_ITEM).and_then(positive_integer)
    }

    /// Request id used by the delegation form (`idSolicitacaoServico`, then `id`).
    pub fn request_id(&self) -> Option<u64> {
        self.get(fields::REQUEST_ID)
            .and_then(positive_integer)
            .or_else(|| self.get(fields::ID).and_then(positive_integer))
    }

    pub fn last_modification(&self) -> Option<&str> {
        self.get(fields::LAST_MODIFICATION)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn assigned_user(&self) -> Option<u64> {
        self.get(fields::ASSIGNED_USER).and_then(positive_integer)
    }

    pub fn activity_id(&self) -> Option<String> {
        fields::ACTIVITY_ID
            .iter()
            .find_map(|key| self.get(key).and_then(non_empty_text))
    }

    pub fn activity_name(&self) -> Option<String> {
        fields::ACTIVITY_NAME
            .iter()
            .find_map(|key| self.get(key).and_then(non_empty_text))
    }

    /// Pin the ticket and work item the next write applies to.
    pub fn set_identity(&mut self, ticket_id: TicketId, work_item_id: WorkItemId) {
        self.insert(fields::ID, Value::from(ticket_id));
        self.insert(fields::WORK_ITEM, Value::from(work_item_id));
    }

    /// Write the resolution fields, stamping `timestamp` as last modification.
    pub fn apply_resolution(&mut self, params: &ResolutionParams, timestamp: &str) {
        self.insert(fields::STATUS, Value::from(params.status_id));
        self.insert(fields::FLOW_ACTION, Value::from(params.flow_action.clone()));
        self.insert(fields::SOLUTION_CATEGORY, Value::from(params.category_id));
        self.insert(fields::INCIDENT_CAUSE, Value::from(params.cause_id));
        self.insert(fields::SOLUTION_TEXT, Value::from(params.solution_html.clone()));
        self.insert(fields::CAUSE_TEXT, Value::from(params.cause_html.clone()));
        self.insert(fields::VIEW, Value::Bool(false));
        self.insert(fields::COMMENT_MODE, Value::Bool(false));
        self.insert(fields::LAST_MODIFICATION, Value::from(timestamp));
        self.0
            .entry(fields::ORIGINAL)
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Workflow codes written into the ticket when resolving it.
///
/// These are opaque to this crate and forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionParams {
    pub status_id: i64,
    pub flow_action: String,
    pub category_id: i64,
    pub cause_id: i64,
    pub solution_html: String,
    pub cause_html: String,
}

impl Default for ResolutionParams {
    fn default() -> Self {
        Self::from(&ResolutionConfig::default())
    }
}

impl From<&ResolutionConfig> for ResolutionParams {
    fn from(config: &ResolutionConfig) -> Self {
        Self {
            status_id: config.status_id,
            flow_action: config.flow_action.clone(),
            category_id: config.category_id,
            cause_id: config.cause_id,
            solution_html: config.solution_html.clone(),
            cause_html: config.cause_html.clone(),
        }
    }
}

impl ResolutionParams {
    /// Resolution for a close triggered by a recovery event, using the
    /// configured event texts.
    pub fn for_event(config: &ResolutionConfig) -> Self {
        Self {
            solution_html: config.event_solution_html.clone(),
            cause_html: config.event_cause_html.clone(),
            ..Self::from(config)
        }
    }
}

/// Payload of the advisory concurrent-access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyCheck {
    pub ticket_id: TicketId,
    pub work_item_id: WorkItemId,
    pub assigned_user: Option<u64>,
    pub last_modification: String,
}

/// Delegation of a ticket's task to a handling group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub request_id: String,
    /// Empty when the task id could not be determined.
    pub task_id: String,
    pub group_id: String,
    pub justification: String,
}

/// Remote operations of the ticketing system shared by opening and closing.
///
/// Every call is a POST on the authenticated session established by `login`.
#[async_trait]
pub trait TicketingSystem: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Exchange credentials for a session.
    async fn login(&self) -> Result<(), TicketingError>;

    /// Fetch the current ticket representation.
    async fn restore(&self, ticket_id: TicketId) -> Result<TicketRecord, TicketingError>;

    /// List groups eligible to capture the work item.
    async fn groups_for_capture(&self, work_item_id: WorkItemId) -> Result<(), TicketingError>;

    /// Claim the work item; returns the server's new last-modification stamp, if any.
    async fn capture(&self, record: &TicketRecord) -> Result<Option<String>, TicketingError>;

    /// Ask the server whether the ticket changed since `check.last_modification`.
    async fn validate_concurrent_access(
        &self,
        check: &ConcurrencyCheck,
    ) -> Result<Value, TicketingError>;

    /// Persist the ticket representation.
    async fn save(&self, record: &TicketRecord) -> Result<(), TicketingError>;

    /// Queue a new service request carrying `description`.
    async fn add_service_request(&self, description: &str) -> Result<(), TicketingError>;

    /// Commit queued requests; returns the raw response body.
    async fn commit_requests(&self) -> Result<String, TicketingError>;

    /// Open the configured activity; returns the raw response body.
    async fn open_activity(&self) -> Result<String, TicketingError>;

    /// Delegate a task to a handling group.
    async fn delegate(&self, delegation: &Delegation) -> Result<(), TicketingError>;
}
