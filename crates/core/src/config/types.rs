use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub ticketing: TicketingConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// CITSmart connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicketingConfig {
    /// Base URL (e.g., "https://10.155.11.2"). A missing scheme defaults to https.
    pub base_url: String,
    /// Host header to send instead of the one derived from `base_url`.
    #[serde(default)]
    pub forced_host: Option<String>,
    pub username: String,
    pub password: String,
    /// Login platform, usually "WS".
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u32,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u32,
    /// Accept self-signed or mismatched TLS certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Zabbix JSON-RPC settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Full URL of `api_jsonrpc.php`.
    pub api_url: String,
    pub api_token: String,
    /// Send the token as the `auth` member of each request instead of an
    /// `Authorization: Bearer` header. Servers before 6.4 only accept this form.
    #[serde(default = "default_auth_in_body")]
    pub auth_in_body: bool,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u32,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u32,
    /// How many recent problem events of a trigger are scanned for a marker.
    #[serde(default = "default_scan_window")]
    pub scan_window: u32,
    /// Key of the `KEY=<ticket>` marker written into acknowledge messages.
    #[serde(default = "default_marker_key")]
    pub marker_key: String,
    /// Key written to the problem event once its ticket has been closed.
    #[serde(default = "default_closed_marker_key")]
    pub closed_marker_key: String,
}

/// Service portal identifiers used when opening a ticket
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortalConfig {
    #[serde(default = "default_portal_uuid")]
    pub uuid: String,
    #[serde(default = "default_portfolio_id")]
    pub portfolio_id: String,
    #[serde(default = "default_portfolio_name")]
    pub portfolio_name: String,
    #[serde(default = "default_service_id")]
    pub service_id: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub activity_id: String,
    #[serde(default = "default_activity_name")]
    pub activity_name: String,
    #[serde(default = "default_contract_id")]
    pub contract_id: String,
    /// Group the new ticket's work item is delegated to.
    #[serde(default = "default_group_id")]
    pub default_group_id: String,
    /// Description used when an alert carries none.
    #[serde(default = "default_description")]
    pub default_description: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            uuid: default_portal_uuid(),
            portfolio_id: default_portfolio_id(),
            portfolio_name: default_portfolio_name(),
            service_id: default_service_id(),
            service_name: default_service_name(),
            activity_id: String::new(),
            activity_name: default_activity_name(),
            contract_id: default_contract_id(),
            default_group_id: default_group_id(),
            default_description: default_description(),
        }
    }
}

/// Workflow codes applied when resolving a ticket
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResolutionConfig {
    #[serde(default = "default_status_id")]
    pub status_id: i64,
    #[serde(default = "default_flow_action")]
    pub flow_action: String,
    #[serde(default = "default_category_id")]
    pub category_id: i64,
    #[serde(default = "default_cause_id")]
    pub cause_id: i64,
    #[serde(default = "default_solution_html")]
    pub solution_html: String,
    #[serde(default = "default_cause_html")]
    pub cause_html: String,
    /// Solution text when a recovery event triggered the close.
    #[serde(default = "default_event_solution_html")]
    pub event_solution_html: String,
    /// Cause text when a recovery event triggered the close.
    #[serde(default = "default_event_cause_html")]
    pub event_cause_html: String,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            status_id: default_status_id(),
            flow_action: default_flow_action(),
            category_id: default_category_id(),
            cause_id: default_cause_id(),
            solution_html: default_solution_html(),
            cause_html: default_cause_html(),
            event_solution_html: default_event_solution_html(),
            event_cause_html: default_event_cause_html(),
        }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_log")]
    pub log_file: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_file: default_audit_log(),
        }
    }
}

fn default_platform() -> String {
    "WS".to_string()
}

fn default_connect_timeout() -> u32 {
    10
}

fn default_read_timeout() -> u32 {
    60
}

fn default_auth_in_body() -> bool {
    true
}

fn default_scan_window() -> u32 {
    20
}

fn default_marker_key() -> String {
    "CITSmartTicketID".to_string()
}

fn default_closed_marker_key() -> String {
    "CITSmartTicketClosed".to_string()
}

fn default_portal_uuid() -> String {
    "4149ce29-154f2bfa-cdb2d33b-b13493cb".to_string()
}

fn default_portfolio_id() -> String {
    "1".to_string()
}

fn default_portfolio_name() -> String {
    "Central".to_string()
}

fn default_service_id() -> String {
    "1494".to_string()
}

fn default_service_name() -> String {
    "Solicita".to_string()
}

fn default_activity_name() -> String {
    "Erro no Solicita".to_string()
}

fn default_contract_id() -> String {
    "2".to_string()
}

fn default_group_id() -> String {
    "71".to_string()
}

fn default_description() -> String {
    "Alerta do Zabbix".to_string()
}

fn default_status_id() -> i64 {
    4
}

fn default_flow_action() -> String {
    "E".to_string()
}

fn default_category_id() -> i64 {
    13
}

fn default_cause_id() -> i64 {
    6
}

fn default_solution_html() -> String {
    "<div>Resolvido automaticamente via Zabbix (OK).</div>".to_string()
}

fn default_cause_html() -> String {
    "<div>Recuperação detectada pelo Zabbix.</div>".to_string()
}

fn default_event_solution_html() -> String {
    "<div>Problema resolvido automaticamente pelo Zabbix</div>".to_string()
}

fn default_event_cause_html() -> String {
    "<div>Trigger voltou ao estado OK</div>".to_string()
}

fn default_audit_log() -> PathBuf {
    PathBuf::from("tickets.log")
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub ticketing: SanitizedTicketingConfig,
    pub monitoring: SanitizedMonitoringConfig,
    pub portal: PortalConfig,
    pub resolution: ResolutionConfig,
    pub audit: AuditConfig,
}

/// Ticketing config with the password hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTicketingConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_host: Option<String>,
    pub username: String,
    pub password_configured: bool,
    pub platform: String,
    pub connect_timeout_secs: u32,
    pub read_timeout_secs: u32,
    pub accept_invalid_certs: bool,
}

/// Monitoring config with the API token hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMonitoringConfig {
    pub api_url: String,
    pub api_token_configured: bool,
    pub auth_in_body: bool,
    pub accept_invalid_certs: bool,
    pub scan_window: u32,
    pub marker_key: String,
    pub closed_marker_key: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            ticketing: SanitizedTicketingConfig {
                base_url: config.ticketing.base_url.clone(),
                forced_host: config.ticketing.forced_host.clone(),
                username: config.ticketing.username.clone(),
                password_configured: !config.ticketing.password.is_empty(),
                platform: config.ticketing.platform.clone(),
                connect_timeout_secs: config.ticketing.connect_timeout_secs,
                read_timeout_secs: config.ticketing.read_timeout_secs,
                accept_invalid_certs: config.ticketing.accept_invalid_certs,
            },
            monitoring: SanitizedMonitoringConfig {
                api_url: config.monitoring.api_url.clone(),
                api_token_configured: !config.monitoring.api_token.is_empty(),
                auth_in_body: config.monitoring.auth_in_body,
                accept_invalid_certs: config.monitoring.accept_invalid_certs,
                scan_window: config.monitoring.scan_window,
                marker_key: config.monitoring.marker_key.clone(),
                closed_marker_key: config.monitoring.closed_marker_key.clone(),
            },
            portal: config.portal.clone(),
            resolution: config.resolution.clone(),
            audit: config.audit.clone(),
        }
    }
}
