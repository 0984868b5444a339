//! CITSmart ticketing client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, HOST, ORIGIN, REFERER};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{PortalConfig, TicketingConfig};

use super::{
    ConcurrencyCheck, Delegation, TicketId, TicketRecord, TicketingError, TicketingSystem,
    WorkItemId,
};

const LOGIN_PATH: &str = "/citsmart/services/login";
const REST_BASE: &str = "/citsmart/rest/citajax/ticket/serviceRequestIncident";
const PORTAL_EVENT_PATH: &str = "/citsmart/pages/smartPortal/smartPortal.event";
const PORTAL_LOAD_PATH: &str = "/citsmart/pages/smartPortal/smartPortal.load";
const DELEGATE_PATH: &str = "/citsmart/pages/smartPortal/delegacaoTarefa.save";

/// Page the REST calls claim to originate from.
const REAL_URL: &str = "/citsmart/serviceRequestIncident/serviceRequestIncident.load";

const DEFAULT_JUSTIFICATION: &str = "Delegado automaticamente via integração";

/// Normalize a configured base URL: trim, drop trailing slashes, default to https.
pub fn normalize_base_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.contains("://") {
        base.to_string()
    } else {
        format!("https://{}", base)
    }
}

/// Origin the requests claim: the forced host when set, else the base URL's authority.
fn origin_for(base_url: &str, forced_host: Option<&str>) -> String {
    match forced_host {
        Some(host) => format!("https://{}", host),
        None => {
            let (scheme, rest) = base_url.split_once("://").unwrap_or(("https", base_url));
            let authority = rest.split('/').next().unwrap_or(rest);
            format!("{}://{}", scheme, authority)
        }
    }
}

/// Body of a `citajax` REST call.
fn rest_payload(object: Value) -> Value {
    json!({ "object": object, "realUrl": REAL_URL })
}

fn restore_payload(ticket_id: TicketId) -> Value {
    rest_payload(json!({ "idSolicitacaoServico": ticket_id, "view": false }))
}

fn concurrency_payload(check: &ConcurrencyCheck) -> Value {
    let mut object = json!({
        "id": check.ticket_id,
        "idItemTrabalho": check.work_item_id,
        "dtLastModification": check.last_modification,
    });
    if let Some(user) = check.assigned_user {
        object["idUsuarioResponsavelAtual"] = json!(user);
    }
    rest_payload(object)
}

/// Cache-busting stamp the portal expects on form posts.
fn nocache() -> String {
    Local::now().format("%a %b %d %Y %H:%M:%S GMT%z").to_string()
}

fn portal_form(
    action: &str,
    mut fields: Vec<(&'static str, String)>,
) -> Vec<(&'static str, String)> {
    fields.extend([
        ("method", "execute".to_string()),
        ("parmCount", String::new()),
        ("parm1", "smartPortal".to_string()),
        ("parm2", String::new()),
        ("parm3", action.to_string()),
        ("nocache", nocache()),
    ]);
    fields
}

fn add_request_form(portal: &PortalConfig, description: &str) -> Vec<(&'static str, String)> {
    portal_form(
        "adicionaSolicitacaoServico",
        vec![
            ("uuid", portal.uuid.clone()),
            ("idPortfolio", portal.portfolio_id.clone()),
            ("idServico", portal.service_id.clone()),
            ("idAtividade", portal.activity_id.clone()),
            ("nomeAtividade", portal.activity_name.clone()),
            ("mostrarDescPortal", "S".to_string()),
            ("idQuestionario", String::new()),
            ("questionarioObrigatorio", "false".to_string()),
            ("questionarioRespondido", "false".to_string()),
            ("requestStatus", String::new()),
            ("idManager", "0".to_string()),
            ("serializedBuilderObjects", "{}".to_string()),
            ("idsItemConfiguracaoSelecionados", String::new()),
            ("idContrato", portal.contract_id.clone()),
            ("requestTitle", String::new()),
            ("solicitacaoObservacao", description.to_string()),
            ("nomeDoManager", String::new()),
        ],
    )
}

fn commit_form() -> Vec<(&'static str, String)> {
    portal_form(
        "saveMeusPedidos",
        vec![
            ("uuid", String::new()),
            ("requestStatus", String::new()),
            ("requestMessage", String::new()),
            ("removeLastTicketWhenErrorOccurs", "true".to_string()),
        ],
    )
}

fn open_activity_form(portal: &PortalConfig) -> Vec<(&'static str, String)> {
    portal_form(
        "openAtividade",
        vec![
            ("idPortfolio", portal.portfolio_id.clone()),
            ("idServico", portal.service_id.clone()),
            ("idAtividade", portal.activity_id.clone()),
            ("tipoPortfolio", String::new()),
            ("nomePortfolio", portal.portfolio_name.clone()),
            ("nomeServicoNegocio", portal.service_name.clone()),
            ("nomeAtividade", portal.activity_name.clone()),
            ("servicosAdicionados", String::new()),
        ],
    )
}

fn delegation_form(delegation: &Delegation) -> Vec<(&'static str, String)> {
    let justification = if delegation.justification.is_empty() {
        DEFAULT_JUSTIFICATION.to_string()
    } else {
        delegation.justification.clone()
    };
    vec![
        ("idSolicitacaoServico", delegation.request_id.clone()),
        ("idTarefa", delegation.task_id.clone()),
        ("acaoFluxo", "D".to_string()),
        ("idUsuarioDestino", String::new()),
        ("txtFiltro", String::new()),
        ("acUsuario", String::new()),
        ("idGrupoDestino", delegation.group_id.clone()),
        ("delegacaoJustificativa", justification),
        ("nocache", nocache()),
    ]
}

fn map_transport_error(e: reqwest::Error) -> TicketingError {
    if e.is_timeout() {
        TicketingError::Timeout
    } else if e.is_connect() {
        TicketingError::ConnectionFailed(e.to_string())
    } else {
        TicketingError::ApiError(e.to_string())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, TicketingError> {
    HeaderValue::from_str(value)
        .map_err(|e| TicketingError::ApiError(format!("Invalid header value {:?}: {}", value, e)))
}

/// CITSmart client over a cookie-backed session.
pub struct CitsmartClient {
    client: Client,
    config: TicketingConfig,
    portal: PortalConfig,
    base_url: String,
    /// Headers for `citajax` REST calls.
    rest_headers: HeaderMap,
    /// Headers for portal form posts.
    form_headers: HeaderMap,
}

impl CitsmartClient {
    /// Create a new CITSmart client.
    pub fn new(config: TicketingConfig, portal: PortalConfig) -> Result<Self, TicketingError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs as u64))
            .timeout(Duration::from_secs(config.read_timeout_secs as u64))
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| TicketingError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = normalize_base_url(&config.base_url);
        let forced_host = config.forced_host.as_deref().filter(|h| !h.is_empty());
        let origin = origin_for(&base_url, forced_host);

        let mut rest_headers = HeaderMap::new();
        rest_headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        rest_headers.insert(ORIGIN, header_value(&origin)?);
        rest_headers.insert(REFERER, header_value(&format!("{}/", origin))?);

        let mut form_headers = HeaderMap::new();
        form_headers.insert(
            REFERER,
            header_value(&format!("{}{}", base_url, PORTAL_LOAD_PATH))?,
        );

        if let Some(host) = forced_host {
            let host = header_value(host)?;
            rest_headers.insert(HOST, host.clone());
            form_headers.insert(HOST, host);
        }

        Ok(Self {
            client,
            config,
            portal,
            base_url,
            rest_headers,
            form_headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a `citajax` payload, failing on any non-success status.
    async fn post_rest(
        &self,
        operation: &str,
        payload: &Value,
    ) -> Result<Response, TicketingError> {
        let url = self.url(&format!("{}/{}", REST_BASE, operation));
        debug!(operation, "CITSmart REST call");

        let response = self
            .client
            .post(&url)
            .headers(self.rest_headers.clone())
            .json(payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        ensure_success(operation, response)
    }

    /// POST a portal form, failing on any non-success status. Returns the body.
    async fn post_form(
        &self,
        operation: &str,
        path: &str,
        form: &[(&'static str, String)],
    ) -> Result<String, TicketingError> {
        debug!(operation, "CITSmart portal call");

        let response = self
            .client
            .post(self.url(path))
            .headers(self.form_headers.clone())
            .form(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        ensure_success(operation, response)?
            .text()
            .await
            .map_err(map_transport_error)
    }
}

fn ensure_success(operation: &str, response: Response) -> Result<Response, TicketingError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TicketingError::Http {
            endpoint: operation.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl TicketingSystem for CitsmartClient {
    fn name(&self) -> &str {
        "citsmart"
    }

    async fn login(&self) -> Result<(), TicketingError> {
        let payload = json!({
            "userName": self.config.username,
            "password": self.config.password,
            "platform": self.config.platform,
        });

        let mut request = self
            .client
            .post(self.url(LOGIN_PATH))
            .header(ACCEPT, "application/json")
            .json(&payload);
        if let Some(host) = self.rest_headers.get(HOST) {
            request = request.header(HOST, host.clone());
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            // Session cookie is stored by the cookie jar
            debug!("CITSmart login successful");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TicketingError::AuthenticationFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn restore(&self, ticket_id: TicketId) -> Result<TicketRecord, TicketingError> {
        const OP: &str = "restoreRequest";
        let response = self.post_rest(OP, &restore_payload(ticket_id)).await?;
        let body = response.text().await.map_err(map_transport_error)?;

        let value: Value =
            serde_json::from_str(&body).map_err(|e| TicketingError::MalformedResponse {
                endpoint: OP.to_string(),
                reason: format!("not JSON: {}", e),
            })?;

        TicketRecord::from_value(value).map_err(|reason| TicketingError::MalformedResponse {
            endpoint: OP.to_string(),
            reason,
        })
    }

    async fn groups_for_capture(&self, work_item_id: WorkItemId) -> Result<(), TicketingError> {
        let payload = rest_payload(json!({ "idItemTrabalho": work_item_id }));
        self.post_rest("groupsForCapture", &payload).await?;
        Ok(())
    }

    async fn capture(&self, record: &TicketRecord) -> Result<Option<String>, TicketingError> {
        let payload = rest_payload(Value::Object(record.as_map().clone()));
        let response = self.post_rest("capturarTarefa", &payload).await?;
        let body = response.text().await.map_err(map_transport_error)?;

        // The capture answer is informational; anything but an object means "no stamp".
        let stamp = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("dtLastModification")
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .filter(|s| !s.is_empty());
        Ok(stamp)
    }

    async fn validate_concurrent_access(
        &self,
        check: &ConcurrencyCheck,
    ) -> Result<Value, TicketingError> {
        const OP: &str = "validateConcurrentAccess";
        let response = self.post_rest(OP, &concurrency_payload(check)).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| TicketingError::MalformedResponse {
                endpoint: OP.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, record: &TicketRecord) -> Result<(), TicketingError> {
        let payload = rest_payload(Value::Object(record.as_map().clone()));
        self.post_rest("saveOrUpdate", &payload).await?;
        Ok(())
    }

    async fn add_service_request(&self, description: &str) -> Result<(), TicketingError> {
        let form = add_request_form(&self.portal, description);
        self.post_form("adicionaSolicitacaoServico", PORTAL_EVENT_PATH, &form)
            .await?;
        Ok(())
    }

    async fn commit_requests(&self) -> Result<String, TicketingError> {
        self.post_form("saveMeusPedidos", PORTAL_EVENT_PATH, &commit_form())
            .await
    }

    async fn open_activity(&self) -> Result<String, TicketingError> {
        let form = open_activity_form(&self.portal);
        self.post_form("openAtividade", PORTAL_EVENT_PATH, &form).await
    }

    async fn delegate(&self, delegation: &Delegation) -> Result<(), TicketingError> {
        let form = delegation_form(delegation);
        self.post_form("delegacaoTarefa", DELEGATE_PATH, &form).await?;
        Ok(())
    }
}
