//! ---
//! cm_section: "02-chaos-client"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Chaos Monkey REST API client."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode, Url};
use chaosmonkey_logging::{cm_warn, LogContext};
use tracing::debug;

use crate::codec::{self, ChaosEvent};
use crate::config::{ClientConfig, ConfigLayer};
use crate::error::{decode_error, ChaosError, Result};
use crate::strategy::Strategy;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// Path of the chaos resource below the configured endpoint.
pub const API_PATH: &str = "/simianarmy/api/v1/chaos";

const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Client for the Chaos Monkey REST API.
///
/// Triggering events requires an unleashed Chaos Monkey with on-demand
/// termination enabled on the server:
///
/// ```text
/// simianarmy.chaos.leashed = false
/// simianarmy.chaos.terminateOndemand.enabled = true
/// ```
pub struct ChaosClient {
    config: ClientConfig,
    url: Url,
    headers: HeaderMap,
    transport: Arc<dyn Transport>,
}

impl ChaosClient {
    /// Build a client over HTTP. Unset fields are filled from the
    /// `CHAOSMONKEY_*` environment variables and then the built-in defaults.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = prepare(config, &ConfigLayer::from_env())?;
        let transport = ReqwestTransport::new(config.timeout)?;
        Self::assemble(config, Arc::new(transport))
    }

    /// Build a client over a custom transport. Only the built-in defaults are
    /// applied; the environment is not consulted.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let config = prepare(config, &ConfigLayer::default())?;
        Self::assemble(config, transport)
    }

    fn assemble(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let raw = format!("{}{}", config.endpoint.trim_end_matches('/'), API_PATH);
        let url = Url::parse(&raw)
            .map_err(|err| ChaosError::config(format!("invalid endpoint {:?}: {err}", config.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChaosError::config(format!(
                "endpoint {:?} must use http or https",
                config.endpoint
            )));
        }

        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| ChaosError::config("user agent contains invalid characters"))?;
        headers.insert(USER_AGENT, user_agent);
        headers.insert(ACCEPT, APPLICATION_JSON);
        if config.has_credentials() {
            let token = general_purpose::STANDARD
                .encode(format!("{}:{}", config.username, config.password));
            let mut value = HeaderValue::from_str(&format!("Basic {token}"))
                .map_err(|_| ChaosError::config("credentials contain invalid characters"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        } else if !config.username.is_empty() || !config.password.is_empty() {
            cm_warn!(
                context = LogContext::new().with_endpoint(&config.endpoint),
                "only one of username and password is set; sending requests without authentication"
            );
        }

        Ok(Self {
            config,
            url,
            headers,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Ask Chaos Monkey to break an instance of `group` using `strategy`.
    /// An empty strategy lets the server choose.
    pub fn trigger_event(&self, group: &str, strategy: &Strategy) -> Result<ChaosEvent> {
        let body = codec::encode_trigger(group, strategy)?;
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_TYPE, APPLICATION_JSON);
        let response = self.execute(HttpRequest {
            method: Method::POST,
            url: self.url.clone(),
            headers,
            body: Some(body),
        })?;
        codec::decode_event(&response.body)
    }

    /// All chaos events known to the server, in server order.
    pub fn list_events(&self) -> Result<Vec<ChaosEvent>> {
        self.events(0)
    }

    /// Chaos events since `since`, truncated to whole seconds.
    pub fn list_events_since(&self, since: DateTime<Utc>) -> Result<Vec<ChaosEvent>> {
        self.events(since.timestamp().saturating_mul(1000))
    }

    fn events(&self, since_ms: i64) -> Result<Vec<ChaosEvent>> {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("since", &since_ms.to_string());
        let response = self.execute(HttpRequest {
            method: Method::GET,
            url,
            headers: self.headers.clone(),
            body: None,
        })?;
        codec::decode_events(&response.body)
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.clone();
        let url = request.url.clone();
        let response = self.transport.send(request).map_err(|err| {
            debug!(%method, %url, error = %err, "chaos API request failed");
            err
        })?;
        debug!(%method, %url, status = %response.status, "chaos API responded");
        if response.status != StatusCode::OK {
            return Err(decode_error(response.status, &response.body));
        }
        Ok(response)
    }
}

fn prepare(config: ClientConfig, fallback: &ConfigLayer) -> Result<ClientConfig> {
    if config.strict && config.endpoint.trim().is_empty() {
        return Err(ChaosError::config("endpoint must not be empty"));
    }
    Ok(config.with_defaults(fallback))
}

impl std::fmt::Debug for ChaosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaosClient")
            .field("config", &self.config)
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}
