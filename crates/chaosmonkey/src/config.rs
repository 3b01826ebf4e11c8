//! ---
//! cm_section: "02-chaos-client"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Client configuration and layered default resolution."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use std::fmt;
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Endpoint used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080";
/// Per-request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_ENDPOINT: &str = "CHAOSMONKEY_ENDPOINT";
pub const ENV_USERNAME: &str = "CHAOSMONKEY_USERNAME";
pub const ENV_PASSWORD: &str = "CHAOSMONKEY_PASSWORD";

pub fn default_user_agent() -> String {
    format!("chaosmonkey-rs/{}", env!("CARGO_PKG_VERSION"))
}

/// A partial configuration. Layers are stacked in precedence order and the
/// first non-empty value for each field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: Option<String>,
    /// Humantime duration such as `10s` or `1m30s`. Zero means unset.
    #[serde(deserialize_with = "humantime_duration")]
    pub timeout: Option<Duration>,
}

fn humantime_duration<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            humantime::parse_duration(&raw)
                .map_err(|err| D::Error::custom(format!("invalid timeout {raw:?}: {err}")))
        })
        .transpose()
}

impl ConfigLayer {
    /// Layer built from `CHAOSMONKEY_ENDPOINT`, `CHAOSMONKEY_USERNAME` and
    /// `CHAOSMONKEY_PASSWORD`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            endpoint: lookup(ENV_ENDPOINT),
            username: lookup(ENV_USERNAME),
            password: lookup(ENV_PASSWORD),
            user_agent: None,
            timeout: None,
        }
    }
}

/// Resolved client configuration.
///
/// Empty strings and a zero timeout mean "not supplied" and are filled in by
/// [`ClientConfig::with_defaults`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the Chaos Monkey server, e.g. `http://example.com:8080`.
    pub endpoint: String,
    /// Basic auth username. Ignored unless `password` is also set.
    pub username: String,
    /// Basic auth password. Ignored unless `username` is also set.
    pub password: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Reject an empty endpoint instead of falling back to the default.
    pub strict: bool,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Resolve layers in precedence order (highest first), then apply the
    /// built-in defaults.
    pub fn resolve(layers: &[ConfigLayer]) -> Self {
        let timeout = layers
            .iter()
            .find_map(|layer| layer.timeout.filter(|timeout| !timeout.is_zero()))
            .unwrap_or(DEFAULT_TIMEOUT);
        Self {
            endpoint: pick(layers, |layer| layer.endpoint.as_deref())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            username: pick(layers, |layer| layer.username.as_deref()).unwrap_or_default(),
            password: pick(layers, |layer| layer.password.as_deref()).unwrap_or_default(),
            user_agent: pick(layers, |layer| layer.user_agent.as_deref())
                .unwrap_or_else(default_user_agent),
            timeout,
            strict: false,
        }
    }

    /// Fill every unset field from `fallback`, then from the built-in defaults.
    pub fn with_defaults(self, fallback: &ConfigLayer) -> Self {
        Self {
            strict: self.strict,
            ..Self::resolve(&[self.as_layer(), fallback.clone()])
        }
    }

    /// Whether requests carry basic auth. Both halves must be present.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    fn as_layer(&self) -> ConfigLayer {
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_owned());
        ConfigLayer {
            endpoint: non_empty(&self.endpoint),
            username: non_empty(&self.username),
            password: non_empty(&self.password),
            user_agent: non_empty(&self.user_agent),
            timeout: (!self.timeout.is_zero()).then_some(self.timeout),
        }
    }
}

fn pick<'a>(
    layers: &'a [ConfigLayer],
    field: impl Fn(&'a ConfigLayer) -> Option<&'a str>,
) -> Option<String> {
    layers
        .iter()
        .filter_map(field)
        .find(|value| !value.is_empty())
        .map(str::to_owned)
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("strict", &self.strict)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(endpoint: Option<&str>, username: Option<&str>) -> ConfigLayer {
        ConfigLayer {
            endpoint: endpoint.map(str::to_owned),
            username: username.map(str::to_owned),
            ..ConfigLayer::default()
        }
    }

    #[test]
    fn empty_resolution_uses_builtins() {
        let config = ClientConfig::resolve(&[]);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.user_agent, default_user_agent());
        assert!(!config.has_credentials());
    }

    #[test]
    fn earlier_layers_win_and_empty_values_fall_through() {
        let config = ClientConfig::resolve(&[
            layer(Some(""), Some("flag-user")),
            layer(Some("http://env:8080"), Some("env-user")),
            layer(Some("http://file:8080"), None),
        ]);
        assert_eq!(config.endpoint, "http://env:8080");
        assert_eq!(config.username, "flag-user");
    }

    #[test]
    fn with_defaults_keeps_explicit_values() {
        let env = ConfigLayer::from_lookup(|key| match key {
            ENV_ENDPOINT => Some("http://env:9000".into()),
            ENV_USERNAME => Some("env-user".into()),
            ENV_PASSWORD => Some("env-pass".into()),
            _ => None,
        });
        let config = ClientConfig::new("http://explicit:8080")
            .strict()
            .with_defaults(&env);
        assert_eq!(config.endpoint, "http://explicit:8080");
        assert_eq!(config.username, "env-user");
        assert_eq!(config.password, "env-pass");
        assert!(config.strict);
    }

    #[test]
    fn one_sided_credentials_do_not_count() {
        let config = ClientConfig::new("").with_credentials("user", "");
        assert!(!config.has_credentials());
        let config = ClientConfig::new("").with_credentials("", "secret");
        assert!(!config.has_credentials());
        let config = ClientConfig::new("").with_credentials("user", "secret");
        assert!(config.has_credentials());
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = ClientConfig::new("http://x").with_credentials("user", "hunter2");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn explicit_sub_second_timeout_survives_defaults() {
        let config = ClientConfig::new("http://x")
            .with_timeout(Duration::from_millis(250))
            .with_defaults(&ConfigLayer::default());
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn layer_timeout_overrides_default() {
        let layer: ConfigLayer =
            serde_json::from_str(r#"{"endpoint":"http://x:1","timeout":"1m30s"}"#).unwrap();
        assert_eq!(layer.endpoint.as_deref(), Some("http://x:1"));
        assert_eq!(ClientConfig::resolve(&[layer]).timeout, Duration::from_secs(90));

        let layer: ConfigLayer = serde_json::from_str(r#"{"timeout":"250ms"}"#).unwrap();
        assert_eq!(layer.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn layer_timeout_must_be_a_duration_string() {
        assert!(serde_json::from_str::<ConfigLayer>(r#"{"timeout":"soon"}"#).is_err());
        assert!(serde_json::from_str::<ConfigLayer>(r#"{"timeout":3}"#).is_err());
        let zero: ConfigLayer = serde_json::from_str(r#"{"timeout":"0s"}"#).unwrap();
        assert_eq!(ClientConfig::resolve(&[zero]).timeout, DEFAULT_TIMEOUT);
    }
}
