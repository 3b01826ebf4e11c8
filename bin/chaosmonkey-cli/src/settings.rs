//! ---
//! cm_section: "05-cli"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Flag, environment and config file precedence."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
//! Settings are resolved in a fixed order: command line flag, then the
//! matching `CHAOSMONKEY_*` environment variable (both handled by clap), then
//! the TOML config file, then built-in defaults.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chaosmonkey::{CampaignParams, ClientConfig, ConfigLayer, Strategy};
use clap::Args;
use serde::Deserialize;
use tracing::debug;

/// Delay between campaign attempts when nothing else is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, Args)]
pub struct SettingsArgs {
    /// Name of the auto scaling group to attack. Lists events when unset.
    #[arg(short, long, env = "CHAOSMONKEY_GROUP")]
    pub group: Option<String>,

    /// Chaos strategy to use. The server picks one when empty.
    #[arg(short, long, env = "CHAOSMONKEY_STRATEGY")]
    pub strategy: Option<String>,

    /// Base URL of the Chaos Monkey REST API.
    #[arg(short, long, env = "CHAOSMONKEY_ENDPOINT")]
    pub endpoint: Option<String>,

    /// HTTP basic auth username.
    #[arg(long, env = "CHAOSMONKEY_USERNAME")]
    pub username: Option<String>,

    /// HTTP basic auth password.
    #[arg(long, env = "CHAOSMONKEY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Number of times to trigger chaos.
    #[arg(short, long, env = "CHAOSMONKEY_COUNT")]
    pub count: Option<u32>,

    /// Delay between triggers, e.g. `30s` or `1m30s`.
    #[arg(short, long, env = "CHAOSMONKEY_INTERVAL")]
    pub interval: Option<humantime::Duration>,

    /// Probability in [0, 1] that each trigger is actually sent.
    #[arg(short, long, env = "CHAOSMONKEY_PROBABILITY")]
    pub probability: Option<f64>,

    /// Per-request timeout.
    #[arg(long, env = "CHAOSMONKEY_TIMEOUT")]
    pub timeout: Option<humantime::Duration>,

    /// TOML file with `[client]` and `[campaign]` tables.
    #[arg(long, env = "CHAOSMONKEY_CONFIG")]
    pub config: Option<PathBuf>,
}

/// On-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub client: ConfigLayer,
    pub campaign: CampaignFile,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CampaignFile {
    pub group: Option<String>,
    pub strategy: Option<String>,
    pub count: Option<u32>,
    /// Humantime duration string.
    pub interval: Option<String>,
    pub probability: Option<f64>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    /// `None` when no group is configured, which selects list mode.
    pub campaign: Option<CampaignParams>,
}

impl Settings {
    pub fn load(args: &SettingsArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, &file)
    }

    pub fn resolve(args: &SettingsArgs, file: &FileConfig) -> Result<Self> {
        let timeout = args.timeout.map(Duration::from);
        if timeout.is_some_and(|timeout| timeout.is_zero()) {
            bail!("timeout must be greater than zero");
        }
        let flags = ConfigLayer {
            endpoint: args.endpoint.clone(),
            username: args.username.clone(),
            password: args.password.clone(),
            user_agent: None,
            timeout,
        };
        let client = ClientConfig::resolve(&[flags, file.client.clone()]);

        let campaign = resolve_campaign(args, &file.campaign)?;
        Ok(Self { client, campaign })
    }
}

fn resolve_campaign(args: &SettingsArgs, file: &CampaignFile) -> Result<Option<CampaignParams>> {
    let group = first_non_empty(args.group.as_deref(), file.group.as_deref());
    let Some(group) = group else {
        return Ok(None);
    };

    let strategy = first_non_empty(args.strategy.as_deref(), file.strategy.as_deref())
        .map(Strategy::new)
        .unwrap_or_default();
    let interval = match (args.interval, &file.interval) {
        (Some(flag), _) => flag.into(),
        (None, Some(raw)) => humantime::parse_duration(raw)
            .with_context(|| format!("invalid campaign interval {raw:?}"))?,
        (None, None) => DEFAULT_INTERVAL,
    };

    let params = CampaignParams::new(group, strategy)
        .with_count(args.count.or(file.count).unwrap_or(1))
        .with_interval(interval)
        .with_probability(args.probability.or(file.probability).unwrap_or(1.0));
    params.validate()?;
    Ok(Some(params))
}

fn first_non_empty(flag: Option<&str>, file: Option<&str>) -> Option<String> {
    [flag, file]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .map(str::to_owned)
}
