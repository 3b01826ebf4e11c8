//! ---
//! cm_section: "02-chaos-client"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Chaos Monkey client library and campaign runner."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
//! Client for the Chaos Monkey REST API.
//!
//! [`ChaosClient`] triggers and lists chaos events against an auto scaling
//! group. [`CampaignRunner`] repeats triggers with a fixed interval and a
//! per-attempt probability.

pub mod campaign;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod strategy;
pub mod transport;

pub use campaign::{
    CampaignParams, CampaignReport, CampaignRunner, CampaignState, EventTrigger, Pause,
    ThreadPause,
};
pub use client::{ChaosClient, API_PATH};
pub use codec::ChaosEvent;
pub use config::{ClientConfig, ConfigLayer, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use error::{ChaosError, Result};
pub use metrics::{AttemptOutcome, CampaignMetrics};
pub use strategy::{Strategy, DEFAULT_STRATEGIES};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// Crate prelude collecting the types needed to trigger events.
pub mod prelude {
    pub use super::campaign::{CampaignParams, CampaignRunner, EventTrigger, ThreadPause};
    pub use super::client::ChaosClient;
    pub use super::codec::ChaosEvent;
    pub use super::config::ClientConfig;
    pub use super::error::{ChaosError, Result};
    pub use super::strategy::Strategy;
}
