//! ---
//! cm_section: "04-campaign"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Prometheus counters for campaign attempts."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};

/// Result of a single campaign attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Triggered,
    Skipped,
    Failed,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Triggered => "triggered",
            AttemptOutcome::Skipped => "skipped",
            AttemptOutcome::Failed => "failed",
        }
    }
}

/// Counters published by the campaign runner.
#[derive(Clone)]
pub struct CampaignMetrics {
    attempts_total: IntCounterVec,
}

impl CampaignMetrics {
    /// Register the campaign metric family against `registry`.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let attempts_total = IntCounterVec::new(
            Opts::new(
                "chaosmonkey_campaign_attempts_total",
                "Campaign attempts partitioned by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(attempts_total.clone()))?;
        Ok(Self { attempts_total })
    }

    pub fn record(&self, outcome: AttemptOutcome) {
        self.attempts_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    pub fn count(&self, outcome: AttemptOutcome) -> u64 {
        self.attempts_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }
}

impl std::fmt::Debug for CampaignMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignMetrics").finish_non_exhaustive()
    }
}

/// Render `registry` in the Prometheus text exposition format.
pub fn encode_text(registry: &Registry) -> prometheus::Result<String> {
    TextEncoder::new().encode_to_string(&registry.gather())
}
