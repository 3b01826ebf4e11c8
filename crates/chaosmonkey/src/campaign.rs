//! ---
//! cm_section: "04-campaign"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Repeated, spaced and probability-gated chaos triggering."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use std::ops::ControlFlow;
use std::time::Duration;

use chaosmonkey_logging::{cm_debug, cm_info, LogContext};
use rand::{Rng, RngCore};

use crate::client::ChaosClient;
use crate::codec::ChaosEvent;
use crate::error::{ChaosError, Result};
use crate::metrics::{AttemptOutcome, CampaignMetrics};
use crate::strategy::Strategy;

/// Anything that can trigger a single chaos event.
pub trait EventTrigger {
    fn trigger(&self, group: &str, strategy: &Strategy) -> Result<ChaosEvent>;

    /// Server the trigger talks to, attached to campaign log events.
    fn endpoint(&self) -> Option<&str> {
        None
    }
}

impl EventTrigger for ChaosClient {
    fn trigger(&self, group: &str, strategy: &Strategy) -> Result<ChaosEvent> {
        self.trigger_event(group, strategy)
    }

    fn endpoint(&self) -> Option<&str> {
        Some(ChaosClient::endpoint(self))
    }
}

impl<T: EventTrigger + ?Sized> EventTrigger for &T {
    fn trigger(&self, group: &str, strategy: &Strategy) -> Result<ChaosEvent> {
        (**self).trigger(group, strategy)
    }

    fn endpoint(&self) -> Option<&str> {
        (**self).endpoint()
    }
}

/// Blocking delay between attempts.
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

/// [`Pause`] that sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// What to attack, how often and how likely.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignParams {
    pub group: String,
    pub strategy: Strategy,
    /// Number of attempts, at least one.
    pub count: u32,
    /// Delay between consecutive attempts.
    pub interval: Duration,
    /// Chance in `[0, 1]` that an attempt is sent rather than skipped.
    pub probability: f64,
}

impl CampaignParams {
    /// A single, always-sent attempt against `group`.
    pub fn new(group: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            group: group.into(),
            strategy,
            count: 1,
            interval: Duration::ZERO,
            probability: 1.0,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.group.trim().is_empty() {
            return Err(ChaosError::config("campaign group must not be empty"));
        }
        if self.count == 0 {
            return Err(ChaosError::config("campaign count must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(ChaosError::config(format!(
                "probability {} is outside [0, 1]",
                self.probability
            )));
        }
        Ok(())
    }
}

/// Position of the runner in its lifecycle. Iterations are one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignState {
    Idle,
    Attempting { iteration: u32 },
    Skipped { iteration: u32 },
    Triggered { iteration: u32 },
    Waiting { iteration: u32 },
    Done,
    /// The caller asked to stop after this iteration's event.
    Stopped { iteration: u32 },
    /// The trigger failed on this iteration.
    Aborted { iteration: u32 },
}

/// Outcome of a completed campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignReport {
    /// Events in the order they were triggered.
    pub events: Vec<ChaosEvent>,
    pub attempts: u32,
    pub skipped: u32,
    /// Set when `on_event` broke out before all attempts were made.
    pub stopped: bool,
}

impl CampaignReport {
    pub fn triggered(&self) -> usize {
        self.events.len()
    }
}

/// Drives an [`EventTrigger`] through `count` attempts.
///
/// Randomness and the inter-attempt pause are injected so runs can be
/// replayed deterministically. Any trigger error aborts the campaign.
pub struct CampaignRunner<T, R, P> {
    params: CampaignParams,
    trigger: T,
    rng: R,
    pause: P,
    state: CampaignState,
    metrics: Option<CampaignMetrics>,
}

impl<T, R, P> CampaignRunner<T, R, P>
where
    T: EventTrigger,
    R: RngCore,
    P: Pause,
{
    pub fn new(params: CampaignParams, trigger: T, rng: R, pause: P) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            trigger,
            rng,
            pause,
            state: CampaignState::Idle,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: CampaignMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> CampaignState {
        self.state
    }

    pub fn params(&self) -> &CampaignParams {
        &self.params
    }

    /// Run the campaign to completion. `on_event` sees each triggered event
    /// as soon as it is returned, together with its iteration number.
    /// Returning [`ControlFlow::Break`] ends the campaign before the next
    /// attempt.
    pub fn run<F>(&mut self, mut on_event: F) -> Result<CampaignReport>
    where
        F: FnMut(u32, &ChaosEvent) -> ControlFlow<()>,
    {
        if self.state != CampaignState::Idle {
            return Err(ChaosError::config("campaign runner can only run once"));
        }
        let group = self.params.group.clone();
        let strategy = self.params.strategy.clone();
        let endpoint = self.trigger.endpoint().unwrap_or_default().to_owned();
        let mut report = CampaignReport::default();

        for iteration in 1..=self.params.count {
            let ctx = LogContext::new()
                .with_group(&group)
                .with_strategy(strategy.as_str())
                .with_iteration(u64::from(iteration))
                .with_endpoint(&endpoint);
            self.transition(CampaignState::Attempting { iteration });
            report.attempts += 1;

            if self.should_attempt() {
                let event = match self.trigger.trigger(&group, &strategy) {
                    Ok(event) => event,
                    Err(err) => {
                        self.transition(CampaignState::Aborted { iteration });
                        self.record(AttemptOutcome::Failed);
                        cm_debug!(context = ctx, "chaos trigger failed: {}", err);
                        return Err(err);
                    }
                };
                self.transition(CampaignState::Triggered { iteration });
                self.record(AttemptOutcome::Triggered);
                cm_info!(context = ctx, "chaos event triggered on instance {}", event.instance_id);
                let flow = on_event(iteration, &event);
                report.events.push(event);
                if flow.is_break() {
                    self.transition(CampaignState::Stopped { iteration });
                    report.stopped = true;
                    cm_info!(context = ctx, "campaign stopped by caller");
                    return Ok(report);
                }
            } else {
                self.transition(CampaignState::Skipped { iteration });
                self.record(AttemptOutcome::Skipped);
                report.skipped += 1;
                cm_debug!(context = ctx, "attempt skipped by probability gate");
            }

            if iteration < self.params.count {
                self.transition(CampaignState::Waiting { iteration });
                self.pause.pause(self.params.interval);
            }
        }

        self.transition(CampaignState::Done);
        if report.skipped > 0 {
            cm_info!(
                context = LogContext::new().with_group(&group),
                "skipped {} of {} attempts",
                report.skipped,
                report.attempts
            );
        }
        Ok(report)
    }

    /// A draw at or above `probability` skips, so `0.0` never fires and
    /// `1.0` never consults the random source.
    fn should_attempt(&mut self) -> bool {
        if self.params.probability >= 1.0 {
            return true;
        }
        let draw: f64 = self.rng.gen();
        draw < self.params.probability
    }

    fn transition(&mut self, next: CampaignState) {
        tracing::trace!(from = ?self.state, to = ?next, "campaign state change");
        self.state = next;
    }

    fn record(&self, outcome: AttemptOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use chrono::DateTime;
    use prometheus::Registry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[derive(Default)]
    struct CountingTrigger {
        calls: Cell<u32>,
        fail_on: Option<u32>,
    }

    impl EventTrigger for CountingTrigger {
        fn trigger(&self, group: &str, strategy: &Strategy) -> Result<ChaosEvent> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if self.fail_on == Some(call) {
                return Err(ChaosError::Server {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    message: "monkey is leashed".into(),
                });
            }
            Ok(ChaosEvent {
                instance_id: format!("i-{call}"),
                group_name: group.to_owned(),
                region: "eu-west-1".into(),
                strategy: strategy.clone(),
                triggered_at: DateTime::from_timestamp(1_460_116_927, 0).unwrap(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingPause {
        pauses: RefCell<Vec<Duration>>,
    }

    impl Pause for &RecordingPause {
        fn pause(&mut self, duration: Duration) {
            self.pauses.borrow_mut().push(duration);
        }
    }

    fn params(count: u32, probability: f64) -> CampaignParams {
        CampaignParams::new("web", Strategy::SHUTDOWN_INSTANCE)
            .with_count(count)
            .with_interval(Duration::from_secs(5))
            .with_probability(probability)
    }

    #[test]
    fn full_probability_triggers_every_attempt_and_pauses_between() {
        let trigger = CountingTrigger::default();
        let pause = RecordingPause::default();
        let mut runner =
            CampaignRunner::new(params(3, 1.0), &trigger, StdRng::seed_from_u64(7), &pause)
                .unwrap();

        let mut seen = Vec::new();
        let report = runner
            .run(|iteration, event| {
                seen.push((iteration, event.instance_id.clone()));
                ControlFlow::Continue(())
            })
            .unwrap();

        assert_eq!(trigger.calls.get(), 3);
        assert_eq!(*pause.pauses.borrow(), vec![Duration::from_secs(5); 2]);
        assert_eq!(report.triggered(), 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(
            seen,
            vec![(1, "i-1".to_owned()), (2, "i-2".to_owned()), (3, "i-3".to_owned())]
        );
        assert_eq!(runner.state(), CampaignState::Done);
    }

    #[test]
    fn zero_probability_skips_everything() {
        let trigger = CountingTrigger::default();
        let pause = RecordingPause::default();
        let mut runner =
            CampaignRunner::new(params(5, 0.0), &trigger, StdRng::seed_from_u64(1), &pause)
                .unwrap();

        let report = runner.run(|_, _| -> ControlFlow<()> { panic!("nothing should trigger") }).unwrap();
        assert_eq!(trigger.calls.get(), 0);
        assert_eq!(report.skipped, 5);
        assert_eq!(report.attempts, 5);
        assert_eq!(pause.pauses.borrow().len(), 4);
    }

    #[test]
    fn seeded_runs_make_identical_decisions() {
        let run = |seed| {
            let trigger = CountingTrigger::default();
            let pause = RecordingPause::default();
            let mut runner = CampaignRunner::new(
                params(50, 0.5),
                &trigger,
                StdRng::seed_from_u64(seed),
                &pause,
            )
            .unwrap();
            let mut fired = Vec::new();
            let report = runner
                .run(|iteration, _| {
                    fired.push(iteration);
                    ControlFlow::Continue(())
                })
                .unwrap();
            assert_eq!(report.triggered() + report.skipped as usize, 50);
            fired
        };
        let first = run(42);
        assert_eq!(first, run(42));
        assert!(!first.is_empty() && first.len() < 50);
    }

    #[test]
    fn trigger_error_aborts_campaign() {
        let trigger = CountingTrigger {
            fail_on: Some(2),
            ..CountingTrigger::default()
        };
        let pause = RecordingPause::default();
        let registry = Registry::new();
        let metrics = CampaignMetrics::new(&registry).unwrap();
        let mut runner =
            CampaignRunner::new(params(4, 1.0), &trigger, StdRng::seed_from_u64(3), &pause)
                .unwrap()
                .with_metrics(metrics.clone());

        let mut seen = 0;
        let err = runner
            .run(|_, _| {
                seen += 1;
                ControlFlow::Continue(())
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "monkey is leashed");
        assert_eq!(trigger.calls.get(), 2);
        assert_eq!(seen, 1);
        assert_eq!(pause.pauses.borrow().len(), 1);
        assert_eq!(metrics.count(AttemptOutcome::Triggered), 1);
        assert_eq!(metrics.count(AttemptOutcome::Failed), 1);
        assert_eq!(runner.state(), CampaignState::Aborted { iteration: 2 });
        assert!(runner.run(|_, _| ControlFlow::Continue(())).is_err());
    }

    #[test]
    fn single_attempt_never_pauses() {
        let trigger = CountingTrigger::default();
        let pause = RecordingPause::default();
        let mut runner =
            CampaignRunner::new(params(1, 1.0), &trigger, StdRng::seed_from_u64(0), &pause)
                .unwrap();
        runner.run(|_, _| ControlFlow::Continue(())).unwrap();
        assert!(pause.pauses.borrow().is_empty());
    }

    #[test]
    fn break_from_callback_stops_before_next_attempt() {
        let trigger = CountingTrigger::default();
        let pause = RecordingPause::default();
        let mut runner =
            CampaignRunner::new(params(5, 1.0), &trigger, StdRng::seed_from_u64(0), &pause)
                .unwrap();

        let report = runner
            .run(|iteration, _| {
                if iteration == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();

        assert_eq!(trigger.calls.get(), 2);
        assert_eq!(report.triggered(), 2);
        assert!(report.stopped);
        assert_eq!(pause.pauses.borrow().len(), 1);
        assert_eq!(runner.state(), CampaignState::Stopped { iteration: 2 });
    }

    #[test]
    fn trigger_endpoint_is_forwarded_through_references() {
        struct Remote;
        impl EventTrigger for Remote {
            fn trigger(&self, _: &str, _: &Strategy) -> Result<ChaosEvent> {
                Err(ChaosError::config("unused"))
            }
            fn endpoint(&self) -> Option<&str> {
                Some("http://chaos.local")
            }
        }
        let remote = Remote;
        assert_eq!(EventTrigger::endpoint(&&remote), Some("http://chaos.local"));
        assert_eq!(CountingTrigger::default().endpoint(), None);
    }

    #[test]
    fn invalid_params_are_rejected() {
        for bad in [
            params(0, 1.0),
            params(1, 1.5),
            params(1, -0.1),
            params(1, f64::NAN),
            CampaignParams::new(" ", Strategy::default()),
        ] {
            let trigger = CountingTrigger::default();
            let result = CampaignRunner::new(bad, &trigger, StdRng::seed_from_u64(0), ThreadPause);
            assert!(matches!(result, Err(ChaosError::Config(_))));
        }
    }
}
