//! ---
//! cm_section: "05-cli"
//! cm_subsection: "binary"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Command line entrypoint for triggering and listing chaos events."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use std::fs;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chaosmonkey::metrics::encode_text;
use chaosmonkey::{
    CampaignMetrics, CampaignParams, CampaignRunner, ChaosClient, EventTrigger, ThreadPause,
    DEFAULT_STRATEGIES,
};
use chaosmonkey_logging::{self as logging, cm_info, LogContext};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser};
use prometheus::Registry;
use rand::rngs::StdRng;
use rand::SeedableRng;

mod groups;
mod output;
mod settings;
mod version;

use groups::{DescribeOutput, GroupDirectory};
use output::OutputFormat;
use settings::{Settings, SettingsArgs};
use version::VersionInfo;

#[derive(Debug, Parser)]
#[command(
    name = "chaosmonkey",
    disable_version_flag = true,
    about = "Trigger and list Chaos Monkey termination events",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Only list events triggered at or after this RFC 3339 timestamp.
    #[arg(long, value_parser = parse_since)]
    since: Option<DateTime<Utc>>,

    /// Seed for the probability gate, for reproducible campaigns.
    #[arg(long, env = "CHAOSMONKEY_SEED")]
    seed: Option<u64>,

    /// Write campaign counters in the Prometheus text format to this file.
    #[arg(long, value_name = "FILE")]
    metrics_out: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// List auto scaling groups from saved `aws autoscaling
    /// describe-auto-scaling-groups` output (`-` for stdin).
    #[arg(long, value_name = "FILE")]
    list_groups: Option<PathBuf>,

    /// List the default chaos strategies.
    #[arg(long)]
    list_strategies: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print version information and exit.
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", render_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut stdout = io::stdout().lock();

    if cli.version {
        let info = VersionInfo::current();
        let line = if cli.verbose > 0 { info.extended() } else { info.banner() };
        writeln!(stdout, "{line}")?;
        return Ok(());
    }
    if cli.list_strategies {
        for strategy in DEFAULT_STRATEGIES.iter() {
            writeln!(stdout, "{strategy}")?;
        }
        return Ok(());
    }
    if let Some(path) = &cli.list_groups {
        let groups = DescribeOutput::new(path)
            .groups()
            .context("failed to get auto scaling groups")?;
        writeln!(stdout, "{}", output::render_groups(&groups, cli.output)?)?;
        return Ok(());
    }

    let settings = Settings::load(&cli.settings)?;
    if settings.campaign.is_some() && cli.since.is_some() {
        bail!("--since only applies when listing events and cannot be combined with a group");
    }
    let client = ChaosClient::new(settings.client)?;
    cm_info!(
        context = LogContext::new().with_endpoint(client.endpoint()),
        "using Chaos Monkey endpoint"
    );

    match settings.campaign {
        Some(params) => run_campaign(&client, params, &cli, &mut stdout),
        None => {
            let events = match cli.since {
                Some(since) => client.list_events_since(since)?,
                None => client.list_events()?,
            };
            writeln!(stdout, "{}", output::render_events(&events, cli.output)?)?;
            Ok(())
        }
    }
}

/// Run a campaign, streaming each event to `out` as it is triggered. A failed
/// write stops the campaign before another trigger is sent.
fn run_campaign<T: EventTrigger>(
    trigger: T,
    params: CampaignParams,
    cli: &Cli,
    out: &mut impl Write,
) -> Result<()> {
    let registry = Registry::new();
    let metrics = CampaignMetrics::new(&registry)?;
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut runner = CampaignRunner::new(params, trigger, rng, ThreadPause)?.with_metrics(metrics);

    let mut printed = false;
    let mut write_failure: Option<anyhow::Error> = None;
    let outcome = runner.run(|_, event| {
        let written = output::render_event(event, cli.output, !printed)
            .and_then(|line| Ok(writeln!(out, "{line}")?));
        match written {
            Ok(()) => {
                printed = true;
                ControlFlow::Continue(())
            }
            Err(err) => {
                write_failure = Some(err);
                ControlFlow::Break(())
            }
        }
    });

    if let Some(path) = &cli.metrics_out {
        write_metrics(&registry, path)?;
    }
    outcome?;
    match write_failure {
        Some(err) => Err(err.context("unable to write campaign output")),
        None => Ok(()),
    }
}

fn write_metrics(registry: &Registry, path: &Path) -> Result<()> {
    let text = encode_text(registry)?;
    fs::write(path, text)
        .with_context(|| format!("unable to write metrics to {}", path.display()))
}

/// Join the error chain on one line, skipping causes already quoted by their
/// parent's message.
fn render_error(err: &anyhow::Error) -> String {
    let mut message = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
    }
    message
}
