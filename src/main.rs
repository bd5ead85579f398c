// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! gpxbridge CLI
//!
//! Exports recent Strava activities as GPX files. Credentials come from
//! STRAVA_CLIENT_ID, STRAVA_CLIENT_SECRET and STRAVA_REFRESH_TOKEN (a `.env`
//! file is honored).

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use gpxbridge::{
    config::{Config, ExportOptions, RateLimitConfig, RetryConfig},
    models::ActivityFilter,
    services::{ExportSummary, Exporter, StravaClient},
    time_utils::parse_date_arg,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "gpxbridge",
    version,
    about = "Export recent Strava activities as GPX files"
)]
struct Cli {
    /// Number of most recent activities to export (1-10000)
    #[arg(long, short = 'n', default_value_t = 10)]
    count: usize,

    /// Output directory, relative to the export root
    #[arg(long, short = 'o', default_value = "gpx_exports")]
    output_dir: PathBuf,

    /// Directory the output directory must stay inside
    #[arg(long, default_value = ".")]
    export_root: PathBuf,

    /// Put each file under a subdirectory named after its activity type
    #[arg(long)]
    organize_by_type: bool,

    /// Extra delay after every API call, in seconds (0-60)
    #[arg(long, default_value_t = 1.0)]
    delay: f64,

    /// Skip activities already recorded in the output directory
    #[arg(long)]
    resume: bool,

    /// Only activities starting after this date (RFC3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    after: Option<DateTime<Utc>>,

    /// Only activities starting before this date (RFC3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    before: Option<DateTime<Utc>>,

    /// Only activities of this type, e.g. Ride or Run
    #[arg(long = "type")]
    activity_type: Option<String>,

    /// Emit JSON log lines instead of human-readable output
    #[arg(long)]
    log_json: bool,
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_date_arg(raw).ok_or_else(|| format!("invalid date '{raw}', expected YYYY-MM-DD or RFC3339"))
}

impl Cli {
    fn export_options(&self) -> ExportOptions {
        ExportOptions {
            count: self.count,
            output_dir: self.output_dir.clone(),
            export_root: self.export_root.clone(),
            organize_by_type: self.organize_by_type,
            delay_seconds: self.delay,
            resume: self.resume,
            filter: ActivityFilter {
                activity_type: self.activity_type.clone(),
                after: self.after,
                before: self.before,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let options = cli.export_options();
    options.check()?;

    let config = Config::from_env().context("Failed to load Strava credentials")?;
    let client = StravaClient::new(
        &config,
        RateLimitConfig::default().with_extra_delay(options.extra_delay()),
        RetryConfig::default(),
    )?;
    let exporter = Exporter::new(client);

    tracing::info!(
        count = options.count,
        output_dir = %options.output_dir.display(),
        resume = options.resume,
        "Starting export"
    );

    let summary = tokio::select! {
        result = exporter.run(&options) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; progress up to the last completed activity is saved, rerun with --resume");
            return Ok(ExitCode::from(130));
        }
    };

    print_summary(&summary);
    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(summary: &ExportSummary) {
    println!("Export directory: {}", summary.output_dir.display());
    println!(
        "Exported {} of {} activities ({} already done, {} without GPS data)",
        summary.exported, summary.listed, summary.skipped, summary.empty_tracks
    );
    if !summary.failures.is_empty() {
        println!("{} activities failed:", summary.failures.len());
        for failure in &summary.failures {
            println!(
                "  {} ({}): {}",
                failure.activity_id, failure.stage, failure.error
            );
        }
    }
}

/// Initialize structured logging; `RUST_LOG` overrides the default level.
fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gpxbridge=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
