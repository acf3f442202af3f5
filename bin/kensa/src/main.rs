mod args;
mod config;

use std::{process::ExitCode, time::Duration};

use args::KensaArgs;
use clap::Parser;
use config::Config;
use kensa::{
    validate_manifest, CollectingFeedback, FeedbackEvent, HttpClient, KensaError, Manifest,
};
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use url::Url;

/// Result of a single validation run.
struct Outcome {
    feedback: CollectingFeedback,
    result: Result<Manifest, KensaError>,
}

#[derive(Serialize)]
struct Report<'a> {
    manifest_url: &'a str,
    valid: bool,
    invalid_content: usize,
    error: Option<String>,
    events: &'a [FeedbackEvent],
}

impl Outcome {
    async fn run(client: &HttpClient, manifest_url: &str) -> Self {
        let mut feedback = CollectingFeedback::echo();
        let result = validate_manifest(client, manifest_url, &mut feedback).await;
        Self { feedback, result }
    }

    fn is_valid(&self) -> bool {
        self.result.is_ok() && self.feedback.invalid_content_count() == 0
    }

    fn refresh_interval(&self) -> Option<Duration> {
        self.result
            .as_ref()
            .ok()
            .and_then(|manifest| manifest.manifest_refresh_interval)
            .and_then(|interval| interval.to_std().ok())
            .filter(|interval| !interval.is_zero())
    }

    fn report(&self, manifest_url: &str, json: bool) -> anyhow::Result<()> {
        let invalid_content = self.feedback.invalid_content_count();
        match &self.result {
            Err(error) => tracing::error!(kind = ?error.kind(), "Validation aborted: {error}"),
            Ok(_) if invalid_content == 0 => tracing::info!("Timeline coverage is gapless"),
            Ok(_) => tracing::warn!(invalid_content, "Timeline coverage has defects"),
        }

        if json {
            let report = Report {
                manifest_url,
                valid: self.is_valid(),
                invalid_content,
                error: self.result.as_ref().err().map(ToString::to_string),
                events: self.feedback.events(),
            };
            println!("{}", serde_json::to_string(&report)?);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = KensaArgs::parse();
    let (level, default_filter) = if args.verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::INFO, "info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .try_from_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(args.config.as_deref())?;
    let http = args.http_config(config.http);
    let client = HttpClient::new(&http)?;
    if !http.cookies.is_empty() {
        client.add_cookies(&http.cookies, &Url::parse(&args.url)?);
    }

    if !args.watch {
        let outcome = Outcome::run(&client, &args.url).await;
        outcome.report(&args.url, args.json)?;
        return Ok(if outcome.is_valid() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let fallback_interval = Duration::from_secs(config.watch.fallback_interval_secs);
    let mut all_valid = true;
    loop {
        let outcome = Outcome::run(&client, &args.url).await;
        outcome.report(&args.url, args.json)?;
        all_valid &= outcome.is_valid();

        let interval = outcome.refresh_interval().unwrap_or(fallback_interval);
        tracing::debug!(?interval, "Waiting for the next manifest refresh");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stop watching");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    Ok(if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
