// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod api;
mod cli;
mod config;
mod filter;
mod kubernetes;
mod logging;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use kube::CustomResourceExt;
use std::path::Path;
use tracing::info;
use tracing_subscriber::prelude::*;

use api::v1::EventLogger;
use cli::{Args, Command, LogFormat};
use config::Settings;

/// Initialize logging to stdout and, if requested, a rotated log file
fn init_logging(format: LogFormat, verbose: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    let filter = if verbose {
        "event_logger=debug,event=info"
    } else {
        "event_logger=info,event=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let (text_layer, json_layer) = match format {
        LogFormat::Text => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_span_events(FmtSpan::NONE),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stdout)
                    .with_span_events(FmtSpan::NONE),
            ),
        ),
    };

    // File appender with size-based rotation:
    // - Max 10MB per file
    // - Keep up to 5 files (total max ~50MB)
    // - Also rotate daily
    let file_layer = match log_file {
        Some(path) => {
            let condition = RollingConditionBase::new()
                .daily()
                .max_size(10 * 1024 * 1024); // 10MB
            let file_appender = RollingFileAppenderBase::new(path, condition, 5)
                .with_context(|| format!("Could not create log file: {}", path.display()))?;

            // Use non-blocking writer for better performance
            let (non_blocking, _guard) = file_appender.get_non_blocking_appender();
            // Leak the guard to keep the background writer alive
            std::mem::forget(_guard);

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_span_events(FmtSpan::NONE),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// The EventLogger CustomResourceDefinition as YAML
fn crd_yaml() -> Result<String> {
    serde_yaml::to_string(&EventLogger::crd()).context("Failed to serialize CRD")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let args = Args::parse();

    if let Some(Command::Crd) = args.command {
        print!("{}", crd_yaml()?);
        return Ok(());
    }

    init_logging(args.log_format, args.verbose, args.log_file.as_deref())?;

    let settings = Settings::from_args(&args);
    let client = kubernetes::connect(settings.context.as_deref()).await?;

    tokio::select! {
        result = logging::run(client, &settings) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
            Ok(())
        }
    }
}
