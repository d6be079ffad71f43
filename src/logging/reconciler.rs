// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Watch loops and EventLogger reconciliation
//!
//! Two watches run side by side on one shared [`Config`]: the EventLogger
//! watch keeps the active filter in sync with the bound resource, the Event
//! watch feeds every Event through the [`LoggingPredicate`].

use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Event;
use kube::api::{Patch, PatchParams};
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client, ResourceExt};
use serde_json::{Value, json};
use std::pin::pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::config::Config;
use super::predicate::{Change, LoggingPredicate, Watched};
use super::sink::{LogSink, TracingSink};
use crate::api::v1::{EventLogger, EventLoggerSpec, EventLoggerStatus, ValidationError};
use crate::config::Settings;
use crate::filter::FilterError;
use crate::kubernetes::{latest_resource_version, scoped_api, with_retry};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid EventLogger spec: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("failed to update status of EventLogger '{name}': {source}")]
    Status {
        name: String,
        #[source]
        source: kube::Error,
    },
}

/// Seed the resource version watermark and run both watches until one fails
pub async fn run(client: Client, settings: &Settings) -> Result<()> {
    let config = Arc::new(Config::new(
        settings.config_name.as_str(),
        settings.pod_namespace.as_str(),
        settings.watch_namespace.as_str(),
    ));

    let events: Api<Event> = scoped_api(client.clone(), settings.event_scope().unwrap_or_default());
    let version = latest_resource_version(&events)
        .await
        .context("Failed to fetch the latest event resource version")?;
    config.seed_watermark(version.as_str()).await;

    let loggers: Api<EventLogger> = scoped_api(client, config.target_namespace());
    info!(
        config_namespace = %config.target_namespace(),
        event_namespace = %settings.event_scope().unwrap_or("<all>"),
        resource_version = %version,
        logger_mode = settings.logger_mode,
        "Starting event logger"
    );

    let predicate = LoggingPredicate::new(config, TracingSink);
    tokio::try_join!(
        watch_event_loggers(loggers, &predicate, settings.logger_mode),
        watch_events(events, &predicate),
    )?;
    Ok(())
}

async fn watch_event_loggers<S: LogSink>(
    api: Api<EventLogger>,
    predicate: &LoggingPredicate<S>,
    logger_mode: bool,
) -> Result<()> {
    let config = predicate.config();
    let mut stream = pin!(watcher(api.clone(), watcher::Config::default()).default_backoff());
    // Whether the bound EventLogger showed up in the current (re)list
    let mut listed = false;

    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Apply(el) | watcher::Event::InitApply(el)) => {
                if !predicate.accept(Watched::EventLogger(&el), Change::Apply).await {
                    continue;
                }
                listed = true;
                if let Err(e) = reconcile(&el, &api, config, logger_mode).await {
                    error!(
                        namespace = %el.namespace().unwrap_or_default(),
                        name = %el.name_any(),
                        error = %e,
                        "Failed to reconcile event logger"
                    );
                }
            }
            Ok(watcher::Event::Delete(el)) => {
                if predicate.accept(Watched::EventLogger(&el), Change::Delete).await {
                    config.clear().await;
                    info!(
                        namespace = %el.namespace().unwrap_or_default(),
                        name = %el.name_any(),
                        "cr was deleted, removing filter"
                    );
                }
            }
            Ok(watcher::Event::Init) => listed = false,
            Ok(watcher::Event::InitDone) => {
                // deleted while the watch was down
                if !listed && config.snapshot().await.is_some() {
                    config.clear().await;
                    info!("cr no longer exists, removing filter");
                }
            }
            Err(e) => warn!(error = %e, "EventLogger watch error"),
        }
    }

    Err(anyhow!("EventLogger watch stream ended"))
}

async fn watch_events<S: LogSink>(api: Api<Event>, predicate: &LoggingPredicate<S>) -> Result<()> {
    let mut stream = pin!(watcher(api, watcher::Config::default()).default_backoff());

    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Apply(e) | watcher::Event::InitApply(e)) => {
                predicate.accept(Watched::Event(&e), Change::Apply).await;
            }
            Ok(watcher::Event::Delete(e)) => {
                predicate.accept(Watched::Event(&e), Change::Delete).await;
            }
            Ok(watcher::Event::Init | watcher::Event::InitDone) => {}
            Err(e) => warn!(error = %e, "Event watch error"),
        }
    }

    Err(anyhow!("Event watch stream ended"))
}

/// Load the spec of `el` into `config` and write back its status
///
/// An invalid spec keeps the previously active filter; the problem is
/// recorded in the status and returned.
pub async fn reconcile(
    el: &EventLogger,
    api: &Api<EventLogger>,
    config: &Config,
    logger_mode: bool,
) -> Result<(), ReconcileError> {
    let name = el.name_any();
    config.bind_name(&name).await;
    debug!(
        namespace = %el.namespace().unwrap_or_default(),
        name = %name,
        "Reconciling event logger"
    );

    let applied = load(&el.spec, config).await;

    let changed = *applied.as_ref().unwrap_or(&false);
    let error = applied.as_ref().err().map(ToString::to_string);

    if needs_status_update(el, changed, error.as_deref(), logger_mode) {
        let status = EventLoggerStatus::processed(&el.spec, error.as_deref());
        let patch = Patch::Merge(status_patch(&status));
        let params = PatchParams::default();
        with_retry("patch status", || api.patch_status(&name, &params, &patch))
            .await
            .map_err(|source| ReconcileError::Status {
                name: name.clone(),
                source,
            })?;
        debug!(name = %name, "Updated event logger status");
    }

    applied.map(|_| ())
}

/// Validate `spec` and compile it into `config`, returning whether the
/// active configuration changed
async fn load(spec: &EventLoggerSpec, config: &Config) -> Result<bool, ReconcileError> {
    spec.validate()?;
    Ok(config.apply(spec).await?)
}

/// Status is only written outside logger mode, and only when something
/// differs from what the current status records
fn needs_status_update(
    el: &EventLogger,
    changed: bool,
    error: Option<&str>,
    logger_mode: bool,
) -> bool {
    if logger_mode {
        return false;
    }
    let recorded_error = el.status.as_ref().and_then(|s| s.error.as_deref());
    changed || el.has_changed() || recorded_error != error
}

/// Merge patch for the status subresource, clearing a previously recorded error
fn status_patch(status: &EventLoggerStatus) -> Value {
    let mut patch = json!({ "status": status });
    if status.error.is_none() {
        patch["status"]["error"] = Value::Null;
    }
    patch
}
