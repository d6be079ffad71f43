// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Single dispatch point for watch notifications
//!
//! EventLogger notifications are checked for relevance to this operator.
//! Event notifications pass the resource version gate and, if the active
//! filter matches, are written to the log sink.

use k8s_openapi::api::core::v1::Event;
use std::sync::Arc;
use tracing::trace;

use super::config::Config;
use super::fields::{default_summary, extract};
use super::sink::LogSink;
use crate::api::v1::EventLogger;

/// Object a watch notification is about
#[derive(Debug, Clone, Copy)]
pub enum Watched<'a> {
    EventLogger(&'a EventLogger),
    Event(&'a Event),
}

/// Kind of change a watch notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Apply,
    Delete,
}

pub struct LoggingPredicate<S> {
    config: Arc<Config>,
    sink: S,
}

impl<S: LogSink> LoggingPredicate<S> {
    pub fn new(config: Arc<Config>, sink: S) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Returns true if the notification needs reconciling
    ///
    /// Only EventLogger changes are ever reconciled. Events are logged as a
    /// side effect and always yield false.
    pub async fn accept(&self, watched: Watched<'_>, change: Change) -> bool {
        match (watched, change) {
            (Watched::EventLogger(el), _) => self.config.matches(&el.metadata).await,
            (Watched::Event(event), Change::Apply) => self.log_event(event).await,
            (Watched::Event(_), Change::Delete) => false,
        }
    }

    /// Log `event` if it is newer than the watermark and passes the filter
    pub async fn log_event(&self, event: &Event) -> bool {
        let Some(active) = self.config.snapshot().await else {
            return false;
        };

        let version = event.metadata.resource_version.as_deref().unwrap_or_default();
        if !self.config.advance_watermark(version).await {
            trace!(resource_version = %version, "skipping already seen event");
            return false;
        }

        if active.filter.matches(event) {
            let fields = if active.log_fields.is_empty() {
                default_summary(event)
            } else {
                extract(event, &active.log_fields)
            };
            self.sink
                .info(event.message.as_deref().unwrap_or_default(), &fields);
        }
        false
    }
}
