// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! `EventLogger` custom resource, version v1
//!
//! The resource tells the operator which Kubernetes Events to tail and which
//! fields to put into each log record. Only `eventTypes` and `kinds` reach the
//! filter engine (see [`EventLoggerSpec::filter_spec`]); the remaining fields
//! describe the logger pod and are carried through untouched.

mod validation;

pub use validation::ValidationError;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filter::FilterSpec;

/// Version of the running operator, recorded in the status of processed resources
pub const OPERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Desired state of an EventLogger
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "eventlogger.bakito.ch",
    version = "v1",
    kind = "EventLogger",
    namespaced,
    status = "EventLoggerStatus",
    shortname = "el"
)]
#[serde(rename_all = "camelCase")]
pub struct EventLoggerSpec {
    /// Kinds to log the events for
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<Kind>,

    /// Event types to log. If empty all events are logged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_types: Vec<String>,

    /// Additional labels for the logger pod
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Additional annotations for the logger pod
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// If true, prometheus scrape annotations are added to the pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_metrics: Option<bool>,

    /// Namespace to watch on, may be an empty string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Service account used by the logger pod
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account: String,

    /// Node selector for the logger pod
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Fields of the event to be logged
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log_fields: Vec<LogField>,
}

/// A kind to log events for
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Kind {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,

    /// Event types to log. Absent inherits the types of the spec, an empty
    /// list logs every type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,

    /// Event reasons to log. If empty events with any reason are logged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,

    /// Event reasons to skip.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_reasons: Vec<String>,

    /// Regex patterns searched for in the event message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matching_patterns: Vec<String>,

    /// Skip the entry if a pattern matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_on_match: Option<bool>,
}

/// A field of the log record
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogField {
    /// Name of the log field
    pub name: String,

    /// Path within the Event, e.g. `["involvedObject", "name"]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,

    /// Static value of the log field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Observed state of an EventLogger
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventLoggerStatus {
    /// Version of the operator that processed the resource
    pub operator_version: String,

    /// RFC 3339 timestamp of the last time the resource was processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EventLoggerSpec {
    /// The part of the spec the filter compiler works on
    pub fn filter_spec(&self) -> FilterSpec<'_> {
        FilterSpec {
            event_types: &self.event_types,
            kinds: &self.kinds,
        }
    }

    /// Hex digest of the JSON form of the spec
    pub fn hash(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

impl EventLoggerStatus {
    /// Status for a resource that was just processed, with the error if processing failed
    pub fn processed(spec: &EventLoggerSpec, error: Option<&str>) -> Self {
        Self {
            operator_version: OPERATOR_VERSION.to_string(),
            last_processed: Some(chrono::Utc::now().to_rfc3339()),
            hash: Some(spec.hash()),
            error: error.map(String::from),
        }
    }
}

impl EventLogger {
    /// Check if the spec or the operator version changed since the last status write
    pub fn has_changed(&self) -> bool {
        match &self.status {
            Some(status) => {
                status.hash.as_deref() != Some(self.spec.hash().as_str())
                    || status.operator_version != OPERATOR_VERSION
            }
            None => true,
        }
    }
}
