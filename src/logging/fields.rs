// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Field extraction for Event log records
//!
//! Configured log fields are resolved against the JSON form of the Event.
//! Path segments may use either the JSON keys or the Go struct field names of
//! `corev1.Event`: keys match case insensitively, and the few Go names that
//! differ from their JSON key are translated. `["involvedObject", "apiVersion"]`
//! and `["InvolvedObject", "APIVersion"]` address the same value.

use k8s_openapi::api::core::v1::Event;
use serde_json::{Map, Value};

use super::sink::Fields;
use crate::api::v1::LogField;

/// Resolve `log_fields` against `event`
///
/// A field with a path that does not resolve is left out. A field without a
/// path emits its static value, if it has one.
pub fn extract(event: &Event, log_fields: &[LogField]) -> Fields {
    let Ok(root) = serde_json::to_value(event) else {
        return Vec::new();
    };

    log_fields
        .iter()
        .filter_map(|field| {
            if !field.path.is_empty() {
                lookup(&root, &field.path).map(|value| (field.name.clone(), value.clone()))
            } else {
                field
                    .value
                    .as_ref()
                    .map(|value| (field.name.clone(), Value::String(value.clone())))
            }
        })
        .collect()
}

/// Summary used when no log fields are configured
pub fn default_summary(event: &Event) -> Fields {
    let meta = &event.metadata;
    let timestamp = event
        .last_timestamp
        .as_ref()
        .or(event.first_timestamp.as_ref())
        .map(to_value)
        .or_else(|| event.event_time.as_ref().map(to_value))
        .unwrap_or(Value::Null);

    vec![
        pair("namespace", string(meta.namespace.as_deref())),
        pair("name", string(meta.name.as_deref())),
        pair("reason", string(event.reason.as_deref())),
        pair("timestamp", timestamp),
        pair("type", string(event.type_.as_deref())),
        pair("involvedObject", to_value(&event.involved_object)),
        pair("source", to_value(&event.source)),
    ]
}

/// Go field names whose JSON key is not the same name in another case
const GO_FIELD_ALIASES: &[(&str, &str)] = &[
    ("ObjectMeta", "metadata"),
    ("ReportingController", "reportingComponent"),
];

/// Embedded struct whose fields are inlined in the JSON form
const INLINED: &str = "TypeMeta";

fn lookup<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |value, segment| {
        let object = value.as_object()?;
        if segment == INLINED {
            return Some(value);
        }
        child(object, segment)
    })
}

fn child<'a>(object: &'a Map<String, Value>, segment: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(segment) {
        return Some(value);
    }
    let key = GO_FIELD_ALIASES
        .iter()
        .find(|(go_name, _)| *go_name == segment)
        .map_or(segment, |&(_, json_key)| json_key);
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

fn pair(name: &str, value: Value) -> (String, Value) {
    (name.to_string(), value)
}

fn string(value: Option<&str>) -> Value {
    Value::String(value.unwrap_or_default().to_string())
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
