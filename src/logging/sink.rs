// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use serde_json::{Map, Value};
use tracing::info;

/// Ordered key/value pairs attached to one log record
pub type Fields = Vec<(String, Value)>;

/// Consumer of the log records produced for matched Events
///
/// Emitting is fire and forget: implementations must not block for long and
/// have no way to report failure back to the caller.
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str, fields: &[(String, Value)]);
}

/// Emits matched Events as `tracing` records with target `event`
///
/// `tracing` field names are static, so the configured pairs travel in one
/// `fields` field holding compact JSON. With `--log-format json` that field is
/// a JSON encoded string (`"fields":"{\"reason\":\"Created\"}"`) which log
/// pipelines decode in a second step; the text format prints it verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, message: &str, fields: &[(String, Value)]) {
        info!(target: "event", fields = %render(fields), "{}", message);
    }
}

/// Compact JSON object of the pairs, in configured order
fn render(fields: &[(String, Value)]) -> String {
    Value::Object(to_object(fields)).to_string()
}

/// Later pairs overwrite earlier ones with the same name, order of first
/// appearance is kept
fn to_object(fields: &[(String, Value)]) -> Map<String, Value> {
    fields.iter().cloned().collect()
}
