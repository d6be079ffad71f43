// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Validation of EventLogger specs
//!
//! Collects every problem of a spec instead of stopping at the first one, so
//! the status (or an admission response) can list them all.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

use super::EventLoggerSpec;

const QUALIFIED_NAME_MAX_LENGTH: usize = 63;
const LABEL_VALUE_MAX_LENGTH: usize = 63;
const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;

static QUALIFIED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("valid qualified name regex")
});

static DNS1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid dns subdomain regex")
});

/// All problems found in a spec, one per line when displayed
#[derive(Debug, Error)]
#[error("{}", .errors.join("\n"))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

impl EventLoggerSpec {
    /// Validate label/annotation/node-selector syntax
    ///
    /// Matching patterns are checked when the filter is compiled.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        check_keys("spec.labels", &self.labels, &mut errors);
        check_values("spec.labels", &self.labels, &mut errors);
        check_keys("spec.annotations", &self.annotations, &mut errors);
        check_keys("spec.nodeSelector", &self.node_selector, &mut errors);
        check_values("spec.nodeSelector", &self.node_selector, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors })
        }
    }
}

fn check_keys(field: &str, map: &BTreeMap<String, String>, errors: &mut Vec<String>) {
    for key in map.keys() {
        if !is_qualified_name(key) {
            errors.push(format!(
                "{}: key '{}' must be a qualified name (optional DNS subdomain prefix and '/', \
                 then at most {} alphanumeric characters, '-', '_' or '.')",
                field, key, QUALIFIED_NAME_MAX_LENGTH
            ));
        }
    }
}

fn check_values(field: &str, map: &BTreeMap<String, String>, errors: &mut Vec<String>) {
    for (key, value) in map {
        if !is_valid_label_value(value) {
            errors.push(format!(
                "{}: value '{}' of key '{}' must be empty or at most {} alphanumeric characters, \
                 '-', '_' or '.', starting and ending with an alphanumeric character",
                field, value, key, LABEL_VALUE_MAX_LENGTH
            ));
        }
    }
}

/// Kubernetes qualified name, e.g. `app`, `example.com/app`
fn is_qualified_name(value: &str) -> bool {
    let name = match value.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty()
                || prefix.len() > DNS1123_SUBDOMAIN_MAX_LENGTH
                || !DNS1123_SUBDOMAIN.is_match(prefix)
            {
                return false;
            }
            name
        }
        None => value,
    };
    !name.is_empty() && name.len() <= QUALIFIED_NAME_MAX_LENGTH && QUALIFIED_NAME.is_match(name)
}

fn is_valid_label_value(value: &str) -> bool {
    value.is_empty()
        || (value.len() <= LABEL_VALUE_MAX_LENGTH && QUALIFIED_NAME.is_match(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(key: &str, value: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(key.to_string(), value.to_string())])
    }

    #[test]
    fn test_validate_success() {
        let spec = EventLoggerSpec {
            labels: map("valid", "valid"),
            annotations: map("example.com/valid", "any value: is fine"),
            ..Default::default()
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_label_key() {
        let spec = EventLoggerSpec {
            labels: map("in valid", "valid"),
            ..Default::default()
        };
        let err = spec.validate().unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(err.errors[0].starts_with("spec.labels: key 'in valid'"));
    }

    #[test]
    fn test_validate_invalid_label_value() {
        let spec = EventLoggerSpec {
            labels: map("valid", "in valid"),
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_annotation_key() {
        let spec = EventLoggerSpec {
            annotations: map("in valid", "valid"),
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_node_selector() {
        let spec = EventLoggerSpec {
            node_selector: map("a@a", "a:/a"),
            ..Default::default()
        };
        let err = spec.validate().unwrap_err();
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let spec = EventLoggerSpec {
            labels: map("in valid", "in valid"),
            annotations: map("in valid", "valid"),
            ..Default::default()
        };
        let err = spec.validate().unwrap_err();
        assert_eq!(err.errors.len(), 3);
        assert_eq!(err.to_string().lines().count(), 3);
    }

    #[test]
    fn test_qualified_names() {
        assert!(is_qualified_name("app"));
        assert!(is_qualified_name("app.kubernetes.io/name"));
        assert!(is_qualified_name("a_b-c.d"));
        assert!(!is_qualified_name(""));
        assert!(!is_qualified_name("/name"));
        assert!(!is_qualified_name("Example.com/name"));
        assert!(!is_qualified_name("-app"));
        assert!(!is_qualified_name("a/b/c"));
        assert!(!is_qualified_name(&"a".repeat(64)));
    }

    #[test]
    fn test_label_values() {
        assert!(is_valid_label_value(""));
        assert!(is_valid_label_value("v1.2_3-x"));
        assert!(!is_valid_label_value("in valid"));
        assert!(!is_valid_label_value("trailing-"));
        assert!(!is_valid_label_value(&"a".repeat(64)));
    }
}
