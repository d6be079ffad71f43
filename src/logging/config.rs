// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Shared logging configuration
//!
//! One [`Config`] exists per operator process. The reconciliation path replaces
//! the active filter and log fields as a whole; the event path takes a snapshot
//! and never sees a half updated configuration.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::api::v1::{EventLoggerSpec, LogField};
use crate::filter::{FilterError, Predicate, compile};

/// Filter and log fields of the loaded EventLogger
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveConfig {
    pub filter: Predicate,
    pub log_fields: Vec<LogField>,
}

/// Event logging configuration shared by the reconciler and the event path
pub struct Config {
    /// Name of the EventLogger to follow, empty until bound
    name: RwLock<String>,
    pod_namespace: String,
    watch_namespace: String,
    /// `None` while no EventLogger is loaded: nothing is logged
    active: RwLock<Option<Arc<ActiveConfig>>>,
    /// Highest Event resource version processed so far
    last_version: Mutex<String>,
}

impl Config {
    pub fn new(
        name: impl Into<String>,
        pod_namespace: impl Into<String>,
        watch_namespace: impl Into<String>,
    ) -> Self {
        Self {
            name: RwLock::new(name.into()),
            pod_namespace: pod_namespace.into(),
            watch_namespace: watch_namespace.into(),
            active: RwLock::new(None),
            last_version: Mutex::new(String::new()),
        }
    }

    /// Namespace the followed EventLogger lives in
    ///
    /// The pod namespace wins; the watch namespace is the fallback.
    pub fn target_namespace(&self) -> &str {
        if self.pod_namespace.is_empty() {
            &self.watch_namespace
        } else {
            &self.pod_namespace
        }
    }

    pub async fn name(&self) -> String {
        self.name.read().await.clone()
    }

    /// Bind to `name` unless already bound to an EventLogger
    pub async fn bind_name(&self, name: &str) {
        let mut bound = self.name.write().await;
        if bound.is_empty() {
            *bound = name.to_string();
        }
    }

    /// Check if an EventLogger is the one this configuration follows
    ///
    /// An unbound configuration matches any name in the target namespace.
    pub async fn matches(&self, meta: &ObjectMeta) -> bool {
        if meta.namespace.as_deref().unwrap_or_default() != self.target_namespace() {
            return false;
        }
        let name = self.name.read().await;
        name.is_empty() || meta.name.as_deref().unwrap_or_default() == name.as_str()
    }

    /// Current filter and log fields, `None` if no EventLogger is loaded
    pub async fn snapshot(&self) -> Option<Arc<ActiveConfig>> {
        self.active.read().await.clone()
    }

    /// Compile `spec` and make it the active configuration
    ///
    /// Returns whether anything changed. On a compile error the previous
    /// configuration stays active.
    pub async fn apply(&self, spec: &EventLoggerSpec) -> Result<bool, FilterError> {
        let filter = compile(&spec.filter_spec())?;

        let mut active = self.active.write().await;
        let (fields_changed, filter_changed) = match active.as_deref() {
            Some(current) => (current.log_fields != spec.log_fields, current.filter != filter),
            None => (true, true),
        };

        if !fields_changed && !filter_changed {
            return Ok(false);
        }
        if fields_changed {
            info!(log_fields = ?spec.log_fields, "apply new log fields");
        }
        if filter_changed {
            info!(filter = %filter, "apply new filter");
        }

        *active = Some(Arc::new(ActiveConfig {
            filter,
            log_fields: spec.log_fields.clone(),
        }));
        Ok(true)
    }

    /// Drop the active configuration, nothing is logged afterwards
    pub async fn clear(&self) {
        *self.active.write().await = None;
    }

    /// Seed the watermark so Events that already exist are not replayed
    pub async fn seed_watermark(&self, version: impl Into<String>) {
        *self.last_version.lock().await = version.into();
    }

    pub async fn last_version(&self) -> String {
        self.last_version.lock().await.clone()
    }

    /// Advance the watermark to `version` if it is newer
    ///
    /// Resource versions are compared as strings. Returns false for versions
    /// that are not strictly greater than the watermark.
    pub async fn advance_watermark(&self, version: &str) -> bool {
        let mut last = self.last_version.lock().await;
        if version <= last.as_str() {
            return false;
        }
        *last = version.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::v1::Kind;

    const NAMESPACE: &str = "eventlogger-operator";
    const NAME: &str = "eventlogger-operator-name";

    fn meta(namespace: &str, name: &str) -> ObjectMeta {
        ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn pod_spec() -> EventLoggerSpec {
        EventLoggerSpec {
            kinds: vec![Kind {
                name: "Pod".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new() {
        let config = Config::new("name", "pod-ns", "watch-ns");
        assert_eq!(config.name().await, "name");
        assert_eq!(config.pod_namespace, "pod-ns");
        assert_eq!(config.watch_namespace, "watch-ns");
        assert!(config.snapshot().await.is_none());
        assert_eq!(config.last_version().await, "");
    }

    #[tokio::test]
    async fn test_matches_watch_namespace() {
        let config = Config::new(NAME, "", NAMESPACE);
        assert!(config.matches(&meta(NAMESPACE, NAME)).await);
        assert!(!config.matches(&meta(NAMESPACE, "foo")).await);
        assert!(!config.matches(&meta("other", NAME)).await);
    }

    #[tokio::test]
    async fn test_matches_pod_namespace() {
        let config = Config::new(NAME, NAMESPACE, "");
        assert!(config.matches(&meta(NAMESPACE, NAME)).await);
        assert!(!config.matches(&meta(NAMESPACE, "foo")).await);
    }

    #[tokio::test]
    async fn test_pod_namespace_wins() {
        let config = Config::new(NAME, NAMESPACE, "watched");
        assert_eq!(config.target_namespace(), NAMESPACE);
        assert!(config.matches(&meta(NAMESPACE, NAME)).await);
        assert!(!config.matches(&meta("watched", NAME)).await);
    }

    #[tokio::test]
    async fn test_unbound_name_matches_any() {
        let config = Config::new("", NAMESPACE, "");
        assert!(config.matches(&meta(NAMESPACE, "foo")).await);
        assert!(config.matches(&meta(NAMESPACE, "bar")).await);

        config.bind_name("foo").await;
        assert!(config.matches(&meta(NAMESPACE, "foo")).await);
        assert!(!config.matches(&meta(NAMESPACE, "bar")).await);

        config.bind_name("bar").await;
        assert_eq!(config.name().await, "foo");
    }

    #[tokio::test]
    async fn test_apply_sets_filter() {
        let config = Config::new(NAME, NAMESPACE, "");
        assert!(config.apply(&pod_spec()).await.unwrap());

        let active = config.snapshot().await.unwrap();
        assert_eq!(active.filter.description(), "( ( ( Kind == 'Pod' ) ) )");
        assert!(active.log_fields.is_empty());
    }

    #[tokio::test]
    async fn test_apply_unchanged_spec_is_noop() {
        let config = Config::new(NAME, NAMESPACE, "");
        assert!(config.apply(&pod_spec()).await.unwrap());
        let before = config.snapshot().await.unwrap();

        assert!(!config.apply(&pod_spec()).await.unwrap());
        let after = config.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_apply_log_field_change() {
        let config = Config::new(NAME, NAMESPACE, "");
        config.apply(&pod_spec()).await.unwrap();

        let mut spec = pod_spec();
        spec.log_fields = vec![LogField {
            name: "reason".to_string(),
            path: vec!["reason".to_string()],
            value: None,
        }];
        assert!(config.apply(&spec).await.unwrap());
        assert_eq!(config.snapshot().await.unwrap().log_fields, spec.log_fields);
    }

    #[tokio::test]
    async fn test_apply_error_keeps_previous_filter() {
        let config = Config::new(NAME, NAMESPACE, "");
        config.apply(&pod_spec()).await.unwrap();

        let mut broken = pod_spec();
        broken.kinds[0].matching_patterns = vec!["(".to_string()];
        assert!(config.apply(&broken).await.is_err());
        assert_eq!(
            config.snapshot().await.unwrap().filter.description(),
            "( ( ( Kind == 'Pod' ) ) )"
        );
    }

    #[tokio::test]
    async fn test_clear_and_recreate() {
        let config = Config::new(NAME, NAMESPACE, "");
        config.apply(&pod_spec()).await.unwrap();
        config.clear().await;
        assert!(config.snapshot().await.is_none());

        assert!(config.apply(&pod_spec()).await.unwrap());
        assert!(config.snapshot().await.is_some());
    }

    #[tokio::test]
    async fn test_watermark_is_strict() {
        let config = Config::new(NAME, NAMESPACE, "");
        config.seed_watermark("2").await;

        assert!(!config.advance_watermark("1").await);
        assert!(!config.advance_watermark("2").await);
        assert!(config.advance_watermark("3").await);
        assert_eq!(config.last_version().await, "3");
        assert!(!config.advance_watermark("3").await);
    }

    #[tokio::test]
    async fn test_watermark_compares_strings() {
        let config = Config::new(NAME, NAMESPACE, "");
        config.seed_watermark("9").await;
        // "10" sorts before "9"
        assert!(!config.advance_watermark("10").await);
        assert_eq!(config.last_version().await, "9");
    }
}
