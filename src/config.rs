// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Runtime settings of the operator
//!
//! Resolved once from the command line and environment (`CONFIG_NAME`,
//! `WATCH_NAMESPACE`, `POD_NAMESPACE`) at startup.

use crate::cli::Args;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// EventLogger to follow, empty binds to the first one reconciled
    pub config_name: String,
    pub pod_namespace: String,
    /// Empty watches events in all namespaces
    pub watch_namespace: String,
    /// Logger pods never write the EventLogger status
    pub logger_mode: bool,
    pub context: Option<String>,
}

impl Settings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            config_name: args.config_name.trim().to_string(),
            pod_namespace: args.pod_namespace.trim().to_string(),
            watch_namespace: args.watch_namespace.trim().to_string(),
            logger_mode: args.enable_logger_mode,
            context: args.context.clone(),
        }
    }

    /// Namespace events are watched in, `None` for cluster wide
    pub fn event_scope(&self) -> Option<&str> {
        Some(self.watch_namespace.as_str()).filter(|ns| !ns.is_empty())
    }
}
