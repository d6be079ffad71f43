// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "event-logger")]
#[command(author, version, about = "Log Kubernetes events selected by EventLogger resources")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Name of the EventLogger to follow. If empty the first one reconciled is used.
    #[arg(long, env = "CONFIG_NAME", default_value = "")]
    pub config_name: String,

    /// Run as logger pod: load the configuration but never write status
    #[arg(long)]
    pub enable_logger_mode: bool,

    /// Namespace to watch events in. Empty watches all namespaces.
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    pub watch_namespace: String,

    /// Namespace of the running pod, where the EventLogger is looked up
    #[arg(long, env = "POD_NAMESPACE", default_value = "")]
    pub pod_namespace: String,

    /// Kubernetes context to use instead of the in-cluster configuration
    #[arg(short, long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Also write logs to this file, rotated daily and at 10MB
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the EventLogger CustomResourceDefinition as YAML
    Crd,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["event-logger"]).unwrap();
        assert_eq!(args.command, None);
        assert!(!args.enable_logger_mode);
        assert_eq!(args.context, None);
        assert_eq!(args.log_format, LogFormat::Text);
        assert!(!args.verbose);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "event-logger",
            "--config-name",
            "my-logger",
            "--enable-logger-mode",
            "--watch-namespace",
            "apps",
            "--pod-namespace",
            "operators",
            "-c",
            "kind-dev",
            "--log-format",
            "json",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.config_name, "my-logger");
        assert!(args.enable_logger_mode);
        assert_eq!(args.watch_namespace, "apps");
        assert_eq!(args.pod_namespace, "operators");
        assert_eq!(args.context.as_deref(), Some("kind-dev"));
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.verbose);
    }

    #[test]
    fn test_crd_subcommand() {
        let args = Args::try_parse_from(["event-logger", "crd"]).unwrap();
        assert_eq!(args.command, Some(Command::Crd));
    }

    #[test]
    fn test_invalid_log_format() {
        assert!(Args::try_parse_from(["event-logger", "--log-format", "xml"]).is_err());
    }
}
