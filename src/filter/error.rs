// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use thiserror::Error;

/// Errors that can occur when building a filter
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid matching pattern /{pattern}/ for kind '{kind}': {source}")]
    InvalidPattern {
        kind: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
