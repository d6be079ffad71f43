// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Event logging: shared configuration, dedup gate, log record building and
//! the watch loops driving them

mod config;
mod fields;
mod predicate;
mod reconciler;
mod sink;

pub use reconciler::run;
