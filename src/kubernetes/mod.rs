// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod client;

pub use client::{connect, latest_resource_version, scoped_api, with_retry};
