// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Event filter engine
//!
//! A [`Predicate`] is a boolean test over one Kubernetes Event paired with a
//! human readable description. Predicates compose with [`Predicate::all`] and
//! [`Predicate::any`]; the compiler in [`compile`](compile()) turns an
//! EventLogger spec into one predicate tree.
//!
//! Two predicates are equal when their descriptions are equal. The closures
//! themselves cannot be compared, so the description is the identity of a
//! predicate and must always describe exactly what the closure tests.

mod compile;
mod error;

pub use compile::{FilterSpec, compile};
pub use error::FilterError;

use k8s_openapi::api::core::v1::Event;
use std::fmt;
use std::sync::Arc;

type MatchFn = dyn Fn(&Event) -> bool + Send + Sync;

/// Compiled boolean test over an Event
#[derive(Clone)]
pub struct Predicate {
    matcher: Arc<MatchFn>,
    description: String,
}

impl Predicate {
    /// Create a predicate from a closure and the description of what it tests
    pub fn new<F>(description: impl Into<String>, matcher: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self {
            matcher: Arc::new(matcher),
            description: description.into(),
        }
    }

    /// Predicate matching every event
    pub fn always() -> Self {
        Self::new("true", |_| true)
    }

    /// Predicate matching no event
    pub fn never() -> Self {
        Self::new("false", |_| false)
    }

    /// Matches if every child matches, short-circuiting on the first miss.
    /// Without children this matches everything.
    pub fn all(children: Vec<Predicate>) -> Self {
        let description = join_description(&children, "AND");
        Self::new(description, move |event| {
            children.iter().all(|child| child.matches(event))
        })
    }

    /// Matches if at least one child matches, short-circuiting on the first hit.
    /// Without children this matches nothing.
    pub fn any(children: Vec<Predicate>) -> Self {
        let description = join_description(&children, "OR");
        Self::new(description, move |event| {
            children.iter().any(|child| child.matches(event))
        })
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.matcher)(event)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// `( a OP b OP c )`
fn join_description(children: &[Predicate], operator: &str) -> String {
    let parts: Vec<&str> = children.iter().map(Predicate::description).collect();
    format!("( {} )", parts.join(&format!(" {} ", operator)))
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.description == other.description
    }
}

impl Eq for Predicate {}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.description).finish()
    }
}
