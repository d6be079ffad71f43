// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Filter compiler
//!
//! Translates the declarative part of an EventLogger spec into a predicate tree:
//!
//! ```text
//! ( EventType in [...] OR ( <kind rule> OR <kind rule> ... ) )
//! ```
//!
//! where each kind rule is an AND of the constraints it declares. The output
//! is deterministic: the same spec always yields the same description, and
//! descriptions list kinds in spec order.

use k8s_openapi::api::core::v1::Event;
use regex::Regex;

use super::{FilterError, Predicate};
use crate::api::v1::Kind;

/// The filter relevant view of an EventLogger spec
#[derive(Debug, Clone, Copy)]
pub struct FilterSpec<'a> {
    pub event_types: &'a [String],
    pub kinds: &'a [Kind],
}

/// Build the predicate for a spec
///
/// An empty spec (no event types, no kinds) logs everything.
pub fn compile(spec: &FilterSpec<'_>) -> Result<Predicate, FilterError> {
    let mut candidates = Vec::new();

    if !spec.event_types.is_empty() {
        candidates.push(event_type_in(spec.event_types));
    }

    if !spec.kinds.is_empty() {
        let per_kind = spec
            .kinds
            .iter()
            .map(|kind| compile_kind(kind, spec.event_types))
            .collect::<Result<Vec<_>, _>>()?;
        candidates.push(Predicate::any(per_kind));
    }

    if candidates.is_empty() {
        return Ok(Predicate::always());
    }

    Ok(Predicate::any(candidates))
}

fn compile_kind(kind: &Kind, inherited_event_types: &[String]) -> Result<Predicate, FilterError> {
    let mut rules = Vec::new();

    let name = kind.name.clone();
    rules.push(Predicate::new(format!("Kind == '{}'", name), move |e| {
        e.involved_object.kind.as_deref().unwrap_or_default() == name
    }));

    if let Some(group) = &kind.api_group {
        let group = group.clone();
        rules.push(Predicate::new(format!("APIGroup == '{}'", group), move |e| {
            api_group(e.involved_object.api_version.as_deref().unwrap_or_default()) == group
        }));
    }

    // Unset inherits the spec wide types, an explicit empty list lifts the restriction
    let event_types = kind.event_types.as_deref().unwrap_or(inherited_event_types);
    if !event_types.is_empty() {
        rules.push(event_type_in(event_types));
    }

    if !kind.skip_reasons.is_empty() {
        let skip = kind.skip_reasons.clone();
        rules.push(Predicate::new(
            format!("Reason NOT in [{}]", skip.join(", ")),
            move |e| !contains(&skip, reason(e)),
        ));
    }

    if !kind.reasons.is_empty() {
        let reasons = kind.reasons.clone();
        rules.push(Predicate::new(
            format!("Reason in [{}]", reasons.join(", ")),
            move |e| contains(&reasons, reason(e)),
        ));
    }

    if !kind.matching_patterns.is_empty() {
        rules.push(compile_patterns(
            kind,
            &kind.matching_patterns,
            kind.skip_on_match.unwrap_or(false),
        )?);
    }

    Ok(Predicate::all(rules))
}

/// `( <skip_on_match> XOR ( Message matches /a/ OR Message matches /b/ ) )`
fn compile_patterns(
    kind: &Kind,
    patterns: &[String],
    skip_on_match: bool,
) -> Result<Predicate, FilterError> {
    let mut matchers = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            kind: kind.name.clone(),
            pattern: pattern.clone(),
            source,
        })?;
        matchers.push(Predicate::new(
            format!("Message matches /{}/", pattern),
            move |e| regex.is_match(e.message.as_deref().unwrap_or_default()),
        ));
    }

    let any_pattern = Predicate::any(matchers);
    Ok(Predicate::new(
        format!("( {} XOR {} )", skip_on_match, any_pattern),
        move |e| skip_on_match != any_pattern.matches(e),
    ))
}

fn event_type_in(types: &[String]) -> Predicate {
    let types = types.to_vec();
    Predicate::new(format!("EventType in [{}]", types.join(", ")), move |e| {
        contains(&types, e.type_.as_deref().unwrap_or_default())
    })
}

fn reason(event: &Event) -> &str {
    event.reason.as_deref().unwrap_or_default()
}

fn contains(list: &[String], value: &str) -> bool {
    list.iter().any(|v| v == value)
}

/// Group part of an apiVersion: `apps/v1` → `apps`, `v1` → `""`
fn api_group(api_version: &str) -> &str {
    match api_version.split_once('/') {
        Some((group, version)) if !version.contains('/') => group,
        _ => "",
    }
}
