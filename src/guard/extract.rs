//! Candidate target extraction from raw request payloads.
//!
//! Extraction is permissive: a missing field, a value of the wrong shape, or a
//! root path yields no candidate instead of an error.

use serde_json::Value;

use super::TargetExtractor;
use crate::registry::{normalize, CanonicalPath};

pub fn extract_targets(payload: &Value, extractor: &TargetExtractor) -> Vec<CanonicalPath> {
    let candidates: Vec<CanonicalPath> = match extractor {
        TargetExtractor::Single { field } => payload
            .get(field)
            .and_then(Value::as_str)
            .map(normalize)
            .into_iter()
            .collect(),
        TargetExtractor::List { field } => list_items(payload, field)
            .filter_map(Value::as_str)
            .map(normalize)
            .collect(),
        TargetExtractor::PairSources { field } => list_items(payload, field)
            .filter_map(pair_source)
            .map(normalize)
            .collect(),
    };
    candidates.into_iter().filter(|p| !p.is_root()).collect()
}

fn list_items<'a>(payload: &'a Value, field: &str) -> impl Iterator<Item = &'a Value> {
    payload
        .get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// `[source, destination]`; only the source is a candidate.
fn pair_source(item: &Value) -> Option<&str> {
    match item.as_array()?.as_slice() {
        [source, _destination] => source.as_str(),
        _ => None,
    }
}
