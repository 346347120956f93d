//! Blank filtering and example numbering
//!
//! This is the only place blank entries are removed. An example survives when
//! either side has text.

use crate::relay::types::ExamplePair;

pub fn normalize_translations(translations: Vec<String>) -> Vec<String> {
    translations
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Drop pairs with both sides blank and renumber the rest from zero.
pub fn normalize_examples(examples: Vec<ExamplePair>) -> Vec<ExamplePair> {
    examples
        .into_iter()
        .map(|e| (e.source.trim().to_string(), e.target.trim().to_string()))
        .filter(|(source, target)| !source.is_empty() || !target.is_empty())
        .enumerate()
        .map(|(id, (source, target))| ExamplePair { id, source, target })
        .collect()
}

pub fn normalize(
    translations: Vec<String>,
    examples: Vec<ExamplePair>,
) -> (Vec<String>, Vec<ExamplePair>) {
    (
        normalize_translations(translations),
        normalize_examples(examples),
    )
}
