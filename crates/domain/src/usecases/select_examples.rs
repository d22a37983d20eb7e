//! Example selection - assembles the few-shot context for a generation request
//!
//! Two pools feed the selection: a static curated pool keyed by context and
//! a dynamic pool of promoted high-scoring records from the store. The
//! policy biases toward proven-good dynamic examples (one slot is always
//! reserved for one when any exists) while never starving on an empty
//! store, so first-run generation works before anything has been reviewed.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;

use crate::model::BestExample;

/// Curated examples keyed by context label, loaded from a fixed file
pub type StaticPool = HashMap<String, Vec<String>>;

/// Select up to `num_examples` example strings for `context`
///
/// Selection rules, in order:
/// 1. Candidates are the static pool entry for the context plus the
///    dynamic pool filtered to the context. An absent or unknown context
///    falls back to the union across all contexts.
/// 2. When the dynamic subset is non-empty, exactly one of its elements is
///    drawn uniformly at random and takes the first slot.
/// 3. Remaining slots are filled by uniform sampling without replacement
///    from the combined remainder.
/// 4. Fewer candidates than requested is not an error: all candidates are
///    returned, with no padding and no duplication.
///
/// Callers own the RNG so tests can drive this with a seeded generator.
pub fn select_examples(
    static_pool: &StaticPool,
    dynamic_pool: &[BestExample],
    context: Option<&str>,
    num_examples: usize,
    rng: &mut impl Rng,
) -> Vec<String> {
    let static_subset: Vec<&str> = match context {
        Some(ctx) if static_pool.contains_key(ctx) => static_pool[ctx]
            .iter()
            .map(String::as_str)
            .collect(),
        _ => {
            let mut all: Vec<&str> = static_pool
                .values()
                .flatten()
                .map(String::as_str)
                .collect();
            // Stable candidate order regardless of map iteration order
            all.sort_unstable();
            all
        }
    };

    let dynamic_subset: Vec<&str> = dynamic_pool
        .iter()
        .filter(|ex| context.is_none_or(|ctx| ex.context == ctx))
        .map(|ex| ex.text.as_str())
        .collect();

    let mut selected: Vec<String> = Vec::with_capacity(num_examples);

    if num_examples == 0 {
        return selected;
    }

    // Reserve one slot for a proven-good example whenever one exists
    if let Some(pick) = dynamic_subset.choose(rng) {
        selected.push((*pick).to_string());
    }

    let mut remainder: Vec<&str> = Vec::new();
    for candidate in dynamic_subset.iter().chain(static_subset.iter()) {
        if selected.iter().any(|s| s == candidate) || remainder.contains(candidate) {
            continue;
        }
        remainder.push(candidate);
    }

    let slots = num_examples - selected.len();
    selected.extend(
        remainder
            .choose_multiple(rng, slots)
            .map(|s| (*s).to_string()),
    );

    selected
}

/// Render selected examples as a numbered block, in selection order
pub fn render_examples(examples: &[String]) -> String {
    examples
        .iter()
        .enumerate()
        .map(|(i, example)| format!("Example {}: {}", i + 1, example))
        .collect::<Vec<_>>()
        .join("\n")
}
