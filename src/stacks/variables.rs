//! # Variable Merging
//!
//! Builds the per-stack rendering variables from exactly four layers, lowest
//! to highest precedence:
//!
//! 1. category defaults
//! 2. stack `vars`
//! 3. inventory variables
//! 4. secrets
//!
//! The merge is *shallow at the top level*: for each top-level key the value
//! from the highest-precedence layer that defines it wins, replacing the
//! whole sub-mapping atomically. Templates that want fine-grained overrides
//! must use distinct top-level keys.

use serde_yaml::Mapping;

/// Merges the four variable layers into one mapping.
///
/// Insertion happens layer by layer, so a key keeps the position of its
/// first appearance and two runs over identical inputs serialize
/// byte-identically.
pub fn merge_variables(
    category_defaults: &Mapping,
    stack_vars: &Mapping,
    inventory_vars: &Mapping,
    secrets: &Mapping,
) -> Mapping {
    let mut merged = Mapping::new();

    for layer in [category_defaults, stack_vars, inventory_vars, secrets] {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }

    merged
}
