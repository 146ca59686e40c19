//! # Deployment Ordering
//!
//! The deployment order is a plain sort by `(category order, name)`. It is
//! deliberately not a topological sort: the category hierarchy validation
//! guarantees edges never point at a higher-ordered category, so this sort
//! already respects dependencies while staying stable and predictable.

use std::collections::BTreeMap;

use crate::categories::CategoryRegistry;
use crate::error::Result;
use crate::paths::RepoLayout;
use crate::stacks::Stack;

/// Sorts stack names into deployment order: category order ascending,
/// ties broken by lexicographic name.
pub fn sort_by_category(
    layout: &RepoLayout,
    stack_names: &[String],
    registry: &mut CategoryRegistry,
) -> Result<Vec<String>> {
    let mut keyed: Vec<(i64, String)> = Vec::with_capacity(stack_names.len());
    for name in stack_names {
        let stack = Stack::load(layout, name)?;
        keyed.push((registry.order_of(&stack.category), name.clone()));
    }

    keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(keyed.into_iter().map(|(_, name)| name).collect())
}

/// Groups stack names by category, each group sorted by name.
pub fn group_by_category(
    layout: &RepoLayout,
    stack_names: &[String],
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in stack_names {
        let stack = Stack::load(layout, name)?;
        groups.entry(stack.category).or_default().push(name.clone());
    }

    for members in groups.values_mut() {
        members.sort();
    }

    Ok(groups)
}
