//! # Category Hierarchy Validation
//!
//! A stack may only depend on stacks in the same or lower-ordered
//! categories. Edges into missing stacks are skipped here; the dependency
//! presence check reports those.

use crate::categories::CategoryRegistry;
use crate::error::{Error, Result};
use crate::paths::RepoLayout;
use crate::stacks::Stack;

/// Ensures every enabled edge `A -> B` satisfies
/// `order(category(A)) >= order(category(B))`.
pub fn validate_category_dependencies(
    layout: &RepoLayout,
    enabled: &[String],
    registry: &mut CategoryRegistry,
) -> Result<()> {
    for stack_name in enabled {
        let stack = Stack::load(layout, stack_name)?;
        let stack_order = registry.order_of(&stack.category);

        for dep_name in &stack.requires {
            let dep = match Stack::load(layout, dep_name) {
                Ok(dep) => dep,
                // Missing dependency: already reported by the presence check.
                Err(_) => continue,
            };

            let dep_order = registry.order_of(&dep.category);
            if dep_order > stack_order {
                return Err(Error::InvalidCategoryDependency {
                    stack: stack_name.clone(),
                    stack_category: stack.category.clone(),
                    stack_order,
                    dependency: dep_name.clone(),
                    dep_category: dep.category.clone(),
                    dep_order,
                });
            }
        }
    }

    Ok(())
}

/// Suggests a category for a stack based on its dependencies: the earliest
/// registered category whose order is at least the maximum order among the
/// dependencies. A stack without dependencies belongs in `core`.
pub fn suggest_category_for_stack(
    layout: &RepoLayout,
    stack_name: &str,
    registry: &mut CategoryRegistry,
) -> Result<String> {
    let stack = Stack::load(layout, stack_name)?;

    if stack.requires.is_empty() {
        return Ok("core".to_string());
    }

    let mut max_order = 0;
    for dep_name in &stack.requires {
        let dep = match Stack::load(layout, dep_name) {
            Ok(dep) => dep,
            Err(_) => continue,
        };
        max_order = max_order.max(registry.order_of(&dep.category));
    }

    for category in registry.all() {
        if category.order >= max_order {
            return Ok(category.name.clone());
        }
    }

    Ok("tools".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::testutil::write_stack;
    use tempfile::TempDir;

    fn layout() -> (TempDir, RepoLayout) {
        let dir = TempDir::new().unwrap();
        let layout = RepoLayout::new(dir.path());
        std::fs::create_dir_all(layout.stacks_dir()).unwrap();
        (dir, layout)
    }

    #[test]
    fn depending_on_lower_order_is_allowed() {
        let (_dir, layout) = layout();
        write_stack(&layout, "proxy", "infrastructure", &["base"]);
        write_stack(&layout, "base", "core", &[]);

        let enabled = vec!["base".to_string(), "proxy".to_string()];
        validate_category_dependencies(&layout, &enabled, &mut CategoryRegistry::new()).unwrap();
    }

    #[test]
    fn depending_within_the_same_category_is_allowed() {
        let (_dir, layout) = layout();
        write_stack(&layout, "grafana", "monitoring", &["prometheus"]);
        write_stack(&layout, "prometheus", "monitoring", &[]);

        let enabled = vec!["grafana".to_string(), "prometheus".to_string()];
        validate_category_dependencies(&layout, &enabled, &mut CategoryRegistry::new()).unwrap();
    }

    #[test]
    fn depending_on_higher_order_is_rejected_with_both_orders() {
        let (_dir, layout) = layout();
        write_stack(&layout, "proxy", "infrastructure", &["jelly"]);
        write_stack(&layout, "jelly", "media", &[]);

        let enabled = vec!["jelly".to_string(), "proxy".to_string()];
        match validate_category_dependencies(&layout, &enabled, &mut CategoryRegistry::new()) {
            Err(Error::InvalidCategoryDependency {
                stack,
                stack_category,
                stack_order,
                dependency,
                dep_category,
                dep_order,
            }) => {
                assert_eq!(stack, "proxy");
                assert_eq!(stack_category, "infrastructure");
                assert_eq!(stack_order, 2);
                assert_eq!(dependency, "jelly");
                assert_eq!(dep_category, "media");
                assert_eq!(dep_order, 5);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn suggestion_for_independent_stack_is_core() {
        let (_dir, layout) = layout();
        write_stack(&layout, "solo", "tools", &[]);

        let suggested =
            suggest_category_for_stack(&layout, "solo", &mut CategoryRegistry::new()).unwrap();
        assert_eq!(suggested, "core");
    }

    #[test]
    fn suggestion_tracks_the_highest_ordered_dependency() {
        let (_dir, layout) = layout();
        write_stack(&layout, "dash", "core", &["jelly", "prometheus"]);
        write_stack(&layout, "jelly", "media", &[]);
        write_stack(&layout, "prometheus", "monitoring", &[]);

        let suggested =
            suggest_category_for_stack(&layout, "dash", &mut CategoryRegistry::new()).unwrap();
        assert_eq!(suggested, "media");
    }

    #[test]
    fn missing_dependencies_are_skipped_here() {
        let (_dir, layout) = layout();
        write_stack(&layout, "proxy", "infrastructure", &["ghost"]);

        let enabled = vec!["proxy".to_string()];
        validate_category_dependencies(&layout, &enabled, &mut CategoryRegistry::new()).unwrap();
    }
}
