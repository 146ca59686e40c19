//! # Category Registry
//!
//! Stacks declare a `category`, which drives deployment ordering, the colored
//! badges in `list`, and a lowest-priority layer of default variables.
//! Categories are discovered dynamically while manifests load: known names
//! come with curated metadata, anything else registers on first sight with
//! sentinel ordering.
//!
//! The registry is a plain value threaded through each run (it lives on the
//! pipeline context), so tests get isolated registries for free and nothing
//! survives between invocations.

use std::collections::HashMap;

use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};

/// Deployment order assigned to categories without curated metadata.
pub const LAST_ORDER: i64 = 999;

/// A stack category: a named deployment tier.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub display_name: String,
    /// Deployment order (lower = earlier).
    pub order: i64,
    /// Terminal color used by the `list` command.
    pub color: String,
    /// Category-wide variable defaults, the lowest-priority merge layer.
    pub defaults: Mapping,
}

/// Registry mapping category name to metadata, populated during stack
/// discovery.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    categories: HashMap<String, Category>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category by name. Re-registration is a no-op. Known names
    /// get curated metadata; everything else is defaulted with order
    /// [`LAST_ORDER`].
    pub fn register(&mut self, name: &str) {
        if self.categories.contains_key(name) {
            return;
        }

        let category = builtin(name).unwrap_or_else(|| Category {
            name: name.to_string(),
            display_name: to_display_name(name),
            order: LAST_ORDER,
            color: "white".to_string(),
            defaults: Mapping::new(),
        });
        self.categories.insert(name.to_string(), category);
    }

    /// Look up a registered category.
    pub fn get(&self, name: &str) -> Result<&Category> {
        self.categories
            .get(name)
            .ok_or_else(|| Error::UnknownCategory {
                name: name.to_string(),
            })
    }

    /// Look up a category, registering it first if needed. Never fails for a
    /// non-empty name.
    pub fn ensure(&mut self, name: &str) -> &Category {
        self.register(name);
        &self.categories[name]
    }

    /// Deployment order for a category, registering it if needed.
    pub fn order_of(&mut self, name: &str) -> i64 {
        self.ensure(name).order
    }

    /// All registered categories sorted by `(order, name)`.
    pub fn all(&self) -> Vec<&Category> {
        let mut categories: Vec<&Category> = self.categories.values().collect();
        categories.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        categories
    }
}

/// Converts "my-category" to "My Category".
fn to_display_name(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Curated metadata for the known categories.
fn builtin(name: &str) -> Option<Category> {
    let (display, order, color, defaults) = match name {
        "core" => ("Core", 1, "blue", hardened_defaults()),
        "infrastructure" => ("Infrastructure", 2, "cyan", hardened_defaults()),
        "monitoring" => ("Monitoring", 3, "green", restart_defaults()),
        "automation" => ("Automation", 4, "yellow", restart_defaults()),
        "media" => ("Media", 5, "magenta", media_defaults()),
        "tools" => ("Tools", 6, "white", Mapping::new()),
        _ => return None,
    };

    Some(Category {
        name: name.to_string(),
        display_name: display.to_string(),
        order,
        color: color.to_string(),
        defaults,
    })
}

fn restart_defaults() -> Mapping {
    let mut defaults = Mapping::new();
    defaults.insert(Value::from("restart"), Value::from("unless-stopped"));
    defaults
}

/// Restart policy plus `no-new-privileges` for the trust-critical tiers.
fn hardened_defaults() -> Mapping {
    let mut defaults = restart_defaults();
    defaults.insert(
        Value::from("security_opt"),
        Value::Sequence(vec![Value::from("no-new-privileges:true")]),
    );
    defaults
}

fn media_defaults() -> Mapping {
    let mut defaults = restart_defaults();
    let mut environment = Mapping::new();
    environment.insert(Value::from("PUID"), Value::from("1000"));
    environment.insert(Value::from("PGID"), Value::from("1000"));
    defaults.insert(Value::from("environment"), Value::Mapping(environment));
    defaults
}
