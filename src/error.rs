//! # Error Taxonomy
//!
//! Every fatal error the tool can produce is a variant of [`Error`], carrying
//! its own context. Alongside the headline message (the `Display` impl), each
//! variant can contribute *context lines* (what exactly is wrong) and
//! *suggestions* (concrete next steps - a command to run or a file to edit).
//!
//! [`Error::render`] is the only place that applies color; it respects the
//! [`OutputConfig`](crate::output::OutputConfig) policy so `NO_COLOR` and
//! non-TTY output stay escape-free.

use std::path::PathBuf;

use console::Style;
use thiserror::Error;

use crate::output::OutputConfig;

/// Main error type for homelabctl operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("not a homelab repository: missing {}", missing.display())]
    RepositoryInvalid { missing: PathBuf },

    #[error("stack '{name}' does not exist")]
    StackNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("invalid stack.yaml for '{stack}': {detail}")]
    StackManifestInvalid { stack: String, detail: String },

    #[error("stack '{stack}' cannot depend on itself")]
    SelfDependency { stack: String },

    #[error("service '{service}' listed in services but missing from vars in stack '{stack}'")]
    MissingServiceVars { stack: String, service: String },

    #[error("unknown category: {name} (has it been registered via stack discovery?)")]
    UnknownCategory { name: String },

    #[error("stack '{stack}' has unsatisfied dependencies")]
    DependencyMissing {
        stack: String,
        requires: Vec<String>,
        missing: Vec<String>,
    },

    #[error("circular dependency detected")]
    DependencyCycle { cycle: Vec<String> },

    #[error(
        "invalid category dependency: '{stack}' ({stack_category}, order {stack_order}) \
         depends on '{dependency}' ({dep_category}, order {dep_order})"
    )]
    InvalidCategoryDependency {
        stack: String,
        stack_category: String,
        stack_order: i64,
        dependency: String,
        dep_category: String,
        dep_order: i64,
    },

    #[error("failed to load {}: {detail}", path.display())]
    InventoryParse { path: PathBuf, detail: String },

    #[error("inventory state error: {detail}")]
    StateIo { detail: String },

    #[error("failed to parse secrets for '{stack}': {detail}")]
    SecretParse { stack: String, detail: String },

    #[error("sops not found in PATH (needed to decrypt {})", file.display())]
    DecryptionToolMissing { file: PathBuf },

    #[error("sops failed to decrypt {}", file.display())]
    DecryptionFailed { file: PathBuf, stderr: String },

    #[error("gomplate not found in PATH")]
    RendererMissing,

    #[error("gomplate failed to render {}", template.display())]
    Render { template: PathBuf, stderr: String },

    #[error("duplicate service name: {service}")]
    DuplicateService { service: String },

    #[error("failed to write {}: {detail}", path.display())]
    OutputWrite { path: PathBuf, detail: String },

    #[error("environment error: {detail}")]
    Environment { detail: String },

    #[error("no stacks enabled")]
    NoStacksEnabled,

    #[error("stack already enabled: {name}")]
    StackAlreadyEnabled { name: String },

    #[error("stack not enabled: {name}")]
    StackNotEnabled { name: String },

    #[error("stack '{stack}' missing compose.yml.tmpl")]
    MissingComposeTemplate { stack: String },

    #[error("service '{service}' not found in enabled stacks")]
    ServiceNotFound {
        service: String,
        /// (service, owning stack) pairs shown as context.
        available: Vec<(String, String)>,
    },

    #[error("service '{service}' is already disabled")]
    ServiceAlreadyDisabled { service: String },

    #[error("service '{service}' is not disabled")]
    ServiceNotDisabled { service: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for homelabctl operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Additional context lines shown between the headline and suggestions.
    pub fn context_lines(&self) -> Vec<String> {
        match self {
            Error::DependencyCycle { cycle } => {
                let mut lines = vec!["Dependency cycle detected:".to_string()];
                for (i, stack) in cycle.iter().enumerate() {
                    let next = if i + 1 == cycle.len() {
                        format!("{} -> {} (cycle!)", stack, cycle[0])
                    } else {
                        format!("{} -> {}", stack, cycle[i + 1])
                    };
                    lines.push(format!("  {next}"));
                }
                lines
            }
            Error::DependencyMissing {
                stack,
                requires,
                missing,
            } => vec![
                "Dependency chain:".to_string(),
                format!("  {} requires: {:?}", stack, requires),
                format!("  Missing: {:?}", missing),
            ],
            Error::StackNotFound { available, .. } if !available.is_empty() => {
                let mut lines = vec!["Available stacks:".to_string()];
                lines.extend(available.iter().map(|s| format!("  - {s}")));
                lines
            }
            Error::ServiceNotFound { available, .. } if !available.is_empty() => {
                let mut lines = vec!["Available services in enabled stacks:".to_string()];
                lines.extend(
                    available
                        .iter()
                        .map(|(svc, stack)| format!("  - {svc} (from {stack})")),
                );
                lines
            }
            Error::DecryptionFailed { stderr, .. } if !stderr.trim().is_empty() => {
                let mut lines = vec!["sops error:".to_string()];
                lines.extend(stderr.trim_end().lines().map(str::to_string));
                lines
            }
            Error::Render { stderr, .. } if !stderr.trim().is_empty() => {
                let mut lines = vec!["Gomplate error:".to_string()];
                lines.extend(stderr.trim_end().lines().map(str::to_string));
                lines
            }
            _ => Vec::new(),
        }
    }

    /// Actionable suggestions, one concrete step per line.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::RepositoryInvalid { .. } => vec![
                "Run: homelabctl init".to_string(),
                "Check that you're in a homelab repository root".to_string(),
            ],
            Error::StackNotFound { .. } => vec![
                "Run: homelabctl list".to_string(),
                "Check stacks/ directory for available stacks".to_string(),
            ],
            Error::StackManifestInvalid { stack, .. } => vec![
                format!("Edit: stacks/{stack}/stack.yaml"),
                "Check YAML syntax (indentation, colons, dashes)".to_string(),
            ],
            Error::SelfDependency { stack } => vec![
                format!("Edit: stacks/{stack}/stack.yaml"),
                format!("Remove '{stack}' from requires list"),
            ],
            Error::MissingServiceVars { stack, service } => vec![
                format!("Edit: stacks/{stack}/stack.yaml"),
                format!("Add a '{service}:' entry under vars, or remove it from services"),
            ],
            Error::DependencyMissing { stack, missing, .. } => {
                let mut lines: Vec<String> = missing
                    .iter()
                    .map(|dep| format!("Run: homelabctl enable {dep}"))
                    .collect();
                lines.push(format!("Then run: homelabctl enable {stack}"));
                lines.push(format!("Or remove dependencies in stacks/{stack}/stack.yaml"));
                lines
            }
            Error::DependencyCycle { cycle } => {
                let mut lines = vec!["Remove one of the dependencies to break the cycle".to_string()];
                lines.extend(
                    cycle
                        .iter()
                        .map(|stack| format!("Edit: stacks/{stack}/stack.yaml")),
                );
                lines
            }
            Error::InvalidCategoryDependency {
                stack,
                stack_category,
                dependency,
                dep_category,
                ..
            } => vec![
                format!("Move '{dependency}' to category '{stack_category}' or lower"),
                format!("Or move '{stack}' to category '{dep_category}' or higher"),
                format!("Or remove the dependency from stacks/{stack}/stack.yaml"),
            ],
            Error::InventoryParse { path, .. } => vec![
                format!("Edit: {}", path.display()),
                "Run: homelabctl init (if in a new repository)".to_string(),
            ],
            Error::SecretParse { stack, .. } => vec![
                format!("Edit: secrets/{stack}.yaml (or the .enc.yaml variant)"),
                "Check YAML syntax (indentation, colons, dashes)".to_string(),
            ],
            Error::DecryptionToolMissing { .. } => vec![
                "Install sops: https://github.com/getsops/sops".to_string(),
                "On macOS: brew install sops".to_string(),
            ],
            Error::DecryptionFailed { file, .. } => vec![
                format!("Run: sops -d {}", file.display()),
                "Check that your decryption keys are available".to_string(),
            ],
            Error::RendererMissing => vec![
                "Install gomplate: https://docs.gomplate.ca/installing/".to_string(),
                "On macOS: brew install gomplate".to_string(),
            ],
            Error::Render { template, .. } => vec![
                format!("Check template syntax in: {}", template.display()),
                "Run: gomplate -f <template> -c .=<context> to debug".to_string(),
            ],
            Error::DuplicateService { service } => vec![
                format!("Rename the '{service}' service in one of the stacks that defines it"),
                "Run: homelabctl list".to_string(),
            ],
            Error::NoStacksEnabled => vec![
                "Run: homelabctl enable <stack>".to_string(),
                "Example: homelabctl enable core".to_string(),
            ],
            Error::StackAlreadyEnabled { name } => vec![
                format!("Run: homelabctl disable {name} (to disable it first)"),
                "Run: homelabctl list".to_string(),
            ],
            Error::StackNotEnabled { name } => {
                vec![format!("Run: homelabctl enable {name}")]
            }
            Error::MissingComposeTemplate { stack } => vec![
                format!("Create: stacks/{stack}/compose.yml.tmpl"),
                "See documentation for template format".to_string(),
            ],
            Error::ServiceNotFound { .. } => vec![
                "Run: homelabctl list".to_string(),
                "Check that the service's stack is enabled".to_string(),
            ],
            Error::ServiceAlreadyDisabled { service } => vec![
                "Use 'homelabctl list' to see disabled services".to_string(),
                format!("Run: homelabctl enable -s {service}"),
            ],
            Error::ServiceNotDisabled { .. } => {
                vec!["Use 'homelabctl list' to see disabled services".to_string()]
            }
            _ => Vec::new(),
        }
    }

    /// Format the full error report: headline, context, suggestions.
    ///
    /// This is the single place that applies ANSI color.
    pub fn render(&self, colors: &OutputConfig) -> String {
        let paint = |text: &str, style: Style| -> String {
            if colors.use_color {
                style.force_styling(true).apply_to(text).to_string()
            } else {
                text.to_string()
            }
        };

        let mut out = String::new();
        out.push_str(&paint("Error: ", Style::new().red()));
        out.push_str(&self.to_string());
        out.push('\n');

        let context = self.context_lines();
        if !context.is_empty() {
            out.push('\n');
            for line in &context {
                out.push_str(&paint(&format!("  {line}"), Style::new().yellow()));
                out.push('\n');
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push('\n');
            out.push_str(&paint("To resolve:", Style::new().bold()));
            out.push('\n');
            for suggestion in &suggestions {
                out.push_str(&paint("  \u{2192} ", Style::new().green()));
                out.push_str(suggestion);
                out.push('\n');
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_report_lists_every_edge_and_file() {
        let err = Error::DependencyCycle {
            cycle: vec!["a".to_string(), "b".to_string()],
        };

        let report = err.render(&OutputConfig::without_color());
        assert!(report.contains("circular dependency detected"));
        assert!(report.contains("a -> b"));
        assert!(report.contains("b -> a (cycle!)"));
        assert!(report.contains("Edit: stacks/a/stack.yaml"));
        assert!(report.contains("Edit: stacks/b/stack.yaml"));
    }

    #[test]
    fn missing_dependency_reports_full_chain() {
        let err = Error::DependencyMissing {
            stack: "grafana".to_string(),
            requires: vec!["prometheus".to_string(), "loki".to_string()],
            missing: vec!["loki".to_string()],
        };

        let report = err.render(&OutputConfig::without_color());
        assert!(report.contains("grafana requires"));
        assert!(report.contains("loki"));
        assert!(report.contains("Run: homelabctl enable loki"));
        assert!(report.contains("Then run: homelabctl enable grafana"));
    }

    #[test]
    fn category_violation_offers_three_alternatives() {
        let err = Error::InvalidCategoryDependency {
            stack: "proxy".to_string(),
            stack_category: "infrastructure".to_string(),
            stack_order: 2,
            dependency: "jelly".to_string(),
            dep_category: "media".to_string(),
            dep_order: 5,
        };

        assert_eq!(err.suggestions().len(), 3);
        let report = err.render(&OutputConfig::without_color());
        assert!(report.contains("order 2"));
        assert!(report.contains("order 5"));
        assert!(report.contains("Or remove the dependency"));
    }

    #[test]
    fn render_without_color_has_no_escape_codes() {
        let err = Error::NoStacksEnabled;
        let report = err.render(&OutputConfig::without_color());
        assert!(!report.contains('\u{1b}'));
        assert!(report.contains("To resolve:"));
    }

    #[test]
    fn render_with_color_paints_headline() {
        let err = Error::NoStacksEnabled;
        let report = err.render(&OutputConfig::with_color());
        assert!(report.contains('\u{1b}'));
    }

    #[test]
    fn subprocess_stderr_is_preserved_verbatim() {
        let err = Error::Render {
            template: PathBuf::from("stacks/web/compose.yml.tmpl"),
            stderr: "template: parse error at line 3\n".to_string(),
        };

        let report = err.render(&OutputConfig::without_color());
        assert!(report.contains("Gomplate error:"));
        assert!(report.contains("parse error at line 3"));
    }
}
