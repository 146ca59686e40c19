//! # Output Configuration
//!
//! Controls whether CLI output uses ANSI color. Color is applied in exactly
//! two places - the error formatter and the `list` command - and both go
//! through [`OutputConfig`] so the policy lives here.
//!
//! The following knobs are respected:
//! - `--color=never|always|auto` CLI flag
//! - `NO_COLOR` - disables colors when set (per <https://no-color.org/>)
//! - `CLICOLOR=0` - disables colors
//! - `CLICOLOR_FORCE=1` - forces colors even in non-TTY
//! - `TERM=dumb` - disables colors

use std::env;

/// Output configuration for controlling colored output.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether ANSI escape codes should be emitted.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// - `--color=always`: force colors on (overrides `NO_COLOR`)
    /// - `--color=never`: force colors off
    /// - `--color=auto`: detect based on environment and TTY
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Detect whether color output is supported based on environment.
    fn detect_color_support() -> bool {
        // The presence of NO_COLOR (even empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stderr().features().colors_supported()
    }

    /// A configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// A configuration with colors always disabled.
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
