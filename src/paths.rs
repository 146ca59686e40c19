//! # Repository Layout
//!
//! Canonical paths inside a homelab repository. Every other module resolves
//! files through [`RepoLayout`] so that the repository root is threaded
//! explicitly instead of relying on the process working directory; unit
//! tests point a layout at a temp directory and never have to chdir.
//!
//! The on-disk structure this describes:
//!
//! ```text
//! <root>/
//!   stacks/<name>/stack.yaml
//!   stacks/<name>/compose.yml.tmpl
//!   stacks/<name>/config/**/*.tmpl
//!   stacks/<name>/contribute/<provider>/*.tmpl
//!   enabled/<name>            (symlink -> ../stacks/<name>)
//!   inventory/vars.yaml
//!   inventory/state.yaml
//!   secrets/<name>.yaml | <name>.enc.yaml
//!   runtime/docker-compose.yml
//! ```

use std::path::{Path, PathBuf};

/// Top-level directory names.
pub const STACKS_DIR: &str = "stacks";
pub const ENABLED_DIR: &str = "enabled";
pub const INVENTORY_DIR: &str = "inventory";
pub const SECRETS_DIR: &str = "secrets";
pub const RUNTIME_DIR: &str = "runtime";

/// Well-known file names.
pub const STACK_YAML: &str = "stack.yaml";
pub const COMPOSE_TEMPLATE: &str = "compose.yml.tmpl";
pub const INVENTORY_VARS: &str = "vars.yaml";
pub const INVENTORY_STATE: &str = "state.yaml";
pub const DOCKER_COMPOSE: &str = "docker-compose.yml";

/// Extensions.
pub const TEMPLATE_EXT: &str = ".tmpl";
pub const SECRETS_ENC_EXT: &str = ".enc.yaml";
pub const SECRETS_EXT: &str = ".yaml";

/// File permissions (Unix). Secrets, state and render-context files carry
/// the restrictive mode because they may hold credentials.
pub const DIR_MODE: u32 = 0o755;
pub const FILE_MODE: u32 = 0o644;
pub const SECURE_FILE_MODE: u32 = 0o600;

/// Resolves canonical paths relative to a repository root.
#[derive(Debug, Clone)]
pub struct RepoLayout {
    root: PathBuf,
}

impl RepoLayout {
    /// Create a layout rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at the process working directory.
    pub fn current() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stacks_dir(&self) -> PathBuf {
        self.root.join(STACKS_DIR)
    }

    pub fn enabled_dir(&self) -> PathBuf {
        self.root.join(ENABLED_DIR)
    }

    pub fn inventory_dir(&self) -> PathBuf {
        self.root.join(INVENTORY_DIR)
    }

    pub fn secrets_dir(&self) -> PathBuf {
        self.root.join(SECRETS_DIR)
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join(RUNTIME_DIR)
    }

    /// `stacks/<name>`
    pub fn stack_dir(&self, name: &str) -> PathBuf {
        self.stacks_dir().join(name)
    }

    /// `stacks/<name>/stack.yaml`
    pub fn stack_yaml(&self, name: &str) -> PathBuf {
        self.stack_dir(name).join(STACK_YAML)
    }

    /// `stacks/<name>/compose.yml.tmpl`
    pub fn stack_compose_template(&self, name: &str) -> PathBuf {
        self.stack_dir(name).join(COMPOSE_TEMPLATE)
    }

    /// `stacks/<name>/config`
    pub fn stack_config_dir(&self, name: &str) -> PathBuf {
        self.stack_dir(name).join("config")
    }

    /// `stacks/<name>/contribute/<provider>`
    pub fn stack_contribute_dir(&self, name: &str, provider: &str) -> PathBuf {
        self.stack_dir(name).join("contribute").join(provider)
    }

    /// `enabled/<name>`
    pub fn enabled_link(&self, name: &str) -> PathBuf {
        self.enabled_dir().join(name)
    }

    /// `inventory/vars.yaml`
    pub fn inventory_vars(&self) -> PathBuf {
        self.inventory_dir().join(INVENTORY_VARS)
    }

    /// `inventory/state.yaml`
    pub fn inventory_state(&self) -> PathBuf {
        self.inventory_dir().join(INVENTORY_STATE)
    }

    /// `secrets/<name><ext>` where ext is `.yaml` or `.enc.yaml`.
    pub fn secrets_file(&self, stack: &str, ext: &str) -> PathBuf {
        self.secrets_dir().join(format!("{stack}{ext}"))
    }

    /// `runtime/docker-compose.yml` - the canonical output.
    pub fn docker_compose(&self) -> PathBuf {
        self.runtime_dir().join(DOCKER_COMPOSE)
    }

    /// `runtime/<stack>-compose.yml` - per-stack intermediate.
    pub fn runtime_compose(&self, stack: &str) -> PathBuf {
        self.runtime_dir().join(format!("{stack}-compose.yml"))
    }

    /// `runtime/<provider>/dynamic/<stack>-<file>` - provider contribution.
    pub fn contribution_file(&self, provider: &str, stack: &str, file: &str) -> PathBuf {
        self.runtime_dir()
            .join(provider)
            .join("dynamic")
            .join(format!("{stack}-{file}"))
    }

    /// `runtime/<stack>/<rel>` - rendered config file.
    pub fn runtime_config_file(&self, stack: &str, rel: &Path) -> PathBuf {
        self.runtime_dir().join(stack).join(rel)
    }
}
