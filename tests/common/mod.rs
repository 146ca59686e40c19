//! Shared test utilities for the E2E tests.
//!
//! Provides a [`TestFixture`] that scaffolds a homelab repository in a temp
//! directory, plus stub `gomplate`/`sops` executables so the pipeline can be
//! exercised end-to-end without the real tools installed. The stubs honor
//! the invocation contracts (`-f <template> -c .=<context>` / `-d <file>`)
//! and simply emit the input file, which is exactly enough to test
//! everything downstream of rendering.
//!
//! Tests that want the real binaries are gated behind the
//! `integration-tests` feature.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_fs::prelude::*;

/// Re-exports for test files.
#[allow(unused_imports)]
pub mod prelude {
    pub use super::TestFixture;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;
}

/// Stub gomplate: parses `-f <template>` and emits the template verbatim.
const FAKE_GOMPLATE: &str = "\
#!/bin/sh
template=\"\"
while [ \"$#\" -gt 0 ]; do
  case \"$1\" in
    -f) shift; template=\"$1\" ;;
  esac
  shift
done
if [ -z \"$template\" ] || [ ! -f \"$template\" ]; then
  echo \"no template given\" >&2
  exit 1
fi
cat \"$template\"
";

/// Stub sops: `sops -d <file>` emits the file verbatim (pretend-decrypt).
const FAKE_SOPS: &str = "\
#!/bin/sh
if [ \"$1\" != \"-d\" ] || [ ! -f \"$2\" ]; then
  echo \"usage: sops -d <file>\" >&2
  exit 1
fi
cat \"$2\"
";

/// A temp-directory homelab repository with helpers to populate it.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Creates a scaffolded repository (directories plus a minimal
    /// `inventory/vars.yaml`).
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("failed to create temp directory");

        for dir in ["stacks", "enabled", "inventory", "secrets"] {
            temp_dir.child(dir).create_dir_all().unwrap();
        }
        temp_dir
            .child("inventory/vars.yaml")
            .write_str("domain: ex.local\n")
            .unwrap();

        Self { temp_dir }
    }

    /// An empty temp directory without any scaffolding.
    pub fn bare() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Overwrites `inventory/vars.yaml`.
    pub fn with_inventory(self, content: &str) -> Self {
        self.temp_dir
            .child("inventory/vars.yaml")
            .write_str(content)
            .unwrap();
        self
    }

    /// Writes `inventory/state.yaml`.
    pub fn with_state(self, content: &str) -> Self {
        self.temp_dir
            .child("inventory/state.yaml")
            .write_str(content)
            .unwrap();
        self
    }

    /// Writes `stacks/<name>/stack.yaml`.
    pub fn with_manifest(self, name: &str, content: &str) -> Self {
        self.temp_dir
            .child(format!("stacks/{name}/stack.yaml"))
            .write_str(content)
            .unwrap();
        self
    }

    /// Writes a minimal manifest: one `<name>-svc` service, no requires.
    pub fn with_stack(self, name: &str, category: &str) -> Self {
        let manifest = format!(
            "name: {name}\ncategory: {category}\nservices: [{name}-svc]\n\
             vars:\n  {name}-svc:\n    image: {name}:latest\n"
        );
        self.with_manifest(name, &manifest)
    }

    /// Writes `stacks/<name>/compose.yml.tmpl`.
    pub fn with_template(self, name: &str, content: &str) -> Self {
        self.temp_dir
            .child(format!("stacks/{name}/compose.yml.tmpl"))
            .write_str(content)
            .unwrap();
        self
    }

    /// Writes `stacks/<name>/contribute/<provider>/<file>`.
    pub fn with_contribution(self, name: &str, provider: &str, file: &str, content: &str) -> Self {
        self.temp_dir
            .child(format!("stacks/{name}/contribute/{provider}/{file}"))
            .write_str(content)
            .unwrap();
        self
    }

    /// Writes `stacks/<name>/config/<rel>`.
    pub fn with_config_template(self, name: &str, rel: &str, content: &str) -> Self {
        self.temp_dir
            .child(format!("stacks/{name}/config/{rel}"))
            .write_str(content)
            .unwrap();
        self
    }

    /// Writes `secrets/<name>.yaml` (plaintext) or `.enc.yaml`.
    pub fn with_secrets(self, name: &str, encrypted: bool, content: &str) -> Self {
        let ext = if encrypted { "enc.yaml" } else { "yaml" };
        self.temp_dir
            .child(format!("secrets/{name}.{ext}"))
            .write_str(content)
            .unwrap();
        self
    }

    /// Creates the `enabled/<name>` symlink.
    pub fn enable(self, name: &str) -> Self {
        std::os::unix::fs::symlink(
            Path::new("../stacks").join(name),
            self.temp_dir.child(format!("enabled/{name}")).path(),
        )
        .unwrap();
        self
    }

    /// Installs the stub `gomplate` and `sops` into `<repo>/.test-bin`.
    pub fn with_fake_tools(self) -> Self {
        self.install_tool("gomplate", FAKE_GOMPLATE)
            .install_tool("sops", FAKE_SOPS)
    }

    fn install_tool(self, name: &str, script: &str) -> Self {
        let tool = self.temp_dir.child(format!(".test-bin/{name}"));
        tool.write_str(script).unwrap();
        std::fs::set_permissions(tool.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        self
    }

    fn bin_dir(&self) -> PathBuf {
        self.temp_dir.child(".test-bin").path().to_path_buf()
    }

    /// A command running in this repository with the stub tools on PATH.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("homelabctl").expect("binary exists");
        cmd.current_dir(self.path());

        let path = std::env::var("PATH").unwrap_or_default();
        cmd.env("PATH", format!("{}:{path}", self.bin_dir().display()));
        // Keep output deterministic regardless of the host terminal.
        cmd.env("NO_COLOR", "1");
        cmd
    }

    /// Like [`command`](Self::command) but with an empty-ish PATH that only
    /// contains the stub directory, for missing-tool tests.
    pub fn command_without_tools(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("homelabctl").expect("binary exists");
        cmd.current_dir(self.path());
        cmd.env("PATH", self.bin_dir().display().to_string());
        cmd.env("NO_COLOR", "1");
        cmd
    }

    /// Reads a file relative to the repository root.
    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.temp_dir.child(rel).path())
            .unwrap_or_else(|err| panic!("failed to read {rel}: {err}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.temp_dir.child(rel).path().exists()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
