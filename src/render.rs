//! # Template Renderer Adapter
//!
//! Templates are rendered by the external `gomplate` binary; this module
//! owns the invocation contract and nothing else:
//!
//! ```text
//! gomplate -f <template> -c .=<context-file>
//! ```
//!
//! The rendering context is serialized to a temporary YAML file with mode
//! 0600 (it may contain secrets) which is removed on every exit path.
//! Stdout is the rendered output; a non-zero exit is fatal with stderr
//! preserved; a missing binary is fatal with install instructions.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use serde::Serialize;
use serde_yaml::Mapping;

use crate::error::{Error, Result};

/// Identity of the stack being rendered, exposed to templates as `.stack`.
#[derive(Debug, Clone, Serialize)]
pub struct StackInfo {
    pub name: String,
    pub category: String,
}

/// Cross-stack view exposed to templates as `.stacks`.
#[derive(Debug, Clone, Serialize)]
pub struct StacksInfo {
    /// Enabled stack names in deployment order.
    pub enabled: Vec<String>,
}

/// The full context handed to the template engine.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub vars: Mapping,
    pub stack: StackInfo,
    pub stacks: StacksInfo,
}

/// Renders a template file, returning the rendered text.
pub fn render_template(template: &Path, context: &RenderContext) -> Result<String> {
    let context_yaml = serde_yaml::to_string(context).map_err(|err| Error::Environment {
        detail: format!("failed to marshal render context: {err}"),
    })?;

    // NamedTempFile is created 0600 and unlinked on drop, which covers the
    // error paths below as well.
    let mut context_file = tempfile::Builder::new()
        .prefix("homelabctl-context-")
        .suffix(".yaml")
        .tempfile()
        .map_err(|err| Error::Environment {
            detail: format!("failed to create temp context file: {err}"),
        })?;
    context_file
        .write_all(context_yaml.as_bytes())
        .map_err(|err| Error::Environment {
            detail: format!("failed to write temp context file: {err}"),
        })?;
    context_file.flush().map_err(|err| Error::Environment {
        detail: format!("failed to flush temp context file: {err}"),
    })?;

    let output = match Command::new("gomplate")
        .arg("-f")
        .arg(template)
        .arg("-c")
        .arg(format!(".={}", context_file.path().display()))
        .output()
    {
        Ok(output) => output,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::RendererMissing)
        }
        Err(err) => {
            return Err(Error::Environment {
                detail: format!("failed to run gomplate: {err}"),
            })
        }
    };

    if !output.status.success() {
        return Err(Error::Render {
            template: template.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Renders a template and writes the output, creating parent directories.
pub fn render_to_file(template: &Path, output: &Path, context: &RenderContext) -> Result<()> {
    let content = render_template(template, context)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::OutputWrite {
            path: output.to_path_buf(),
            detail: format!("failed to create output directory: {err}"),
        })?;
    }

    fs::write(output, content).map_err(|err| Error::OutputWrite {
        path: output.to_path_buf(),
        detail: err.to_string(),
    })
}
