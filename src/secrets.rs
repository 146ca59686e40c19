//! # Per-Stack Secrets
//!
//! Secrets are optional. For stack `S` two candidates are probed in order:
//! `secrets/S.enc.yaml` (encrypted, decrypted by invoking `sops -d`) then
//! `secrets/S.yaml` (plaintext). Neither existing yields an empty mapping.
//!
//! The decryption tool contract: stdout is the plaintext YAML, a non-zero
//! exit is fatal with stderr preserved, a missing binary is fatal with an
//! install hint.

use std::fs;
use std::path::Path;
use std::process::Command;

use serde_yaml::Mapping;

use crate::error::{Error, Result};
use crate::paths::{RepoLayout, SECRETS_ENC_EXT, SECRETS_EXT};

/// Loads the secrets mapping for a stack.
pub fn load_secrets(layout: &RepoLayout, stack: &str) -> Result<Mapping> {
    let encrypted = layout.secrets_file(stack, SECRETS_ENC_EXT);
    let plaintext = layout.secrets_file(stack, SECRETS_EXT);

    let data = if encrypted.is_file() {
        decrypt_with_sops(&encrypted)?
    } else if plaintext.is_file() {
        fs::read_to_string(&plaintext).map_err(|err| Error::SecretParse {
            stack: stack.to_string(),
            detail: format!("failed to read {}: {err}", plaintext.display()),
        })?
    } else {
        return Ok(Mapping::new());
    };

    let secrets: Option<Mapping> =
        serde_yaml::from_str(&data).map_err(|err| Error::SecretParse {
            stack: stack.to_string(),
            detail: err.to_string(),
        })?;

    Ok(secrets.unwrap_or_default())
}

/// Runs `sops -d <file>` and returns the decrypted stdout.
fn decrypt_with_sops(file: &Path) -> Result<String> {
    let output = match Command::new("sops").arg("-d").arg(file).output() {
        Ok(output) => output,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::DecryptionToolMissing {
                file: file.to_path_buf(),
            })
        }
        Err(err) => {
            return Err(Error::Environment {
                detail: format!("failed to run sops: {err}"),
            })
        }
    };

    if !output.status.success() {
        return Err(Error::DecryptionFailed {
            file: file.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
