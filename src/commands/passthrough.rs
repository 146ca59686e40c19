//! # Docker Compose Passthrough
//!
//! Any unrecognized subcommand is forwarded to `docker compose` with the
//! generated file, so the full compose surface (`ps`, `logs`, `restart`,
//! `down`, `exec`, `pull`, `config`, ...) stays available without
//! re-wrapping each command.

use std::process::Command;

use anyhow::Result;

use homelabctl::paths::RepoLayout;

pub fn execute(args: Vec<String>) -> Result<()> {
    let layout = RepoLayout::current()?;

    let compose_file = layout.docker_compose();
    if !compose_file.is_file() {
        anyhow::bail!(
            "no {} found - run 'homelabctl generate' first",
            compose_file.display()
        );
    }

    let status = Command::new("docker")
        .arg("compose")
        .arg("-f")
        .arg(&compose_file)
        .args(&args)
        .status()
        .map_err(|err| anyhow::anyhow!("failed to run docker compose: {err}"))?;

    if !status.success() {
        anyhow::bail!("docker compose {} failed with {status}", args.join(" "));
    }

    Ok(())
}
