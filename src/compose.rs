//! # Compose Fragment Merging
//!
//! Each stack renders its own compose fragment; this module merges them
//! into the canonical `runtime/docker-compose.yml` with per-section
//! policies:
//!
//! - **services** - names are globally unique, a duplicate is fatal.
//! - **volumes** - first definition wins; duplicates warn, a duplicate with
//!   a differing spec warns louder but still keeps the first. Multiple
//!   stacks may re-declare a shared volume without breaking generation.
//! - **networks** - the `external` flag drives the policy: a creating
//!   (owned) definition beats an external reference, two external
//!   references keep the first silently, two owned definitions warn and
//!   keep the first.
//!
//! Fragments are merged in deployment order and section maps preserve
//! first-insertion order, so output is byte-stable across runs.

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::paths::FILE_MODE;

/// A parsed compose fragment (or the merged result).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeFile {
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub services: Mapping,
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub volumes: Mapping,
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub networks: Mapping,
}

/// A network definition, tagged by who manages it. The merge policy
/// branches on this rather than peeking into the raw mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkSpec {
    /// `external: true` - the network is managed outside this compose file.
    External(Value),
    /// The network is created by this compose file.
    Owned(Value),
}

impl NetworkSpec {
    pub fn parse(value: &Value) -> Self {
        match value.get("external").and_then(Value::as_bool) {
            Some(true) => NetworkSpec::External(value.clone()),
            _ => NetworkSpec::Owned(value.clone()),
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, NetworkSpec::External(_))
    }
}

fn key_name(key: &Value) -> String {
    key.as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{key:?}"))
}

/// Merges rendered per-stack fragments, in deployment order, into one file.
pub fn merge_compose_files(files: &[std::path::PathBuf]) -> Result<ComposeFile> {
    let mut merged = ComposeFile::default();

    for file in files {
        let data = fs::read_to_string(file).map_err(|err| Error::Environment {
            detail: format!("failed to read {}: {err}", file.display()),
        })?;

        let fragment: ComposeFile =
            serde_yaml::from_str(&data).map_err(|err| Error::Environment {
                detail: format!("failed to parse {}: {err}", file.display()),
            })?;

        merge_services(&mut merged.services, &fragment.services)?;
        merge_volumes(&mut merged.volumes, &fragment.volumes, file);
        merge_networks(&mut merged.networks, &fragment.networks, file);
    }

    Ok(merged)
}

fn merge_services(merged: &mut Mapping, incoming: &Mapping) -> Result<()> {
    for (name, spec) in incoming {
        if merged.contains_key(name) {
            return Err(Error::DuplicateService {
                service: key_name(name),
            });
        }
        merged.insert(name.clone(), spec.clone());
    }
    Ok(())
}

fn merge_volumes(merged: &mut Mapping, incoming: &Mapping, file: &Path) {
    for (name, spec) in incoming {
        if let Some(existing) = merged.get(name) {
            warn!(
                "duplicate volume '{}' in {} (using first definition)",
                key_name(name),
                file.display()
            );

            if existing != spec {
                let first = serde_yaml::to_string(existing).unwrap_or_default();
                let ignored = serde_yaml::to_string(spec).unwrap_or_default();
                warn!(
                    "volume '{}' has conflicting definitions: first: {} ignored: {}",
                    key_name(name),
                    first.trim_end(),
                    ignored.trim_end()
                );
            }
            continue;
        }
        merged.insert(name.clone(), spec.clone());
    }
}

fn merge_networks(merged: &mut Mapping, incoming: &Mapping, file: &Path) {
    for (name, spec) in incoming {
        let new = NetworkSpec::parse(spec);

        let existing = match merged.get(name) {
            Some(existing) => NetworkSpec::parse(existing),
            None => {
                merged.insert(name.clone(), spec.clone());
                continue;
            }
        };

        match (existing.is_external(), new.is_external()) {
            // Existing creates it, the new one only references it: keep.
            (false, true) => {}
            // The new one creates it: the creating definition wins.
            (true, false) => {
                merged.insert(name.clone(), spec.clone());
            }
            // Both claim ownership: latent conflict, keep first.
            (false, false) => {
                warn!(
                    "duplicate network '{}' in {}: multiple stacks trying to create \
                     the same network, keeping first definition",
                    key_name(name),
                    file.display()
                );
            }
            // Both external: expected, keep first silently.
            (true, true) => {}
        }
    }
}

/// Removes disabled services from a merged compose file, returning the
/// removed names in map order. Volumes and networks are left untouched even
/// when only removed services referenced them.
pub fn filter_disabled_services(
    compose: &mut ComposeFile,
    disabled: &HashSet<String>,
) -> Vec<String> {
    if disabled.is_empty() {
        return Vec::new();
    }

    let mut kept = Mapping::new();
    let mut removed = Vec::new();

    for (name, spec) in &compose.services {
        match name.as_str() {
            Some(service) if disabled.contains(service) => {
                removed.push(service.to_string());
            }
            _ => {
                kept.insert(name.clone(), spec.clone());
            }
        }
    }

    compose.services = kept;
    removed
}

/// Serializes the merged file to the canonical output path with mode 0644.
pub fn write_compose_file(path: &Path, compose: &ComposeFile) -> Result<()> {
    let data = serde_yaml::to_string(compose).map_err(|err| Error::OutputWrite {
        path: path.to_path_buf(),
        detail: format!("failed to marshal compose file: {err}"),
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::OutputWrite {
            path: path.to_path_buf(),
            detail: format!("failed to create output directory: {err}"),
        })?;
    }

    fs::write(path, data).map_err(|err| Error::OutputWrite {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;
    fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE)).map_err(|err| {
        Error::OutputWrite {
            path: path.to_path_buf(),
            detail: format!("failed to set permissions: {err}"),
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_fragments(fragments: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let dir = TempDir::new().unwrap();
        let paths = fragments
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let path = dir.path().join(format!("{i}-compose.yml"));
                fs::write(&path, content).unwrap();
                path
            })
            .collect();
        (dir, paths)
    }

    fn get<'a>(section: &'a Mapping, name: &str) -> Option<&'a Value> {
        section.get(&Value::from(name))
    }

    #[test]
    fn services_from_all_fragments_are_collected() {
        let (_dir, files) = write_fragments(&[
            "services:\n  traefik:\n    image: traefik:v3\n",
            "services:\n  grafana:\n    image: grafana/grafana\n",
        ]);

        let merged = merge_compose_files(&files).unwrap();
        assert_eq!(merged.services.len(), 2);
        assert!(get(&merged.services, "traefik").is_some());
        assert!(get(&merged.services, "grafana").is_some());
    }

    #[test]
    fn duplicate_service_is_fatal_and_names_the_offender() {
        let (_dir, files) = write_fragments(&[
            "services:\n  app:\n    image: one\n",
            "services:\n  app:\n    image: two\n",
        ]);

        match merge_compose_files(&files) {
            Err(Error::DuplicateService { service }) => assert_eq!(service, "app"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn duplicate_volume_keeps_first_definition() {
        let (_dir, files) = write_fragments(&[
            "services:\n  a:\n    image: a\nvolumes:\n  data:\n    driver: local\n",
            "services:\n  b:\n    image: b\nvolumes:\n  data:\n    driver: nfs\n",
        ]);

        let merged = merge_compose_files(&files).unwrap();
        let data = get(&merged.volumes, "data").unwrap();
        assert_eq!(data.get("driver"), Some(&Value::from("local")));
    }

    #[test]
    fn owned_network_beats_external_reference() {
        let (_dir, files) = write_fragments(&[
            "services:\n  a:\n    image: a\nnetworks:\n  proxy:\n    external: true\n",
            "services:\n  b:\n    image: b\nnetworks:\n  proxy:\n    driver: bridge\n",
        ]);

        let merged = merge_compose_files(&files).unwrap();
        let proxy = get(&merged.networks, "proxy").unwrap();
        assert!(!NetworkSpec::parse(proxy).is_external());
        assert_eq!(proxy.get("driver"), Some(&Value::from("bridge")));
    }

    #[test]
    fn external_reference_does_not_displace_owned_network() {
        let (_dir, files) = write_fragments(&[
            "services:\n  a:\n    image: a\nnetworks:\n  proxy:\n    driver: bridge\n",
            "services:\n  b:\n    image: b\nnetworks:\n  proxy:\n    external: true\n",
        ]);

        let merged = merge_compose_files(&files).unwrap();
        let proxy = get(&merged.networks, "proxy").unwrap();
        assert!(!NetworkSpec::parse(proxy).is_external());
    }

    #[test]
    fn two_owned_networks_warn_and_keep_first() {
        let (_dir, files) = write_fragments(&[
            "services:\n  a:\n    image: a\nnetworks:\n  shared:\n    driver: bridge\n",
            "services:\n  b:\n    image: b\nnetworks:\n  shared:\n    driver: overlay\n",
        ]);

        let merged = merge_compose_files(&files).unwrap();
        let shared = get(&merged.networks, "shared").unwrap();
        assert_eq!(shared.get("driver"), Some(&Value::from("bridge")));
    }

    #[test]
    fn two_external_networks_keep_first_silently() {
        let (_dir, files) = write_fragments(&[
            "services:\n  a:\n    image: a\nnetworks:\n  lan:\n    external: true\n",
            "services:\n  b:\n    image: b\nnetworks:\n  lan:\n    external: true\n    name: lan0\n",
        ]);

        let merged = merge_compose_files(&files).unwrap();
        let lan = get(&merged.networks, "lan").unwrap();
        assert_eq!(lan.get("name"), None);
    }

    #[test]
    fn filter_removes_only_disabled_services() {
        let (_dir, files) = write_fragments(&[
            "services:\n  traefik:\n    image: traefik:v3\n",
            "services:\n  grafana:\n    image: g\n  loki:\n    image: l\nvolumes:\n  loki-data: {}\n",
        ]);

        let mut merged = merge_compose_files(&files).unwrap();
        let disabled: HashSet<String> = ["loki".to_string()].into_iter().collect();
        let removed = filter_disabled_services(&mut merged, &disabled);

        assert_eq!(removed, vec!["loki"]);
        assert!(get(&merged.services, "traefik").is_some());
        assert!(get(&merged.services, "grafana").is_some());
        assert!(get(&merged.services, "loki").is_none());
        // Volumes are not garbage-collected.
        assert!(get(&merged.volumes, "loki-data").is_some());
    }

    #[test]
    fn filter_with_empty_disabled_set_is_a_noop() {
        let (_dir, files) = write_fragments(&["services:\n  a:\n    image: a\n"]);
        let mut merged = merge_compose_files(&files).unwrap();
        assert!(filter_disabled_services(&mut merged, &HashSet::new()).is_empty());
        assert_eq!(merged.services.len(), 1);
    }

    #[test]
    fn merge_is_byte_deterministic() {
        let (_dir, files) = write_fragments(&[
            "services:\n  a:\n    image: a\nnetworks:\n  net: {}\n",
            "services:\n  b:\n    image: b\nvolumes:\n  vol: {}\n",
        ]);

        let first = serde_yaml::to_string(&merge_compose_files(&files).unwrap()).unwrap();
        let second = serde_yaml::to_string(&merge_compose_files(&files).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_sections_are_omitted_from_output() {
        let (_dir, files) = write_fragments(&["services:\n  a:\n    image: a\n"]);
        let merged = merge_compose_files(&files).unwrap();
        let yaml = serde_yaml::to_string(&merged).unwrap();
        assert!(yaml.contains("services:"));
        assert!(!yaml.contains("volumes:"));
        assert!(!yaml.contains("networks:"));
    }

    #[test]
    fn written_output_has_standard_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runtime/docker-compose.yml");

        let mut compose = ComposeFile::default();
        compose
            .services
            .insert(Value::from("a"), Value::Mapping(Mapping::new()));
        write_compose_file(&path, &compose).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
