//! # Inventory & State
//!
//! Two files live under `inventory/`:
//!
//! - `vars.yaml` - user-maintained global variables, required, never written
//!   by the tool.
//! - `state.yaml` - tool-managed record of disabled services, created on
//!   first use, always rewritten as a whole with mode 0600.
//!
//! Older repositories kept `disabled_services` inside `vars.yaml`; those
//! entries are merged into the state file (set-union) and an advisory is
//! printed, but the legacy key is left for the user to remove.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::paths::{RepoLayout, SECURE_FILE_MODE};

/// Loads `inventory/vars.yaml`. A missing file is fatal.
pub fn load_vars(layout: &RepoLayout) -> Result<Mapping> {
    let path = layout.inventory_vars();
    let data = fs::read_to_string(&path).map_err(|err| Error::InventoryParse {
        path: path.clone(),
        detail: format!("failed to read: {err}"),
    })?;

    let vars: Option<Mapping> =
        serde_yaml::from_str(&data).map_err(|err| Error::InventoryParse {
            path: path.clone(),
            detail: format!("failed to parse: {err}"),
        })?;

    Ok(vars.unwrap_or_default())
}

/// The tool-managed state record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub disabled_services: Vec<String>,
}

/// Loads `inventory/state.yaml`, creating an empty record if missing.
pub fn load_state(layout: &RepoLayout) -> Result<State> {
    let path = layout.inventory_state();

    let data = match fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let state = State::default();
            write_state(layout, &state)?;
            return Ok(state);
        }
        Err(err) => {
            return Err(Error::StateIo {
                detail: format!("failed to read {}: {err}", path.display()),
            })
        }
    };

    let state: Option<State> = serde_yaml::from_str(&data).map_err(|err| Error::StateIo {
        detail: format!("failed to parse {}: {err}", path.display()),
    })?;

    Ok(state.unwrap_or_default())
}

/// Rewrites `inventory/state.yaml` with mode 0600. Marshalling is
/// deterministic: the list is persisted in its in-memory order.
pub fn write_state(layout: &RepoLayout, state: &State) -> Result<()> {
    let path = layout.inventory_state();
    let data = serde_yaml::to_string(state).map_err(|err| Error::StateIo {
        detail: format!("failed to marshal state: {err}"),
    })?;

    fs::write(&path, data).map_err(|err| Error::StateIo {
        detail: format!("failed to write {}: {err}", path.display()),
    })?;
    fs::set_permissions(&path, fs::Permissions::from_mode(SECURE_FILE_MODE)).map_err(|err| {
        Error::StateIo {
            detail: format!("failed to set permissions on {}: {err}", path.display()),
        }
    })?;

    Ok(())
}

/// The currently disabled service names.
pub fn disabled_services(layout: &RepoLayout) -> Result<Vec<String>> {
    Ok(load_state(layout)?.disabled_services)
}

/// Adds a service to the disabled list. Fails if already present.
pub fn disable_service(layout: &RepoLayout, service: &str) -> Result<()> {
    let mut state = load_state(layout)?;

    if state.disabled_services.iter().any(|s| s == service) {
        return Err(Error::ServiceAlreadyDisabled {
            service: service.to_string(),
        });
    }

    state.disabled_services.push(service.to_string());
    write_state(layout, &state)
}

/// Removes a service from the disabled list. Fails if not present.
pub fn enable_service(layout: &RepoLayout, service: &str) -> Result<()> {
    let mut state = load_state(layout)?;

    let before = state.disabled_services.len();
    state.disabled_services.retain(|s| s != service);
    if state.disabled_services.len() == before {
        return Err(Error::ServiceNotDisabled {
            service: service.to_string(),
        });
    }

    write_state(layout, &state)
}

/// One-time migration: merge a legacy `disabled_services` key from
/// `vars.yaml` into the state file (set-union). The legacy key is *not*
/// removed from the inventory; an advisory tells the user to do that.
pub fn migrate_legacy_disabled_services(layout: &RepoLayout) -> Result<()> {
    let vars = load_vars(layout)?;

    let legacy = match vars.get(&Value::from("disabled_services")) {
        Some(Value::Sequence(entries)) => entries,
        _ => return Ok(()),
    };

    let mut state = load_state(layout)?;
    for entry in legacy {
        if let Some(service) = entry.as_str() {
            if !state.disabled_services.iter().any(|s| s == service) {
                state.disabled_services.push(service.to_string());
            }
        }
    }
    write_state(layout, &state)?;

    warn!("migrated disabled_services from vars.yaml to state.yaml");
    warn!("you can now manually remove 'disabled_services:' from inventory/vars.yaml");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> (TempDir, RepoLayout) {
        let dir = TempDir::new().unwrap();
        let layout = RepoLayout::new(dir.path());
        fs::create_dir_all(layout.inventory_dir()).unwrap();
        (dir, layout)
    }

    #[test]
    fn missing_vars_file_is_fatal() {
        let (_dir, layout) = layout();
        assert!(matches!(
            load_vars(&layout),
            Err(Error::InventoryParse { .. })
        ));
    }

    #[test]
    fn empty_vars_file_loads_as_empty_mapping() {
        let (_dir, layout) = layout();
        fs::write(layout.inventory_vars(), "# nothing here\n").unwrap();
        assert!(load_vars(&layout).unwrap().is_empty());
    }

    #[test]
    fn missing_state_is_created_empty_with_0600() {
        let (_dir, layout) = layout();
        let state = load_state(&layout).unwrap();
        assert!(state.disabled_services.is_empty());

        let meta = fs::metadata(layout.inventory_state()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn disable_then_enable_roundtrips() {
        let (_dir, layout) = layout();

        disable_service(&layout, "loki").unwrap();
        assert_eq!(disabled_services(&layout).unwrap(), vec!["loki"]);

        enable_service(&layout, "loki").unwrap();
        assert!(disabled_services(&layout).unwrap().is_empty());
    }

    #[test]
    fn double_disable_fails_and_leaves_state_unchanged() {
        let (_dir, layout) = layout();
        disable_service(&layout, "loki").unwrap();

        assert!(matches!(
            disable_service(&layout, "loki"),
            Err(Error::ServiceAlreadyDisabled { .. })
        ));
        assert_eq!(disabled_services(&layout).unwrap(), vec!["loki"]);
    }

    #[test]
    fn enable_of_not_disabled_service_fails() {
        let (_dir, layout) = layout();
        assert!(matches!(
            enable_service(&layout, "loki"),
            Err(Error::ServiceNotDisabled { .. })
        ));
    }

    #[test]
    fn legacy_disabled_services_are_merged_not_duplicated() {
        let (_dir, layout) = layout();
        fs::write(
            layout.inventory_vars(),
            "domain: ex.local\ndisabled_services: [loki, grafana]\n",
        )
        .unwrap();
        write_state(
            &layout,
            &State {
                disabled_services: vec!["loki".to_string()],
            },
        )
        .unwrap();

        migrate_legacy_disabled_services(&layout).unwrap();

        assert_eq!(
            disabled_services(&layout).unwrap(),
            vec!["loki", "grafana"]
        );

        // The legacy key stays in vars.yaml for the user to remove.
        let vars = load_vars(&layout).unwrap();
        assert!(vars.contains_key(&Value::from("disabled_services")));
    }

    #[test]
    fn migration_without_legacy_key_is_a_noop() {
        let (_dir, layout) = layout();
        fs::write(layout.inventory_vars(), "domain: ex.local\n").unwrap();

        migrate_legacy_disabled_services(&layout).unwrap();
        assert!(disabled_services(&layout).unwrap().is_empty());
    }
}
