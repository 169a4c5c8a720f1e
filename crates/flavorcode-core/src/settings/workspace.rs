use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::{parse_object, write_json_atomic, ConfigStore, SettingsError};
use crate::constants::{WORKSPACE_CONFIG_DIR, WORKSPACE_CONFIG_FILE};

/// Template the workspace file is seeded from; it also defines the set of
/// keys this backend accepts.
const TEMPLATE: &str = include_str!("../../resources/flavorcode.config.json");

/// Settings kept in a JSON file inside the workspace
/// (`<root>/.vscode/flavorcode.config.json`).
///
/// The file is created from the bundled template on first access and is
/// re-read in full on every operation. There is no protection against
/// concurrent external edits: the last writer wins.
pub struct WorkspaceFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl WorkspaceFileStore {
    pub fn new(workspace_root: &Path) -> Self {
        Self {
            path: workspace_root
                .join(WORKSPACE_CONFIG_DIR)
                .join(WORKSPACE_CONFIG_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Create the file from the template if it does not exist yet
    fn ensure_file(&self) -> Result<(), SettingsError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
        }
        std::fs::write(&self.path, TEMPLATE).map_err(|e| SettingsError::io(&self.path, e))?;
        tracing::info!("Created workspace config {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<Map<String, Value>, SettingsError> {
        self.ensure_file()?;
        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| SettingsError::io(&self.path, e))?;
        parse_object(&self.path, &contents)
    }
}

impl ConfigStore for WorkspaceFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        let values = self.load()?;
        match values.get(key) {
            Some(value) => Ok(Some(value.clone())),
            None => Err(SettingsError::UnknownKey(key.to_string())),
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock();
        let mut values = self.load()?;
        match values.get_mut(key) {
            Some(slot) => *slot = value,
            None => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        write_json_atomic(&self.path, &Value::Object(values))
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingKey;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_template_defines_every_setting() {
        let template: Map<String, Value> = serde_json::from_str(TEMPLATE).unwrap();
        for key in SettingKey::ALL {
            assert_eq!(template.get(key.name()), Some(&key.default_value()));
        }
    }

    #[test]
    fn test_first_access_seeds_template() {
        let root = TempDir::new().unwrap();
        let store = WorkspaceFileStore::new(root.path());
        assert!(!store.location().exists());

        assert_eq!(store.get("theme").unwrap(), Some(json!("default")));
        assert!(root.path().join(".vscode/flavorcode.config.json").exists());
    }

    #[test]
    fn test_set_then_get_every_template_key() {
        let root = TempDir::new().unwrap();
        let store = WorkspaceFileStore::new(root.path());

        for (key, value) in [
            ("flavortownApiKey", json!("ft_abc")),
            ("projectId", json!(31)),
            ("userId", json!(8)),
            ("theme", json!("dark")),
            ("discordRichPresence", json!(true)),
        ] {
            store.set(key, value.clone()).unwrap();
            assert_eq!(store.get(key).unwrap(), Some(value));
        }
    }

    #[test]
    fn test_falsy_values_are_still_present() {
        let root = TempDir::new().unwrap();
        let store = WorkspaceFileStore::new(root.path());

        store.set("flavortownApiKey", json!("")).unwrap();
        assert_eq!(store.get("flavortownApiKey").unwrap(), Some(json!("")));
        assert_eq!(store.get("projectId").unwrap(), Some(json!(0)));
    }

    #[test]
    fn test_unknown_key_fails() {
        let root = TempDir::new().unwrap();
        let store = WorkspaceFileStore::new(root.path());

        assert!(matches!(
            store.get("flavortownProject"),
            Err(SettingsError::UnknownKey(_))
        ));
        assert!(matches!(
            store.set("flavortownProject", json!("5")),
            Err(SettingsError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(".vscode");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("flavorcode.config.json"),
            r#"{"flavortownApiKey": "kept", "projectId": 4}"#,
        )
        .unwrap();

        let store = WorkspaceFileStore::new(root.path());
        assert_eq!(store.get("flavortownApiKey").unwrap(), Some(json!("kept")));
        // Keys missing from an older file are unknown to this backend
        assert!(store.get("theme").is_err());
    }

    #[test]
    fn test_non_object_file_is_a_parse_error() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(".vscode");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("flavorcode.config.json"), "[1, 2]").unwrap();

        let store = WorkspaceFileStore::new(root.path());
        assert!(matches!(store.get("theme"), Err(SettingsError::Parse { .. })));
    }
}
