use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::{parse_object, write_json_atomic, ConfigStore, SettingKey, SettingsError};

/// Process-wide settings stored as a flat JSON object in the user's config dir.
///
/// Every `get` reads the file so writes from other running instances are
/// picked up; every `set` writes through immediately. Keys outside the
/// settings schema read as missing and cannot be written.
pub struct GlobalSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl GlobalSettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    fn load(&self) -> Result<Map<String, Value>, SettingsError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(SettingsError::io(&self.path, e)),
        };

        parse_object(&self.path, &contents)
    }
}

impl ConfigStore for GlobalSettingsStore {
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        let values = self.load()?;
        if let Some(value) = values.get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(SettingKey::from_name(key).map(|k| k.default_value()))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        if SettingKey::from_name(key).is_none() {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }

        let _guard = self.write_lock.lock();
        let mut values = self.load()?;
        values.insert(key.to_string(), value);
        write_json_atomic(&self.path, &Value::Object(values))?;
        tracing::debug!("Saved setting {} to {}", key, self.path.display());
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
