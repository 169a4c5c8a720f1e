//! Extension settings
//!
//! Every component reads and writes settings through the [`ConfigStore`]
//! contract, so the backend (process-wide settings file or workspace-local
//! config file) can be swapped without touching callers. [`Settings`] layers
//! typed accessors for the known keys on top of a store.

mod global;
mod workspace;

pub use global::GlobalSettingsStore;
pub use workspace::WorkspaceFileStore;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::CoreConfig;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unable to access {0}: not in config")]
    UnknownKey(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },
}

impl SettingsError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Key/value persistence shared by both settings backends.
///
/// A successful `set` must be visible to the next `get` of the same key.
pub trait ConfigStore: Send + Sync {
    /// Read a key. `Ok(None)` means the backend knows nothing about the key.
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError>;

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;

    /// File backing this store, for diagnostics
    fn location(&self) -> &Path;
}

/// The configuration surface exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    ApiKey,
    ProjectId,
    UserId,
    Theme,
    RichPresence,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::ApiKey,
        SettingKey::ProjectId,
        SettingKey::UserId,
        SettingKey::Theme,
        SettingKey::RichPresence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::ApiKey => "flavortownApiKey",
            SettingKey::ProjectId => "projectId",
            SettingKey::UserId => "userId",
            SettingKey::Theme => "theme",
            SettingKey::RichPresence => "discordRichPresence",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// Value a key holds before anything was written
    pub fn default_value(&self) -> Value {
        match self {
            SettingKey::ApiKey | SettingKey::UserId => Value::String(String::new()),
            SettingKey::ProjectId => Value::from(0u64),
            SettingKey::Theme => Value::String("default".to_string()),
            SettingKey::RichPresence => Value::Bool(false),
        }
    }

    /// Convert a raw string (e.g. from the command line) into the key's JSON type
    pub fn parse_value(&self, raw: &str) -> Result<Value, SettingsError> {
        let invalid = |expected| SettingsError::InvalidValue {
            key: self.name().to_string(),
            expected,
        };
        match self {
            SettingKey::ApiKey => Ok(Value::String(raw.trim().to_string())),
            SettingKey::Theme => Ok(Value::String(raw.to_string())),
            SettingKey::ProjectId | SettingKey::UserId => raw
                .trim()
                .parse::<u64>()
                .map(Value::from)
                .map_err(|_| invalid("a numeric id")),
            SettingKey::RichPresence => match raw.trim() {
                "true" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid("true or false")),
            },
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Typed view over a [`ConfigStore`]
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn ConfigStore>,
}

impl Settings {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// Pick the backend described by `config`: the workspace file when a
    /// workspace root is set, the process-wide settings file otherwise.
    pub fn from_config(config: &CoreConfig) -> Result<Self, SettingsError> {
        let store: Arc<dyn ConfigStore> = match &config.workspace_root {
            Some(root) => Arc::new(WorkspaceFileStore::new(root)),
            None => Arc::new(GlobalSettingsStore::open(config.settings_path())?),
        };
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    pub fn get(&self, key: SettingKey) -> Result<Option<Value>, SettingsError> {
        self.store.get(key.name())
    }

    pub fn set<V: Serialize>(&self, key: SettingKey, value: V) -> Result<(), SettingsError> {
        let value = serde_json::to_value(value).map_err(|_| SettingsError::InvalidValue {
            key: key.name().to_string(),
            expected: "a JSON value",
        })?;
        self.store.set(key.name(), value)
    }

    /// Stored credential, `None` when unset or blank
    pub fn api_key(&self) -> Result<Option<String>, SettingsError> {
        Ok(self
            .get(SettingKey::ApiKey)?
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|key| !key.trim().is_empty()))
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<(), SettingsError> {
        self.set(SettingKey::ApiKey, api_key)
    }

    /// Selected project, `None` when unset or `0`
    pub fn project_id(&self) -> Result<Option<u64>, SettingsError> {
        Ok(self.get(SettingKey::ProjectId)?.as_ref().and_then(parse_id))
    }

    pub fn set_project_id(&self, project_id: u64) -> Result<(), SettingsError> {
        self.set(SettingKey::ProjectId, project_id)
    }

    pub fn user_id(&self) -> Result<Option<u64>, SettingsError> {
        Ok(self.get(SettingKey::UserId)?.as_ref().and_then(parse_id))
    }

    pub fn set_user_id(&self, user_id: u64) -> Result<(), SettingsError> {
        self.set(SettingKey::UserId, user_id)
    }

    pub fn theme(&self) -> Result<String, SettingsError> {
        Ok(self
            .get(SettingKey::Theme)?
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|theme| !theme.is_empty())
            .unwrap_or_else(|| "default".to_string()))
    }

    pub fn set_theme(&self, theme: &str) -> Result<(), SettingsError> {
        self.set(SettingKey::Theme, theme)
    }

    pub fn presence_enabled(&self) -> Result<bool, SettingsError> {
        Ok(self
            .get(SettingKey::RichPresence)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

/// Ids have been persisted both as numbers and as strings; `0`, blanks and
/// placeholders such as "your username" count as unset.
fn parse_id(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    id.filter(|id| *id != 0)
}

/// Parse a settings file, which must hold a single JSON object
pub(crate) fn parse_object(
    path: &Path,
    contents: &str,
) -> Result<Map<String, Value>, SettingsError> {
    let parse_err = |source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };
    match serde_json::from_str::<Value>(contents).map_err(parse_err)? {
        Value::Object(map) => Ok(map),
        other => Err(parse_err(serde::de::Error::custom(format!(
            "expected a JSON object, found {}",
            json_type(&other)
        )))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Write JSON via temp file + rename so a crash never leaves a half-written file
pub(crate) fn write_json_atomic(path: &Path, value: &Value) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| SettingsError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "settings.json".to_string());
    let temp = path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));

    std::fs::write(&temp, json).map_err(|e| SettingsError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        SettingsError::io(path, e)
    })
}
