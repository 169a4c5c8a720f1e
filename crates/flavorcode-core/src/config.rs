use std::path::{Path, PathBuf};

use crate::constants::{API_BASE_URL, APP_DIR_NAME, SETTINGS_FILE};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Where the process-wide settings file lives
    pub data_dir: PathBuf,
    /// When set, settings are read from the workspace config file instead
    pub workspace_root: Option<PathBuf>,
    pub base_url: String,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            workspace_root: None,
            base_url: API_BASE_URL.to_string(),
        }
    }

    pub fn with_workspace<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.workspace_root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Platform config dir, falling back to `~/.flavorcode`
    pub fn default_data_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(format!(".{}", APP_DIR_NAME))
            })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(Self::default_data_dir())
    }
}
