//! Application-wide constants
//!
//! Centralized location for the remote service endpoints and the
//! identifiers the extension presents to the outside world.

/// Base URL of the Flavortown REST API
pub const API_BASE_URL: &str = "https://flavortown.hackclub.com/api/v1";

/// Project list on the website, where the Hackatime link is managed
pub const PROJECTS_PAGE_URL: &str = "https://flavortown.hackclub.com/projects";

/// Public project page prefix, used for presence buttons
pub const PROJECT_PAGE_URL: &str = "https://flavortown.hackclub.com/projects/";

/// Header attached to every API request so the server can attribute traffic
/// to this client in its telemetry.
pub const CLIENT_HEADER_NAME: &str = "X-Flavortown-Ext-11154";
pub const CLIENT_HEADER_VALUE: &str = "true";

/// Shown wherever a selected project is needed but none is usable
pub const NO_PROJECT_MESSAGE: &str =
    "No project set: please use the setup command to initialise the extension.";

/// Directory name under the platform config dir
pub const APP_DIR_NAME: &str = "flavorcode";

/// Process-wide settings file inside the data dir
pub const SETTINGS_FILE: &str = "settings.json";

/// Workspace-local config file, relative to the workspace root
pub const WORKSPACE_CONFIG_DIR: &str = ".vscode";
pub const WORKSPACE_CONFIG_FILE: &str = "flavorcode.config.json";

// Presence daemon
pub mod presence {
    use std::time::Duration;

    /// Application id registered with the presence daemon
    pub const CLIENT_ID: &str = "1469410921704194090";

    pub const LARGE_IMAGE_KEY: &str = "flavortown";
    pub const LARGE_IMAGE_TEXT: &str = "Flavortown";
    pub const BUTTON_LABEL: &str = "To the Project";

    pub const MAX_BUTTON_LABEL_LEN: usize = 32;
    pub const MAX_BUTTON_URL_LEN: usize = 512;

    /// How long the handshake may take before it counts as a connection timeout
    pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

    // Login retry policy
    pub const RETRY_BASE: Duration = Duration::from_secs(1);
    pub const RETRY_FACTOR: u32 = 2;
    pub const RETRY_CAP: Duration = Duration::from_secs(10);
    pub const MAX_RETRIES: u32 = 5;
}
