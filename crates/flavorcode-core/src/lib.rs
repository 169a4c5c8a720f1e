pub mod api;
pub mod config;
pub mod constants;
pub mod events;
pub mod models;
pub mod panels;
pub mod presence;
pub mod settings;
pub mod setup;
pub mod tracing_setup;
pub mod ui;
pub mod workspace;

pub use api::{ApiClient, ApiError, Credential, ProjectDevlogs};
pub use config::CoreConfig;
pub use events::{CoreEvent, EventBus};
pub use settings::{ConfigStore, SettingKey, Settings, SettingsError};
pub use setup::{SetupFlow, SetupOutcome};
pub use ui::{InputRequest, Prompter, UserMessages};
pub use workspace::Workspace;
