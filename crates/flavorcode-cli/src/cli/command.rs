use flavorcode_core::models::{ProjectFields, ProjectPatch};

/// A parsed user action, independent of how it was spelled on the command line
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Run the setup flow
    Setup,
    Whoami,
    ListUsers,
    ListProjects,
    /// Show a project; the selected one when `id` is `None`
    ShowProject { id: Option<u64> },
    /// `fields` is `None` when the interactive form should be used
    CreateProject { fields: Option<ProjectFields>, select: bool },
    /// `patch` is `None` when the interactive form should be used
    UpdateProject { patch: Option<ProjectPatch> },
    SelectProject { id: u64 },
    ListDevlogs,
    ShowDevlog { id: u64 },
    ConfigGet { key: String },
    ConfigSet { key: String, value: String },
    ConfigPath,
    Theme { name: Option<String> },
    Presence { force: bool },
}
