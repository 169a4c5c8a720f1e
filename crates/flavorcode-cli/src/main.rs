use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use flavorcode_cli::cli::{run_command, CliCommand, Context, Output, TerminalPrompter};
use flavorcode_core::models::{ProjectFields, ProjectPatch};
use flavorcode_core::{CoreConfig, Workspace};

#[derive(Parser)]
#[command(name = "flavorcode")]
#[command(about = "Manage your Flavortown projects and devlogs")]
struct Cli {
    /// Flavortown api key; overrides the stored one
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Use <DIR>/.vscode/flavorcode.config.json instead of the global settings
    #[arg(long, short = 'w', global = true)]
    workspace: Option<PathBuf>,

    /// Print JSON output
    #[arg(long, global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set api key, user and current project
    Setup,

    /// Show the user the api key belongs to
    Whoami,

    #[command(subcommand)]
    Users(UsersCommand),

    #[command(subcommand)]
    Projects(ProjectsCommand),

    #[command(subcommand)]
    Devlogs(DevlogsCommand),

    #[command(subcommand)]
    Config(ConfigCommand),

    /// Show the theme, or set it
    Theme { name: Option<String> },

    /// Show the current project in Discord until Ctrl-C
    Presence {
        /// Connect even when discordRichPresence is off
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List users (first page)
    List,
}

#[derive(Subcommand)]
enum ProjectsCommand {
    /// List projects (first page)
    List,

    /// Show a project, the current one by default
    Show { id: Option<u64> },

    /// Create a project; asks interactively without --title
    Create {
        #[command(flatten)]
        fields: NewProjectArgs,

        /// Keep the current project selected
        #[arg(long)]
        no_select: bool,
    },

    /// Update the current project; asks interactively without field flags
    Update {
        #[command(flatten)]
        fields: ProjectArgs,
    },

    /// Make a project the current one
    Select { id: u64 },
}

#[derive(Subcommand)]
enum DevlogsCommand {
    /// Devlogs of the current project
    List,

    /// Show one devlog
    Show { id: u64 },
}

#[derive(Subcommand)]
enum ConfigCommand {
    Get { key: String },
    Set { key: String, value: String },
    /// Print where settings are stored
    Path,
}

#[derive(Args)]
struct NewProjectArgs {
    #[arg(long, requires = "description")]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    repo_url: Option<String>,
    #[arg(long)]
    demo_url: Option<String>,
    #[arg(long)]
    ai_declaration: Option<String>,
}

impl NewProjectArgs {
    fn into_fields(self) -> Option<ProjectFields> {
        Some(ProjectFields {
            title: self.title?,
            description: self.description?,
            repo_url: self.repo_url,
            demo_url: self.demo_url,
            ai_declaration: self.ai_declaration,
        })
    }
}

#[derive(Args)]
struct ProjectArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    repo_url: Option<String>,
    #[arg(long)]
    demo_url: Option<String>,
    #[arg(long)]
    ai_declaration: Option<String>,
}

impl ProjectArgs {
    fn into_patch(self) -> Option<ProjectPatch> {
        let patch = ProjectPatch {
            title: self.title,
            description: self.description,
            repo_url: self.repo_url,
            demo_url: self.demo_url,
            ai_declaration: self.ai_declaration,
        };
        (!patch.is_empty()).then_some(patch)
    }
}

impl From<Commands> for CliCommand {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Setup => CliCommand::Setup,
            Commands::Whoami => CliCommand::Whoami,
            Commands::Users(UsersCommand::List) => CliCommand::ListUsers,
            Commands::Projects(ProjectsCommand::List) => CliCommand::ListProjects,
            Commands::Projects(ProjectsCommand::Show { id }) => CliCommand::ShowProject { id },
            Commands::Projects(ProjectsCommand::Create { fields, no_select }) => {
                CliCommand::CreateProject {
                    fields: fields.into_fields(),
                    select: !no_select,
                }
            }
            Commands::Projects(ProjectsCommand::Update { fields }) => CliCommand::UpdateProject {
                patch: fields.into_patch(),
            },
            Commands::Projects(ProjectsCommand::Select { id }) => CliCommand::SelectProject { id },
            Commands::Devlogs(DevlogsCommand::List) => CliCommand::ListDevlogs,
            Commands::Devlogs(DevlogsCommand::Show { id }) => CliCommand::ShowDevlog { id },
            Commands::Config(ConfigCommand::Get { key }) => CliCommand::ConfigGet { key },
            Commands::Config(ConfigCommand::Set { key, value }) => {
                CliCommand::ConfigSet { key, value }
            }
            Commands::Config(ConfigCommand::Path) => CliCommand::ConfigPath,
            Commands::Theme { name } => CliCommand::Theme { name },
            Commands::Presence { force } => CliCommand::Presence { force },
        }
    }
}

#[tokio::main]
async fn main() {
    flavorcode_core::tracing_setup::init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = CoreConfig::default();
    if let Some(root) = &cli.workspace {
        config = config.with_workspace(root);
    }

    let workspace = Workspace::open(config).context("Failed to open settings")?;
    let ctx = Context {
        api_key: cli.api_key,
        output: Output::new(cli.json, cli.pretty),
        prompter: Arc::new(TerminalPrompter::stdio()),
    };

    run_command(&workspace, cli.command.into(), &ctx).await
}
