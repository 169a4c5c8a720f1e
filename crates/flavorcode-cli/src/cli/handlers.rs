use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use flavorcode_core::constants::NO_PROJECT_MESSAGE;
use flavorcode_core::models::{Project, ProjectPatch};
use flavorcode_core::panels::PanelState;
use flavorcode_core::presence::PresenceNotifier;
use flavorcode_core::setup::{prompt_new_project, prompt_project_changes};
use flavorcode_core::{
    Credential, SettingKey, SettingsError, SetupOutcome, UserMessages, Workspace,
};
use serde_json::json;

use super::command::CliCommand;
use super::prompt::TerminalPrompter;
use super::render::{self, Output};

/// Everything a command needs besides the workspace
pub struct Context {
    /// `--api-key`, wins over the stored credential
    pub api_key: Option<String>,
    pub output: Output,
    pub prompter: Arc<TerminalPrompter>,
}

impl Context {
    fn credential(&self, workspace: &Workspace) -> Result<Credential> {
        Ok(workspace.credential(self.api_key.as_deref())?)
    }
}

pub async fn run_command(workspace: &Workspace, command: CliCommand, ctx: &Context) -> Result<()> {
    tracing::debug!("Running {:?}", command);
    match command {
        CliCommand::Setup => setup(workspace, ctx).await,
        CliCommand::Whoami => {
            let cred = ctx.credential(workspace)?;
            let user = workspace.client().current_user(&cred).await?;
            ctx.output.emit(&user, || render::user_text(&user))
        }
        CliCommand::ListUsers => {
            let cred = ctx.credential(workspace)?;
            let page = workspace.client().list_users(&cred).await?;
            ctx.output
                .emit(&page, || render::users_text(&page.items, &page.pagination))
        }
        CliCommand::ListProjects => {
            let cred = ctx.credential(workspace)?;
            let page = workspace.client().list_projects(&cred).await?;
            ctx.output
                .emit(&page, || render::projects_text(&page.items, &page.pagination))
        }
        CliCommand::ShowProject { id } => {
            let cred = ctx.credential(workspace)?;
            let project = match id {
                Some(id) => workspace.client().project(&cred, id).await?,
                None => selected_project(workspace, &cred).await?,
            };
            ctx.output.emit(&project, || render::project_text(&project))
        }
        CliCommand::CreateProject { fields, select } => {
            let fields = match fields {
                Some(fields) => fields,
                None => match prompt_new_project(ctx.prompter.as_ref()).await {
                    Some(fields) => fields,
                    None => return cancelled(ctx),
                },
            };
            let cred = ctx.credential(workspace)?;
            let project = workspace.create_project(&cred, &fields, select).await?;
            ctx.output.emit(&project, || render::project_text(&project))
        }
        CliCommand::UpdateProject { patch } => update_project(workspace, patch, ctx).await,
        CliCommand::SelectProject { id } => {
            let cred = ctx.credential(workspace)?;
            let project = workspace.select_project(&cred, id).await?;
            ctx.output.emit(&project, || {
                format!("Selected {} ({})", project.title, project.id)
            })
        }
        CliCommand::ListDevlogs => {
            let cred = ctx.credential(workspace)?;
            match workspace.devlog_panel(&cred).await? {
                PanelState::NeedsSetup => {
                    ctx.prompter.info(NO_PROJECT_MESSAGE);
                    Ok(())
                }
                PanelState::Devlogs {
                    project_id,
                    entries,
                    pagination,
                } => {
                    let devlogs: Vec<serde_json::Value> = entries
                        .iter()
                        .map(|e| {
                            json!({
                                "label": e.label,
                                "description": e.description,
                                "devlog": e.devlog,
                            })
                        })
                        .collect();
                    let value = json!({
                        "project_id": project_id,
                        "devlogs": devlogs,
                        "pagination": pagination,
                    });
                    ctx.output
                        .emit(&value, || render::devlog_entries_text(&entries, &pagination))
                }
            }
        }
        CliCommand::ShowDevlog { id } => {
            let cred = ctx.credential(workspace)?;
            let devlog = workspace.client().devlog(&cred, id).await?;
            ctx.output.emit(&devlog, || render::devlog_text(&devlog))
        }
        CliCommand::ConfigGet { key } => {
            let key = setting_key(&key)?;
            let value = workspace
                .settings()
                .get(key)?
                .unwrap_or_else(|| key.default_value());
            ctx.output.emit(&value, || match &value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        }
        CliCommand::ConfigSet { key, value } => {
            let key = setting_key(&key)?;
            let parsed = key.parse_value(&value)?;
            if key == SettingKey::Theme {
                workspace.set_theme(&value)?;
            } else {
                workspace.settings().set(key, &parsed)?;
            }
            ctx.output
                .emit(&json!({ key.name(): parsed }), || format!("{} = {}", key, parsed))
        }
        CliCommand::ConfigPath => {
            let path = workspace.settings().store().location().display().to_string();
            ctx.output.emit(&json!({ "path": path }), || path.clone())
        }
        CliCommand::Theme { name } => {
            if let Some(name) = name {
                workspace.set_theme(&name)?;
            }
            let theme = workspace.settings().theme()?;
            ctx.output.emit(&json!({ "theme": theme }), || theme.clone())
        }
        CliCommand::Presence { force } => presence(workspace, force, ctx).await,
    }
}

fn cancelled(ctx: &Context) -> Result<()> {
    ctx.prompter.info("Cancelled.");
    Ok(())
}

fn setting_key(name: &str) -> Result<SettingKey> {
    SettingKey::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = SettingKey::ALL.iter().map(|k| k.name()).collect();
        anyhow::anyhow!(
            "{} (known keys: {})",
            SettingsError::UnknownKey(name.to_string()),
            known.join(", ")
        )
    })
}

/// The selected project. A missing selection and a 404 both mean setup is needed.
async fn selected_project(workspace: &Workspace, cred: &Credential) -> Result<Project> {
    match workspace.current_project(cred).await {
        Ok(Some(project)) => Ok(project),
        Ok(None) => bail!(NO_PROJECT_MESSAGE),
        Err(e) if e.is_not_found() => bail!(NO_PROJECT_MESSAGE),
        Err(e) => Err(e.into()),
    }
}

async fn setup(workspace: &Workspace, ctx: &Context) -> Result<()> {
    let explicit = ctx.api_key.as_deref().and_then(Credential::new);
    let outcome = workspace
        .setup(ctx.prompter.as_ref())
        .with_credential(explicit)
        .run()
        .await;

    match setup_result(outcome)? {
        Some(project_id) => ctx.output.emit(&json!({ "project_id": project_id }), || {
            format!("Setup complete, project {} selected.", project_id)
        }),
        None => cancelled(ctx),
    }
}

/// The selected project id, or `None` when the user backed out. A failure was
/// already shown by the flow, so the error only carries where it stopped.
fn setup_result(outcome: SetupOutcome) -> Result<Option<u64>> {
    match outcome {
        SetupOutcome::Ready { project_id } => Ok(Some(project_id)),
        SetupOutcome::Aborted { .. } => Ok(None),
        SetupOutcome::Failed { at, error } => {
            tracing::debug!("Setup failed at {:?}: {:?}", at, error);
            bail!("Setup did not complete")
        }
    }
}

async fn update_project(
    workspace: &Workspace,
    patch: Option<ProjectPatch>,
    ctx: &Context,
) -> Result<()> {
    let cred = ctx.credential(workspace)?;
    let current = selected_project(workspace, &cred).await?;

    let patch = match patch {
        Some(patch) => patch,
        None => match prompt_project_changes(ctx.prompter.as_ref(), &current).await {
            Some(patch) => patch,
            None => return cancelled(ctx),
        },
    };

    if patch.is_empty() {
        ctx.prompter.info("Nothing to update.");
        return Ok(());
    }

    let project = workspace.update_project(&cred, current.id, &patch).await?;
    ctx.output.emit(&project, || render::project_text(&project))
}

async fn presence(workspace: &Workspace, force: bool, ctx: &Context) -> Result<()> {
    if !force && !workspace.settings().presence_enabled()? {
        bail!(
            "Discord rich presence is disabled: set {} to true or pass --force",
            SettingKey::RichPresence
        );
    }

    let cred = ctx.credential(workspace)?;
    let project = selected_project(workspace, &cred).await?;

    let ui: Arc<dyn UserMessages> = ctx.prompter.clone();
    let mut notifier = PresenceNotifier::discord(ui);
    notifier
        .connect(&project.title, project.id, project.devlog_count())
        .await;
    ctx.prompter.info(&format!(
        "Showing {} in Discord, press Ctrl-C to stop.",
        project.title
    ));

    let signal = tokio::signal::ctrl_c().await.context("Failed to wait for Ctrl-C");
    notifier.disconnect().await;
    signal
}

#[cfg(test)]
mod tests {
    use super::*;
    use flavorcode_core::setup::{SetupError, SetupState};
    use flavorcode_core::ApiError;

    #[test]
    fn test_setup_failure_is_not_repeated() {
        let outcome = SetupOutcome::Failed {
            at: SetupState::NeedUser,
            error: SetupError::Api(ApiError::Remote {
                action: "get User",
                status: 401,
                body: "unauthorized".to_string(),
            }),
        };

        let message = format!("{:#}", setup_result(outcome).unwrap_err());
        assert_eq!(message, "Setup did not complete");
    }

    #[test]
    fn test_setup_ready_and_aborted() {
        assert_eq!(
            setup_result(SetupOutcome::Ready { project_id: 5 }).unwrap(),
            Some(5)
        );
        let aborted = SetupOutcome::Aborted {
            at: SetupState::NeedCredential,
        };
        assert_eq!(setup_result(aborted).unwrap(), None);
    }
}
