//! First-run and re-configuration flow.
//!
//! ```text
//! NeedCredential -> NeedUser -> ChooseProjectMode -> CreateProject         -> Ready
//!                                                 -> ChooseExistingProject -> Ready
//! ```
//!
//! Keys that are already stored (credential, user id) are not asked for again,
//! so running the flow twice only redoes the project choice.

use futures::TryStreamExt;

use crate::api::{ApiClient, ApiError, Credential};
use crate::constants::PROJECTS_PAGE_URL;
use crate::events::{CoreEvent, EventBus};
use crate::models::{Project, ProjectFields, ProjectPatch, User};
use crate::settings::SettingsError;
use crate::ui::{InputRequest, Prompter};

pub const CREATE_NEW_LABEL: &str = "create new Project";
pub const CHOOSE_EXISTING_LABEL: &str = "choose existing Project";

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    NeedCredential,
    NeedUser,
    ChooseProjectMode,
    CreateProject,
    ChooseExistingProject,
    Ready,
}

#[derive(Debug)]
pub enum SetupOutcome {
    Ready { project_id: u64 },
    /// The user dismissed a prompt. Nothing is reported.
    Aborted { at: SetupState },
    /// A step failed; the message has already been shown to the user.
    Failed { at: SetupState, error: SetupError },
}

pub struct SetupFlow<'a> {
    client: &'a ApiClient,
    bus: &'a EventBus,
    prompter: &'a dyn Prompter,
    state: SetupState,
    explicit: Option<Credential>,
    credential: Option<Credential>,
    user: Option<User>,
    project_id: Option<u64>,
}

impl<'a> SetupFlow<'a> {
    pub fn new(client: &'a ApiClient, bus: &'a EventBus, prompter: &'a dyn Prompter) -> Self {
        Self {
            client,
            bus,
            prompter,
            state: SetupState::NeedCredential,
            explicit: None,
            credential: None,
            user: None,
            project_id: None,
        }
    }

    /// Use (and store) this credential instead of the stored one
    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.explicit = credential;
        self
    }

    pub async fn run(mut self) -> SetupOutcome {
        loop {
            if self.state == SetupState::Ready {
                if let Some(project_id) = self.project_id {
                    tracing::info!("Setup complete, project {}", project_id);
                    self.bus.publish(CoreEvent::ProjectSelected { project_id });
                    return SetupOutcome::Ready { project_id };
                }
            }

            let at = self.state;
            match self.step().await {
                Ok(Some(next)) => {
                    tracing::debug!("Setup {:?} -> {:?}", at, next);
                    self.state = next;
                }
                Ok(None) => {
                    tracing::info!("Setup aborted at {:?}", at);
                    return SetupOutcome::Aborted { at };
                }
                Err(error) => {
                    tracing::warn!("Setup failed at {:?}: {}", at, error);
                    self.prompter.error(&error.to_string());
                    return SetupOutcome::Failed { at, error };
                }
            }
        }
    }

    /// Run the current state. `Ok(None)` means the user backed out.
    pub async fn step(&mut self) -> Result<Option<SetupState>, SetupError> {
        match self.state {
            SetupState::NeedCredential => self.need_credential().await,
            SetupState::NeedUser => self.need_user().await,
            SetupState::ChooseProjectMode => self.choose_mode().await,
            SetupState::CreateProject => self.create_project().await,
            SetupState::ChooseExistingProject => self.choose_existing().await,
            SetupState::Ready => Ok(Some(SetupState::ChooseProjectMode)),
        }
    }

    fn credential(&self) -> Result<&Credential, SetupError> {
        self.credential
            .as_ref()
            .ok_or(SetupError::Api(ApiError::MissingCredential))
    }

    async fn need_credential(&mut self) -> Result<Option<SetupState>, SetupError> {
        let settings = self.client.settings();

        if let Some(cred) = self.explicit.take() {
            settings.set_api_key(cred.expose())?;
            self.credential = Some(cred);
            return Ok(Some(SetupState::NeedUser));
        }

        if let Some(cred) = settings.api_key()?.as_deref().and_then(Credential::new) {
            self.credential = Some(cred);
            return Ok(Some(SetupState::NeedUser));
        }

        let request = InputRequest::new("Go into the Flavortown settings and copy your api key")
            .placeholder("your Flavortown api key from the website");
        let answer = self.prompter.input(request).await;
        let Some(cred) = answer.as_deref().and_then(Credential::new) else {
            return Ok(None);
        };

        settings.set_api_key(cred.expose())?;
        self.credential = Some(cred);
        Ok(Some(SetupState::NeedUser))
    }

    async fn need_user(&mut self) -> Result<Option<SetupState>, SetupError> {
        let user = self.client.current_user(self.credential()?).await?;

        let settings = self.client.settings();
        if settings.user_id()?.is_none() {
            settings.set_user_id(user.id)?;
        }

        self.user = Some(user);
        Ok(Some(SetupState::ChooseProjectMode))
    }

    async fn choose_mode(&mut self) -> Result<Option<SetupState>, SetupError> {
        let choices = [CREATE_NEW_LABEL.to_string(), CHOOSE_EXISTING_LABEL.to_string()];
        let next = match self
            .prompter
            .pick("Do you want to create a new project or an existing one?", &choices)
            .await
        {
            Some(0) => SetupState::CreateProject,
            Some(_) => SetupState::ChooseExistingProject,
            None => return Ok(None),
        };
        Ok(Some(next))
    }

    async fn create_project(&mut self) -> Result<Option<SetupState>, SetupError> {
        let Some(fields) = prompt_new_project(self.prompter).await else {
            return Ok(None);
        };

        let project = self
            .client
            .create_project(self.credential()?, &fields, true)
            .await?;
        self.project_id = Some(project.id);
        self.bus.publish(CoreEvent::ProjectUpdated { project });
        Ok(Some(SetupState::Ready))
    }

    async fn choose_existing(&mut self) -> Result<Option<SetupState>, SetupError> {
        let Some(user) = self.user.as_ref() else {
            return Ok(Some(SetupState::NeedUser));
        };

        if user.project_ids.is_empty() {
            self.prompter
                .info(&format!("{} has no projects yet, creating a new one.", user.display_name));
            return Ok(Some(SetupState::CreateProject));
        }

        self.prompter.info(&format!(
            "Fetching projects for {}, this may take a while.",
            user.display_name
        ));

        let cred = self.credential()?;
        let projects: Vec<Project> = self
            .client
            .owned_projects(cred, &user.project_ids)
            .try_collect()
            .await?;

        let labels: Vec<String> = projects.iter().map(|p| p.title.clone()).collect();
        let Some(index) = self.prompter.pick("Choose Flavortown project", &labels).await else {
            return Ok(None);
        };
        let Some(project) = projects.get(index) else {
            return Ok(None);
        };

        self.client.settings().set_project_id(project.id)?;
        self.project_id = Some(project.id);
        Ok(Some(SetupState::Ready))
    }
}

fn hackatime_hint() -> String {
    format!(
        "Please set the Hackatime project manually on the Flavortown website ({}) \
         as the api doesn't support it.",
        PROJECTS_PAGE_URL
    )
}

/// Ask for a required value; blank or dismissed gives `None`
async fn required(prompter: &dyn Prompter, request: InputRequest) -> Option<String> {
    prompter
        .input(request)
        .await
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Ask for an optional value. `Err(())` when dismissed, `Ok(None)` when left blank.
async fn optional(prompter: &dyn Prompter, request: InputRequest) -> Result<Option<String>, ()> {
    let value = prompter.input(request).await.ok_or(())?;
    let value = value.trim().to_string();
    Ok((!value.is_empty()).then_some(value))
}

/// Form for a new project. Empty optional answers are left out of the request.
pub async fn prompt_new_project(prompter: &dyn Prompter) -> Option<ProjectFields> {
    prompter.info(&hackatime_hint());

    let title = required(prompter, InputRequest::new("Project title")).await?;
    let description = required(prompter, InputRequest::new("Project description")).await?;
    let demo_url = optional(prompter, InputRequest::new("Demo URL (optional)"))
        .await
        .ok()?;
    let repo_url = optional(prompter, InputRequest::new("Repository URL (optional)"))
        .await
        .ok()?;
    let ai_declaration = optional(prompter, InputRequest::new("AI declaration (optional)"))
        .await
        .ok()?;

    Some(ProjectFields {
        title,
        description,
        repo_url,
        demo_url,
        ai_declaration,
    })
}

fn non_blank(answer: &str) -> Option<String> {
    let answer = answer.trim();
    (!answer.is_empty()).then(|| answer.to_string())
}

/// Blank answer for a field that was never set stays unset
fn edited(answer: &str, current: Option<&str>) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() && current.is_none() {
        None
    } else {
        Some(answer.to_string())
    }
}

/// Form pre-filled with `current`. Only changed fields end up in the patch;
/// clearing an optional field sends it empty. A blank title or description
/// keeps the current one. Dismissing any prompt abandons the form.
pub async fn prompt_project_changes(
    prompter: &dyn Prompter,
    current: &Project,
) -> Option<ProjectPatch> {
    prompter.info(&hackatime_hint());

    let prefilled = |prompt: &str, value: Option<&str>| InputRequest::new(prompt).value(value);

    let title = prompter
        .input(prefilled("Project title", Some(current.title.as_str())))
        .await?;
    let description = prompter
        .input(prefilled("Project description", Some(current.description.as_str())))
        .await?;
    let demo_url = prompter
        .input(prefilled("Demo URL", current.demo_url.as_deref()))
        .await?;
    let repo_url = prompter
        .input(prefilled("Repository URL", current.repo_url.as_deref()))
        .await?;
    let ai_declaration = prompter
        .input(prefilled("AI declaration", current.ai_declaration.as_deref()))
        .await?;

    let patch = ProjectPatch {
        title: non_blank(&title),
        description: non_blank(&description),
        repo_url: edited(&repo_url, current.repo_url.as_deref()),
        demo_url: edited(&demo_url, current.demo_url.as_deref()),
        ai_declaration: edited(&ai_declaration, current.ai_declaration.as_deref()),
    };
    Some(patch.changes_from(current))
}
