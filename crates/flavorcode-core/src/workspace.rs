//! One open workspace: its settings backend, API client and event bus.
//!
//! Mutations go through here so every successful change is announced on the
//! bus and the panels can refresh.

use crate::api::{ApiClient, ApiError, Credential};
use crate::config::CoreConfig;
use crate::events::{CoreEvent, EventBus};
use crate::models::{Project, ProjectFields, ProjectPatch};
use crate::panels::{self, PanelState};
use crate::settings::{Settings, SettingsError};
use crate::setup::SetupFlow;
use crate::ui::Prompter;

pub struct Workspace {
    config: CoreConfig,
    client: ApiClient,
    bus: EventBus,
}

impl Workspace {
    pub fn open(config: CoreConfig) -> Result<Self, SettingsError> {
        let settings = Settings::from_config(&config)?;
        let client = ApiClient::new(settings, config.base_url.clone());
        tracing::debug!(
            "Opened workspace, settings at {}",
            client.settings().store().location().display()
        );
        Ok(Self {
            config,
            client,
            bus: EventBus::new(),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn settings(&self) -> &Settings {
        self.client.settings()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn credential(&self, explicit: Option<&str>) -> Result<Credential, ApiError> {
        self.client.resolve_credential(explicit)
    }

    pub fn setup<'a>(&'a self, prompter: &'a dyn Prompter) -> SetupFlow<'a> {
        SetupFlow::new(&self.client, &self.bus, prompter)
    }

    /// The selected project; `None` when nothing is selected
    pub async fn current_project(&self, cred: &Credential) -> Result<Option<Project>, ApiError> {
        match self.settings().project_id()? {
            Some(id) => Ok(Some(self.client.project(cred, id).await?)),
            None => Ok(None),
        }
    }

    /// Make `project_id` the selected project after checking that it exists
    pub async fn select_project(
        &self,
        cred: &Credential,
        project_id: u64,
    ) -> Result<Project, ApiError> {
        let project = self.client.project(cred, project_id).await?;
        self.settings().set_project_id(project.id)?;
        tracing::info!("Selected project {} ({})", project.title, project.id);
        self.bus.publish(CoreEvent::ProjectSelected { project_id: project.id });
        Ok(project)
    }

    pub async fn create_project(
        &self,
        cred: &Credential,
        fields: &ProjectFields,
        make_current: bool,
    ) -> Result<Project, ApiError> {
        let project = self.client.create_project(cred, fields, make_current).await?;
        self.bus.publish(CoreEvent::ProjectUpdated { project: project.clone() });
        if make_current {
            self.bus.publish(CoreEvent::ProjectSelected { project_id: project.id });
        }
        Ok(project)
    }

    pub async fn update_project(
        &self,
        cred: &Credential,
        project_id: u64,
        patch: &ProjectPatch,
    ) -> Result<Project, ApiError> {
        let project = self.client.update_project(cred, project_id, patch).await?;
        self.bus.publish(CoreEvent::ProjectUpdated { project: project.clone() });
        Ok(project)
    }

    pub fn set_theme(&self, theme: &str) -> Result<(), SettingsError> {
        self.settings().set_theme(theme)?;
        self.bus.publish(CoreEvent::ThemeChanged { theme: theme.to_string() });
        Ok(())
    }

    pub async fn devlog_panel(&self, cred: &Credential) -> Result<PanelState, ApiError> {
        panels::load_devlog_panel(&self.client, cred).await
    }
}
