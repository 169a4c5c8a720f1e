//! Flavortown REST API client
//!
//! Every call authenticates with a bearer [`Credential`] and carries the
//! client-identifying header. Writes are sent form-url-encoded and include
//! only the fields that are present.

mod credential;
mod error;

pub use credential::Credential;
pub use error::ApiError;

use futures::stream::{self, Stream, StreamExt};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::constants::{CLIENT_HEADER_NAME, CLIENT_HEADER_VALUE};
use crate::models::{Devlog, Page, Pagination, Project, ProjectFields, ProjectPatch, User};
use crate::settings::Settings;

#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Vec<User>,
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    projects: Vec<Project>,
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct DevlogsResponse {
    devlogs: Vec<Devlog>,
    pagination: Pagination,
}

/// Result of listing the selected project's devlogs
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectDevlogs {
    /// No project selected yet; the user should run setup
    NotConfigured,
    Devlogs { project_id: u64, page: Page<Devlog> },
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    settings: Settings,
}

impl ApiClient {
    pub fn new(settings: Settings, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// An explicit non-blank credential wins; otherwise the stored one is used.
    pub fn resolve_credential(&self, explicit: Option<&str>) -> Result<Credential, ApiError> {
        if let Some(cred) = explicit.and_then(Credential::new) {
            return Ok(cred);
        }
        self.settings
            .api_key()?
            .as_deref()
            .and_then(Credential::new)
            .ok_or(ApiError::MissingCredential)
    }

    fn request(&self, method: Method, path: &str, cred: &Credential) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .bearer_auth(cred.expose())
            .header(CLIENT_HEADER_NAME, CLIENT_HEADER_VALUE)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &'static str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!("Could not read {} error body: {}", action, e);
                    String::new()
                }
            };
            tracing::debug!("{} returned {}", action, status);
            return Err(ApiError::Remote {
                action,
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            context: action,
            source,
        })
    }

    /// The user the credential belongs to
    pub async fn current_user(&self, cred: &Credential) -> Result<User, ApiError> {
        self.send(self.request(Method::GET, "users/me", cred), "get User")
            .await
    }

    pub async fn list_users(&self, cred: &Credential) -> Result<Page<User>, ApiError> {
        let response: UsersResponse = self
            .send(self.request(Method::GET, "users", cred), "get Users")
            .await?;
        Ok(Page {
            items: response.users,
            pagination: response.pagination,
        })
    }

    pub async fn project(&self, cred: &Credential, id: u64) -> Result<Project, ApiError> {
        self.send(
            self.request(Method::GET, &format!("projects/{}", id), cred),
            "get Project",
        )
        .await
    }

    pub async fn list_projects(&self, cred: &Credential) -> Result<Page<Project>, ApiError> {
        let response: ProjectsResponse = self
            .send(self.request(Method::GET, "projects", cred), "get Projects")
            .await?;
        Ok(Page {
            items: response.projects,
            pagination: response.pagination,
        })
    }

    /// Fetch the given projects one after another, in order.
    ///
    /// The stream is lazy: nothing is requested until it is polled, and each
    /// request starts only after the previous one finished.
    pub fn owned_projects<'a>(
        &'a self,
        cred: &'a Credential,
        ids: &'a [u64],
    ) -> impl Stream<Item = Result<Project, ApiError>> + 'a {
        stream::iter(ids.iter().copied()).then(move |id| self.project(cred, id))
    }

    /// Create a project. With `make_current` the new id becomes the selected project.
    pub async fn create_project(
        &self,
        cred: &Credential,
        fields: &ProjectFields,
        make_current: bool,
    ) -> Result<Project, ApiError> {
        let request = self
            .request(Method::POST, "projects", cred)
            .form(&fields.form_pairs());
        let project: Project = self.send(request, "create Project").await?;

        if make_current {
            self.settings.set_project_id(project.id)?;
            tracing::info!("Selected new project {} ({})", project.title, project.id);
        }

        Ok(project)
    }

    /// Patch a project; fields that are `None` are not sent and keep their value
    pub async fn update_project(
        &self,
        cred: &Credential,
        id: u64,
        patch: &ProjectPatch,
    ) -> Result<Project, ApiError> {
        let request = self
            .request(Method::PATCH, &format!("projects/{}", id), cred)
            .form(&patch.form_pairs());
        self.send(request, "update Project").await
    }

    /// Devlogs of the selected project. Does not touch the network when no
    /// project is selected.
    pub async fn project_devlogs(&self, cred: &Credential) -> Result<ProjectDevlogs, ApiError> {
        let Some(project_id) = self.settings.project_id()? else {
            return Ok(ProjectDevlogs::NotConfigured);
        };

        let response: DevlogsResponse = self
            .send(
                self.request(Method::GET, &format!("projects/{}/devlogs", project_id), cred),
                "get devlogs",
            )
            .await?;

        if response.pagination.has_more() {
            tracing::debug!(
                "Project {} has {} devlogs, showing first page only",
                project_id,
                response.pagination.total_count
            );
        }

        Ok(ProjectDevlogs::Devlogs {
            project_id,
            page: Page {
                items: response.devlogs,
                pagination: response.pagination,
            },
        })
    }

    pub async fn devlog(&self, cred: &Credential, id: u64) -> Result<Devlog, ApiError> {
        self.send(
            self.request(Method::GET, &format!("devlogs/{}", id), cred),
            "get devlog",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GlobalSettingsStore;
    use futures::TryStreamExt;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    const FORM: &str = "application/x-www-form-urlencoded";

    fn settings(dir: &TempDir) -> Settings {
        let store = GlobalSettingsStore::open(dir.path().join("settings.json")).unwrap();
        Settings::new(Arc::new(store))
    }

    fn client(server: &ServerGuard, dir: &TempDir) -> ApiClient {
        ApiClient::new(settings(dir), format!("{}/api/v1", server.url()))
    }

    fn cred() -> Credential {
        Credential::new("ft_key").unwrap()
    }

    fn project_json(id: u64, title: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "description": "desc",
            "repo_url": null,
            "demo_url": null,
            "readme_url": null,
            "ai_declaration": null,
            "ship_status": "draft",
            "devlog_ids": [],
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        })
    }

    fn pagination_json() -> serde_json::Value {
        json!({"current_page": 1, "total_pages": 1, "total_count": 1, "next_page": null})
    }

    #[test]
    fn test_explicit_credential_wins() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        settings.set_api_key("stored").unwrap();
        let client = ApiClient::new(settings, "http://unused");

        assert_eq!(client.resolve_credential(Some(" given ")).unwrap().expose(), "given");
        assert_eq!(client.resolve_credential(Some("   ")).unwrap().expose(), "stored");
        assert_eq!(client.resolve_credential(None).unwrap().expose(), "stored");
    }

    #[test]
    fn test_missing_credential() {
        let dir = TempDir::new().unwrap();
        let client = ApiClient::new(settings(&dir), "http://unused");

        assert!(matches!(
            client.resolve_credential(Some("")),
            Err(ApiError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn test_current_user_sends_auth_and_client_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/users/me")
            .match_header("authorization", "Bearer ft_key")
            .match_header("x-flavortown-ext-11154", "true")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": 3,
                    "slack_id": "U123",
                    "display_name": "ada",
                    "avatar": "https://a/3.png",
                    "project_ids": [5, 9],
                    "cookies": null
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let user = client(&server, &dir).current_user(&cred()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(user.display_name, "ada");
        assert_eq!(user.project_ids, vec![5, 9]);
        assert_eq!(user.cookies, None);
    }

    #[tokio::test]
    async fn test_not_found_surfaces_status_and_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/projects/77")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let err = client(&server, &dir).project(&cred(), 77).await.unwrap_err();

        assert!(err.is_not_found());
        match err {
            ApiError::Remote { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(body, "Not Found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_projects_keeps_pagination() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/projects")
            .with_status(200)
            .with_body(
                json!({
                    "projects": [project_json(1, "One"), project_json(2, "Two")],
                    "pagination": {
                        "current_page": 1,
                        "total_pages": 3,
                        "total_count": 42,
                        "next_page": 2
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let page = client(&server, &dir).list_projects(&cred()).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total_count, 42);
        assert!(page.pagination.has_more());
    }

    #[tokio::test]
    async fn test_list_users() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/users")
            .with_status(200)
            .with_body(
                json!({
                    "users": [{
                        "id": 1, "slack_id": "U1", "display_name": "grace",
                        "avatar": "", "project_ids": [], "cookies": 12
                    }],
                    "pagination": pagination_json()
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let page = client(&server, &dir).list_users(&cred()).await.unwrap();

        assert_eq!(page.items[0].cookies, Some(12));
        assert!(!page.pagination.has_more());
    }

    #[tokio::test]
    async fn test_create_project_omits_absent_fields_and_selects() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/projects")
            .match_header("content-type", FORM)
            .match_body(Matcher::Exact("title=Lamp&description=Bright&demo_url=".to_string()))
            .with_status(201)
            .with_body(project_json(31, "Lamp").to_string())
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = client(&server, &dir);
        let fields = ProjectFields {
            demo_url: Some(String::new()),
            ..ProjectFields::new("Lamp", "Bright")
        };

        let project = client.create_project(&cred(), &fields, true).await.unwrap();

        mock.assert_async().await;
        assert_eq!(project.id, 31);
        assert_eq!(client.settings().project_id().unwrap(), Some(31));
    }

    #[tokio::test]
    async fn test_create_project_without_make_current_keeps_selection() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/projects")
            .with_status(201)
            .with_body(project_json(32, "Side").to_string())
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = client(&server, &dir);
        client.settings().set_project_id(5).unwrap();

        client
            .create_project(&cred(), &ProjectFields::new("Side", "quest"), false)
            .await
            .unwrap();

        assert_eq!(client.settings().project_id().unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_failed_create_does_not_select() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/projects")
            .with_status(422)
            .with_body("title can't be blank")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = client(&server, &dir);

        let err = client
            .create_project(&cred(), &ProjectFields::new("", "x"), true)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert_eq!(client.settings().project_id().unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_project_sends_patch_with_present_fields_only() {
        let mut server = Server::new_async().await;
        let mut updated = project_json(5, "Lamp v2");
        updated["description"] = json!("desc");
        let mock = server
            .mock("PATCH", "/api/v1/projects/5")
            .match_header("content-type", FORM)
            .match_body(Matcher::Exact("title=Lamp+v2".to_string()))
            .with_status(200)
            .with_body(updated.to_string())
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let patch = ProjectPatch {
            title: Some("Lamp v2".to_string()),
            ..Default::default()
        };
        let project = client(&server, &dir)
            .update_project(&cred(), 5, &patch)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(project.title, "Lamp v2");
        assert_eq!(project.description, "desc");
    }

    #[tokio::test]
    async fn test_update_then_get_keeps_fields_not_sent() {
        let mut server = Server::new_async().await;
        let mut stored = project_json(5, "Lamp");
        stored["repo_url"] = json!("https://git/lamp");
        let stored = Arc::new(parking_lot::Mutex::new(stored));

        let on_patch = stored.clone();
        let patch_mock = server
            .mock("PATCH", "/api/v1/projects/5")
            .with_status(200)
            .with_body_from_request(move |request| {
                let form = String::from_utf8_lossy(request.body().unwrap()).into_owned();
                let mut project = on_patch.lock();
                for pair in form.split('&') {
                    if let Some((key, value)) = pair.split_once('=') {
                        project[key] = json!(value.replace('+', " "));
                    }
                }
                project.to_string().into_bytes()
            })
            .create_async()
            .await;
        let on_get = stored.clone();
        let get_mock = server
            .mock("GET", "/api/v1/projects/5")
            .with_status(200)
            .with_body_from_request(move |_| on_get.lock().to_string().into_bytes())
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = client(&server, &dir);
        let patch = ProjectPatch {
            title: Some("Lamp v2".to_string()),
            ..Default::default()
        };
        client.update_project(&cred(), 5, &patch).await.unwrap();
        let project = client.project(&cred(), 5).await.unwrap();

        patch_mock.assert_async().await;
        get_mock.assert_async().await;
        assert_eq!(project.title, "Lamp v2");
        assert_eq!(project.description, "desc");
        assert_eq!(project.repo_url.as_deref(), Some("https://git/lamp"));
        assert_eq!(project.demo_url, None);
    }

    #[tokio::test]
    async fn test_project_devlogs_without_selection_skips_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = client(&server, &dir);

        assert_eq!(
            client.project_devlogs(&cred()).await.unwrap(),
            ProjectDevlogs::NotConfigured
        );
        client.settings().set_project_id(0).unwrap();
        assert_eq!(
            client.project_devlogs(&cred()).await.unwrap(),
            ProjectDevlogs::NotConfigured
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_project_devlogs_for_selected_project() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/projects/5/devlogs")
            .with_status(200)
            .with_body(
                json!({
                    "devlogs": [{
                        "id": 70,
                        "body": "first light",
                        "comments_count": 0,
                        "likes_count": 2,
                        "duration_seconds": 600,
                        "scrapbook_url": null,
                        "created_at": "2026-01-03T00:00:00Z",
                        "updated_at": "2026-01-03T00:00:00Z",
                        "media": [{"url": "https://cdn/x.png", "content_type": "image/png"}],
                        "comments": []
                    }],
                    "pagination": pagination_json()
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = client(&server, &dir);
        client.settings().set_project_id(5).unwrap();

        match client.project_devlogs(&cred()).await.unwrap() {
            ProjectDevlogs::Devlogs { project_id, page } => {
                assert_eq!(project_id, 5);
                assert_eq!(page.items[0].media[0].content_type, "image/png");
            }
            ProjectDevlogs::NotConfigured => panic!("project is selected"),
        }
    }

    #[tokio::test]
    async fn test_owned_projects_fetches_in_order() {
        let mut server = Server::new_async().await;
        let mut mocks = Vec::new();
        for (id, title) in [(5, "Five"), (9, "Nine"), (2, "Two")] {
            mocks.push(
                server
                    .mock("GET", format!("/api/v1/projects/{}", id).as_str())
                    .with_status(200)
                    .with_body(project_json(id, title).to_string())
                    .expect(1)
                    .create_async()
                    .await,
            );
        }

        let dir = TempDir::new().unwrap();
        let client = client(&server, &dir);
        let credential = cred();
        let ids = [5, 9, 2];
        let projects: Vec<Project> = client
            .owned_projects(&credential, &ids)
            .try_collect()
            .await
            .unwrap();

        let titles: Vec<&str> = projects.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Five", "Nine", "Two"]);
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_decode_error_names_operation() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/devlogs/1")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let err = client(&server, &dir).devlog(&cred(), 1).await.unwrap_err();

        assert!(matches!(err, ApiError::Decode { context: "get devlog", .. }));
    }
}
