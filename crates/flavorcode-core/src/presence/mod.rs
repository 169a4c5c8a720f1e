//! Rich presence: shows the current project in the user's Discord status.
//!
//! The notifier owns at most one session. Logging in happens in a background
//! task with exponential backoff; status updates requested before the login
//! completes are kept as a single latest snapshot and pushed once it is ready.

mod discord;

pub use discord::DiscordIpc;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::constants::{presence as consts, PROJECT_PAGE_URL};
use crate::ui::UserMessages;

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    /// No daemon answered, or the handshake did not finish in time.
    /// This is the only failure the login loop retries.
    #[error("Could not connect to Discord (RPC_CONNECTION_TIMEOUT)")]
    ConnectionTimeout,

    #[error("Connection closed by Discord: {code} {message}")]
    Closed { code: i64, message: String },

    #[error("Discord rejected the request: {code} {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected IPC message: {0}")]
    Protocol(String),

    #[error("Not connected")]
    NotConnected,

    #[error("IPC error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid IPC payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl PresenceError {
    pub fn is_connection_timeout(&self) -> bool {
        matches!(self, PresenceError::ConnectionTimeout)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityAssets {
    pub large_image: String,
    pub large_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityButton {
    pub label: String,
    pub url: String,
}

/// Status payload, serialized in the shape the daemon expects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub details: String,
    pub state: String,
    pub assets: ActivityAssets,
    pub buttons: Vec<ActivityButton>,
}

impl Activity {
    pub fn for_project(title: &str, project_id: u64, devlog_count: usize) -> Self {
        let url = format!("{}{}", PROJECT_PAGE_URL, project_id);
        Self {
            details: format!("Working on: {}", title),
            state: format!("Devlogs so far: {}", devlog_count),
            assets: ActivityAssets {
                large_image: consts::LARGE_IMAGE_KEY.to_string(),
                large_text: consts::LARGE_IMAGE_TEXT.to_string(),
            },
            buttons: vec![ActivityButton {
                label: truncate_chars(consts::BUTTON_LABEL, consts::MAX_BUTTON_LABEL_LEN),
                url: truncate_chars(&url, consts::MAX_BUTTON_URL_LEN),
            }],
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Client side of the presence daemon connection
#[async_trait]
pub trait PresenceTransport: Send {
    async fn login(&mut self, client_id: &str) -> Result<(), PresenceError>;
    async fn set_activity(&mut self, activity: &Activity) -> Result<(), PresenceError>;
    async fn clear_activity(&mut self) -> Result<(), PresenceError>;
    async fn destroy(&mut self) -> Result<(), PresenceError>;
}

/// Builds a fresh transport for each session
pub type TransportFactory = Box<dyn Fn() -> Box<dyn PresenceTransport> + Send + Sync>;

/// Capped exponential backoff for login retries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: consts::RETRY_BASE,
            factor: consts::RETRY_FACTOR,
            cap: consts::RETRY_CAP,
            max_retries: consts::MAX_RETRIES,
        }
    }
}

impl BackoffPolicy {
    /// Delay before attempt `retry + 1`
    pub fn delay(&self, retry: u32) -> Duration {
        let multiplier = self.factor.checked_pow(retry).unwrap_or(u32::MAX);
        self.base.saturating_mul(multiplier).min(self.cap)
    }
}

struct SessionShared {
    transport: tokio::sync::Mutex<Box<dyn PresenceTransport>>,
    ready: AtomicBool,
    latest: parking_lot::Mutex<Option<Activity>>,
}

impl SessionShared {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Push the latest snapshot, if any. Failures go to the user.
    async fn push_latest(&self, ui: &dyn UserMessages) {
        let Some(activity) = self.latest.lock().clone() else {
            return;
        };
        let result = self.transport.lock().await.set_activity(&activity).await;
        if let Err(e) = result {
            tracing::warn!("Failed to set presence: {}", e);
            ui.error(&format!("Flavortown discord richpresence: {}", e));
        }
    }
}

struct PresenceSession {
    shared: Arc<SessionShared>,
    login_task: JoinHandle<()>,
}

pub struct PresenceNotifier {
    connector: TransportFactory,
    ui: Arc<dyn UserMessages>,
    client_id: String,
    policy: BackoffPolicy,
    session: Option<PresenceSession>,
}

impl PresenceNotifier {
    pub fn new(connector: TransportFactory, ui: Arc<dyn UserMessages>) -> Self {
        Self {
            connector,
            ui,
            client_id: consts::CLIENT_ID.to_string(),
            policy: BackoffPolicy::default(),
            session: None,
        }
    }

    /// Notifier talking to the local Discord client
    pub fn discord(ui: Arc<dyn UserMessages>) -> Self {
        let connector: TransportFactory =
            Box::new(|| Box::new(DiscordIpc::new()) as Box<dyn PresenceTransport>);
        Self::new(connector, ui)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.shared.is_ready())
    }

    /// Show `title` as the current project.
    ///
    /// The first call starts a session and logs in in the background. Later
    /// calls replace the pending snapshot, and update the status right away
    /// once the session is ready.
    pub async fn connect(&mut self, title: &str, project_id: u64, devlog_count: usize) {
        let activity = Activity::for_project(title, project_id, devlog_count);

        if let Some(session) = &self.session {
            *session.shared.latest.lock() = Some(activity);
            if session.shared.is_ready() {
                session.shared.push_latest(self.ui.as_ref()).await;
            }
            return;
        }

        tracing::debug!("Registering presence client {}", self.client_id);
        let shared = Arc::new(SessionShared {
            transport: tokio::sync::Mutex::new((self.connector)()),
            ready: AtomicBool::new(false),
            latest: parking_lot::Mutex::new(Some(activity)),
        });
        let login_task = tokio::spawn(login_with_backoff(
            shared.clone(),
            self.client_id.clone(),
            self.policy,
            self.ui.clone(),
        ));
        self.session = Some(PresenceSession { shared, login_task });
    }

    /// Clear the status and tear the session down. Teardown failures are
    /// logged and otherwise ignored. No-op without a session.
    pub async fn disconnect(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.login_task.abort();
        let _ = session.login_task.await;

        let mut transport = session.shared.transport.lock().await;
        if session.shared.is_ready() {
            if let Err(e) = transport.clear_activity().await {
                tracing::warn!("Failed to clear presence: {}", e);
            }
        }
        if let Err(e) = transport.destroy().await {
            tracing::warn!("Failed to close presence connection: {}", e);
        }
    }
}

async fn login_with_backoff(
    shared: Arc<SessionShared>,
    client_id: String,
    policy: BackoffPolicy,
    ui: Arc<dyn UserMessages>,
) {
    let mut retry = 0;
    loop {
        let result = shared.transport.lock().await.login(&client_id).await;
        match result {
            Ok(()) => break,
            Err(e) if e.is_connection_timeout() && retry < policy.max_retries => {
                let delay = policy.delay(retry);
                tracing::debug!("Presence login timed out, retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => {
                tracing::warn!("Presence login failed: {}", e);
                ui.error(&format!("Flavortown discord richpresence: {}", e));
                return;
            }
        }
    }

    shared.ready.store(true, Ordering::SeqCst);
    tracing::info!("Presence connected");
    shared.push_latest(ui.as_ref()).await;
}
