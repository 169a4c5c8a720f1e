//! Data behind the sidebar panels: the devlog list and its refresh rules.

use crate::api::{ApiClient, ApiError, Credential, ProjectDevlogs};
use crate::models::{Devlog, Pagination};

/// One row of the devlog list
#[derive(Debug, Clone, PartialEq)]
pub struct DevlogEntry {
    pub label: String,
    pub description: String,
    pub devlog: Devlog,
}

impl DevlogEntry {
    pub fn from_devlog(devlog: Devlog) -> Self {
        let label = headline(&devlog.body).unwrap_or_else(|| format!("Devlog {}", devlog.id));
        let description = format_duration(devlog.duration_seconds);
        Self {
            label,
            description,
            devlog,
        }
    }
}

/// First non-empty line of a devlog body, with markdown markers swapped for bullets
pub fn headline(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.replace(['#', '+'], "●"))
}

/// Replace `:shortcode:` sequences with the emoji they name; unknown codes stay as written
pub fn emojify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(':') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find(':') else {
            rest = &rest[start..];
            break;
        };
        match emoji_for(&after[..end]) {
            Some(emoji) => {
                out.push_str(emoji);
                rest = &after[end + 1..];
            }
            None => {
                out.push(':');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn emoji_for(code: &str) -> Option<&'static str> {
    let valid = !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'));
    if !valid {
        return None;
    }
    emojis::get_by_shortcode(code).map(|e| e.as_str())
}

pub fn format_duration(seconds: u64) -> String {
    if seconds < 3600 {
        format!("{} min; {} sec", seconds / 60, seconds % 60)
    } else {
        let rest = seconds % 3600;
        format!("{} h; {} min; {} sec", seconds / 3600, rest / 60, rest % 60)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelState {
    /// No usable project: either none is selected or the selected one is gone
    NeedsSetup,
    Devlogs {
        project_id: u64,
        entries: Vec<DevlogEntry>,
        pagination: Pagination,
    },
}

/// Refresh the devlog panel.
///
/// A 404 for the selected project is treated the same as "nothing selected":
/// the panel asks for setup instead of showing a raw error.
pub async fn load_devlog_panel(
    client: &ApiClient,
    cred: &Credential,
) -> Result<PanelState, ApiError> {
    match client.project_devlogs(cred).await {
        Ok(ProjectDevlogs::NotConfigured) => Ok(PanelState::NeedsSetup),
        Ok(ProjectDevlogs::Devlogs { project_id, page }) => Ok(PanelState::Devlogs {
            project_id,
            entries: page.items.into_iter().map(DevlogEntry::from_devlog).collect(),
            pagination: page.pagination,
        }),
        Err(e) if e.is_not_found() => {
            tracing::info!("Selected project not found, setup required");
            Ok(PanelState::NeedsSetup)
        }
        Err(e) => Err(e),
    }
}
