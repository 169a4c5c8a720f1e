use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub readme_url: Option<String>,
    pub ai_declaration: Option<String>,
    pub ship_status: String,
    #[serde(default)]
    pub devlog_ids: Vec<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn devlog_count(&self) -> usize {
        self.devlog_ids.len()
    }
}

/// Fields for creating a project.
///
/// `None` means "do not send"; `Some("")` is sent as an empty value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFields {
    pub title: String,
    pub description: String,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub ai_declaration: Option<String>,
}

impl ProjectFields {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Form body, in a stable order, containing only the fields that are present
    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("title", self.title.clone()),
            ("description", self.description.clone()),
        ];
        push_present(&mut pairs, "repo_url", &self.repo_url);
        push_present(&mut pairs, "demo_url", &self.demo_url);
        push_present(&mut pairs, "ai_declaration", &self.ai_declaration);
        pairs
    }
}

/// Partial update of a project. Every `None` field is left untouched on the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub ai_declaration: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.form_pairs().is_empty()
    }

    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_present(&mut pairs, "title", &self.title);
        push_present(&mut pairs, "description", &self.description);
        push_present(&mut pairs, "repo_url", &self.repo_url);
        push_present(&mut pairs, "demo_url", &self.demo_url);
        push_present(&mut pairs, "ai_declaration", &self.ai_declaration);
        pairs
    }

    /// Keep only the fields whose value differs from `current`
    pub fn changes_from(self, current: &Project) -> Self {
        fn changed(new: Option<String>, old: Option<&str>) -> Option<String> {
            new.filter(|value| Some(value.as_str()) != old)
        }

        Self {
            title: changed(self.title, Some(&current.title)),
            description: changed(self.description, Some(&current.description)),
            repo_url: changed(self.repo_url, current.repo_url.as_deref()),
            demo_url: changed(self.demo_url, current.demo_url.as_deref()),
            ai_declaration: changed(self.ai_declaration, current.ai_declaration.as_deref()),
        }
    }
}

impl From<ProjectFields> for ProjectPatch {
    fn from(fields: ProjectFields) -> Self {
        Self {
            title: Some(fields.title),
            description: Some(fields.description),
            repo_url: fields.repo_url,
            demo_url: fields.demo_url,
            ai_declaration: fields.ai_declaration,
        }
    }
}

fn push_present(
    pairs: &mut Vec<(&'static str, String)>,
    name: &'static str,
    value: &Option<String>,
) {
    if let Some(value) = value {
        pairs.push((name, value.clone()));
    }
}
