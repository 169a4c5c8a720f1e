use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Devlog {
    pub id: u64,
    pub body: String,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub scrapbook_url: Option<String>,
    // The single-devlog endpoint omits media
    #[serde(default)]
    pub media: Vec<DevlogMedia>,
    #[serde(default)]
    pub comments: Vec<DevlogComment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevlogMedia {
    pub url: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevlogComment {
    pub id: u64,
    pub author: CommentAuthor,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: u64,
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
}
