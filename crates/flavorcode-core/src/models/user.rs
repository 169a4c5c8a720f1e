use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub slack_id: String,
    pub display_name: String,
    pub avatar: String,
    #[serde(default)]
    pub project_ids: Vec<u64>,
    pub cookies: Option<i64>,
}
