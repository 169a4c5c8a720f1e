//! Plain-text and JSON rendering of command results

use anyhow::Result;
use flavorcode_core::models::{Devlog, Pagination, Project, User};
use flavorcode_core::panels::{emojify, format_duration, DevlogEntry};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub pretty: bool,
}

impl Output {
    pub fn new(json: bool, pretty: bool) -> Self {
        // --pretty only makes sense for JSON, so it implies it
        Self {
            json: json || pretty,
            pretty,
        }
    }

    /// Print `value` as JSON, or `text` when not in JSON mode
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.pretty {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else if self.json {
            println!("{}", serde_json::to_string(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

pub fn user_text(user: &User) -> String {
    let mut out = format!("{} ({})\n", user.display_name, user.id);
    out.push_str(&format!("  slack:    {}\n", user.slack_id));
    out.push_str(&format!("  projects: {}\n", user.project_ids.len()));
    if let Some(cookies) = user.cookies {
        out.push_str(&format!("  cookies:  {}\n", cookies));
    }
    out.trim_end().to_string()
}

pub fn users_text(users: &[User], pagination: &Pagination) -> String {
    let mut out: Vec<String> = users
        .iter()
        .map(|u| format!("{:>8}  {}", u.id, u.display_name))
        .collect();
    out.push(pagination_text(pagination));
    out.join("\n")
}

pub fn project_text(project: &Project) -> String {
    [
        format!("{} ({})", project.title, project.id),
        project.description.clone(),
        String::new(),
        format!("  status:  {}", project.ship_status),
        format!("  devlogs: {}", project.devlog_count()),
        format!("  repo:    {}", or_dash(project.repo_url.as_deref())),
        format!("  demo:    {}", or_dash(project.demo_url.as_deref())),
        format!("  readme:  {}", or_dash(project.readme_url.as_deref())),
        format!("  ai:      {}", or_dash(project.ai_declaration.as_deref())),
    ]
    .join("\n")
}

pub fn projects_text(projects: &[Project], pagination: &Pagination) -> String {
    let mut out: Vec<String> = projects
        .iter()
        .map(|p| format!("{:>8}  {}", p.id, p.title))
        .collect();
    out.push(pagination_text(pagination));
    out.join("\n")
}

fn pagination_text(pagination: &Pagination) -> String {
    let mut line = format!(
        "page {}/{}, {} total",
        pagination.current_page, pagination.total_pages, pagination.total_count
    );
    if pagination.has_more() {
        line.push_str(" (first page only)");
    }
    line
}

pub fn devlog_entries_text(entries: &[DevlogEntry], pagination: &Pagination) -> String {
    if entries.is_empty() {
        return "No devlogs yet.".to_string();
    }
    let mut out: Vec<String> = entries
        .iter()
        .map(|e| format!("{:>8}  {}  ({})", e.devlog.id, e.label, e.description))
        .collect();
    out.push(pagination_text(pagination));
    out.join("\n")
}

pub fn devlog_text(devlog: &Devlog) -> String {
    let mut out = vec![
        format!("Devlog {}  {}", devlog.id, devlog.created_at.format("%Y-%m-%d %H:%M")),
        format!(
            "{} likes, {} comments, {}",
            devlog.likes_count,
            devlog.comments_count,
            format_duration(devlog.duration_seconds)
        ),
        String::new(),
        emojify(devlog.body.trim()),
    ];

    if !devlog.media.is_empty() {
        out.push(String::new());
        out.extend(devlog.media.iter().map(|m| format!("[{}] {}", m.content_type, m.url)));
    }

    if !devlog.comments.is_empty() {
        out.push(String::new());
        out.extend(
            devlog
                .comments
                .iter()
                .map(|c| format!("{}: {}", c.author.display_name, c.body)),
        );
    }

    out.join("\n")
}
