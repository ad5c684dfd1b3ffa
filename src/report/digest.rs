// Digest rendering.
// Formats admins and stale repositories as plain text for stdout.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::github::{Commit, Member};

use super::queries::StaleRepository;

/// Emails GitHub substitutes for private addresses.
const NOREPLY_DOMAIN: &str = "noreply.github.com";

fn date_or_na(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "n/a".to_string())
}

fn commit_line(commit: &Commit) -> String {
    let author = commit.author.clone().unwrap_or_default();
    let name = author.name.as_deref().unwrap_or("unknown");
    match author.email.as_deref() {
        Some(email) if !email.is_empty() && !email.contains(NOREPLY_DOMAIN) => format!(
            "* {} - {} <{}>",
            commit.committed_date.to_rfc3339(),
            name,
            email
        ),
        _ => format!("* {} - {}", commit.committed_date.to_rfc3339(), name),
    }
}

/// Render the full digest.
pub fn render_digest(admins: &[Member], repos: &[StaleRepository]) -> String {
    render_admins(admins) + &render_repositories(repos)
}

pub fn render_admins(admins: &[Member]) -> String {
    let logins: Vec<&str> = admins.iter().map(|m| m.login.as_str()).collect();
    format!("Admins: {}\n\n", logins.join(", "))
}

pub fn render_repositories(repos: &[StaleRepository]) -> String {
    let mut out = String::new();

    for repo in repos {
        let _ = writeln!(out, "# {}", repo.name);
        let _ = writeln!(out, "_{}_", repo.description.as_deref().unwrap_or(""));
        let _ = writeln!(out);
        let _ = writeln!(out, "Last updated: {}", repo.updated_at.to_rfc3339());
        let _ = writeln!(out, "Last pushed: {}", date_or_na(repo.pushed_at));
        let _ = writeln!(out, "Latest release: {}", date_or_na(repo.latest_release));
        let _ = writeln!(out, "Last Commits:");
        for commit in &repo.last_commits {
            let _ = writeln!(out, "{}", commit_line(commit));
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Collaborators (assigned directly by name):");
        for collaborator in &repo.collaborators {
            let _ = writeln!(
                out,
                "* {} <{}, {}> - {}",
                collaborator.name.as_deref().unwrap_or(""),
                collaborator.login,
                collaborator.email.as_deref().unwrap_or(""),
                collaborator.permission
            );
        }
        let _ = writeln!(out);
    }

    out
}
