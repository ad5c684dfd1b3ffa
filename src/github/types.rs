// GitHub API response types.
// Defines structs for deserializing REST members and the stale repository GraphQL search.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account type discriminator (user or organization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OwnerType {
    #[default]
    User,
    Organization,
    Bot,
    #[serde(other)]
    Unknown,
}

/// Organization member as returned by `GET /orgs/{org}/members`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub login: String,
    #[serde(rename = "type", default)]
    pub owner_type: OwnerType,
    pub html_url: Option<String>,
}

/// Permission a collaborator holds on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepositoryPermission {
    Admin,
    Maintain,
    Write,
    Triage,
    Read,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for RepositoryPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepositoryPermission::Admin => "admin",
            RepositoryPermission::Maintain => "maintain",
            RepositoryPermission::Write => "write",
            RepositoryPermission::Triage => "triage",
            RepositoryPermission::Read => "read",
            RepositoryPermission::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// `data` of the stale repository search query.
#[derive(Debug, Clone, Deserialize)]
pub struct StaleSearch {
    pub search: SearchConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConnection {
    #[serde(default)]
    pub edges: Vec<SearchEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchEdge {
    pub node: Option<RepositoryNode>,
}

/// Repository fields selected by the search query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub latest_release: Option<Release>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_disabled: bool,
    pub default_branch_ref: Option<BranchRef>,
    pub collaborators: Option<CollaboratorConnection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    pub target: Option<CommitTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitTarget {
    pub history: Option<CommitHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitHistory {
    #[serde(default)]
    pub nodes: Vec<Commit>,
}

/// A commit on the default branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub committed_date: DateTime<Utc>,
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorConnection {
    #[serde(default)]
    pub edges: Vec<CollaboratorEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorEdge {
    pub permission: RepositoryPermission,
    pub node: UserNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserNode {
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}
