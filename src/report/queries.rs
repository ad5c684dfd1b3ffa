// Report data collection.
// Fetches organization admins over REST and stale repositories over GraphQL, through the cache.

use std::sync::LazyLock;

use chrono::{DateTime, Months, NaiveDate, Utc};
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{error, warn};

use crate::cache::CachingGateway;
use crate::error::{ReportError, Result};
use crate::github::{ApiClient, Commit, Member, RepositoryNode, RepositoryPermission, StaleSearch};

/// Largest page GitHub serves for organization members.
pub const ADMIN_PAGE_SIZE: u64 = 100;

/// Repositories returned by one search.
pub const STALE_REPO_LIMIT: u64 = 15;

const MEMBERS_ROUTE: &str = "GET /orgs/{org}/members";

static ORG_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9-]+$").unwrap());
static STALE_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

pub const STALE_REPOS_QUERY: &str = r#"
query stale_repos($search_query: String!, $limit: Int!) {
  search(query: $search_query, type: REPOSITORY, first: $limit) {
    edges {
      node {
        ... on Repository {
          name
          description
          updatedAt
          pushedAt
          latestRelease {
            createdAt
          }
          isArchived
          isDisabled
          defaultBranchRef {
            target {
              ... on Commit {
                history(first: 15) {
                  nodes {
                    ... on Commit {
                      committedDate
                      author {
                        name
                        email
                      }
                    }
                  }
                }
              }
            }
          }
          collaborators(affiliation: DIRECT) {
            edges {
              permissionSources {
                roleName
              }
              permission
              node {
                login
                name
                email
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// A repository with no pushes since the stale date.
#[derive(Debug, Clone)]
pub struct StaleRepository {
    pub name: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub latest_release: Option<DateTime<Utc>>,
    pub last_commits: Vec<Commit>,
    pub collaborators: Vec<Collaborator>,
}

/// A collaborator granted access to the repository directly.
#[derive(Debug, Clone)]
pub struct Collaborator {
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub permission: RepositoryPermission,
}

impl From<RepositoryNode> for StaleRepository {
    fn from(node: RepositoryNode) -> Self {
        let last_commits = node
            .default_branch_ref
            .and_then(|branch| branch.target)
            .and_then(|target| target.history)
            .map(|history| history.nodes)
            .unwrap_or_default();

        let collaborators = node
            .collaborators
            .map(|connection| connection.edges)
            .unwrap_or_default()
            .into_iter()
            .map(|edge| Collaborator {
                login: edge.node.login,
                name: edge.node.name,
                email: edge.node.email,
                permission: edge.permission,
            })
            .collect();

        Self {
            name: node.name,
            description: node.description,
            updated_at: node.updated_at,
            pushed_at: node.pushed_at,
            latest_release: node.latest_release.map(|release| release.created_at),
            last_commits,
            collaborators,
        }
    }
}

/// Reject organization names that could alter a query or route.
pub fn validate_org(org: &str) -> Result<()> {
    if ORG_NAME.is_match(org) {
        Ok(())
    } else {
        Err(ReportError::InvalidInput(format!("Invalid org name: {}", org)))
    }
}

/// The date one calendar year before `today` (Feb 29 maps to Feb 28).
pub fn one_year_ago(today: NaiveDate) -> NaiveDate {
    today.checked_sub_months(Months::new(12)).unwrap_or(today)
}

/// Search string for repositories last pushed before `stale_date`.
pub fn stale_search_query(org: &str, stale_date: NaiveDate) -> Result<String> {
    validate_org(org)?;
    let date = stale_date.format("%Y-%m-%d").to_string();
    if !STALE_DATE.is_match(&date) {
        return Err(ReportError::InvalidInput(format!("Invalid stale date: {}", date)));
    }
    Ok(format!("org:{} pushed:<{}", org, date))
}

/// All admins of an organization, following pagination.
pub async fn get_repository_admins<C: ApiClient>(
    gateway: &CachingGateway<C>,
    org: &str,
) -> Result<Vec<Member>> {
    validate_org(org)?;

    let mut admins = Vec::new();
    let mut page = 1u64;
    loop {
        let options = object(json!({
            "org": org,
            "role": "admin",
            "per_page": ADMIN_PAGE_SIZE,
            "page": page,
        }));
        let response = gateway
            .request_cached(MEMBERS_ROUTE, &options)
            .await
            .inspect_err(|e| error!(org = org, error = %e, "error getting admins"))?;

        let members: Vec<Member> = serde_json::from_value(response.data)?;
        let count = members.len() as u64;
        admins.extend(members);
        if count < ADMIN_PAGE_SIZE {
            break;
        }
        page += 1;
    }

    Ok(admins)
}

/// Repositories of `org` with no push in the year before `today`.
/// Archived and disabled repositories are skipped.
pub async fn get_stale_repos<C: ApiClient>(
    gateway: &CachingGateway<C>,
    org: &str,
    today: NaiveDate,
) -> Result<Vec<StaleRepository>> {
    let search_query = stale_search_query(org, one_year_ago(today))?;
    let parameters = object(json!({
        "search_query": search_query,
        "limit": STALE_REPO_LIMIT,
    }));

    let data = gateway.query_cached(STALE_REPOS_QUERY, &parameters).await?;
    let search: StaleSearch = serde_json::from_value(data)?;

    let mut stale = Vec::new();
    for node in search.search.edges.into_iter().filter_map(|edge| edge.node) {
        if node.is_archived || node.is_disabled {
            warn!(
                repository = %node.name,
                archived = node.is_archived,
                disabled = node.is_disabled,
                "skipping inactive repository"
            );
            continue;
        }
        stale.push(StaleRepository::from(node));
    }

    Ok(stale)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::config::ClientConfig;
    use crate::github::ApiResponse;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex;

    /// Serves `total_admins` members in pages and a fixed search result.
    struct FixtureClient {
        total_admins: usize,
        requests: Mutex<Vec<Map<String, Value>>>,
        queries: Mutex<Vec<Map<String, Value>>>,
    }

    impl FixtureClient {
        fn new(total_admins: usize) -> Self {
            Self {
                total_admins,
                requests: Mutex::new(Vec::new()),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ApiClient for FixtureClient {
        async fn graphql(&self, _query: &str, variables: &Map<String, Value>) -> Result<Value> {
            self.queries.lock().unwrap().push(variables.clone());
            Ok(json!({
                "search": {"edges": [
                    {"node": repo_node("active", false, false)},
                    {"node": repo_node("archived", true, false)},
                    {"node": repo_node("disabled", false, true)}
                ]}
            }))
        }

        async fn request(&self, route: &str, options: &Map<String, Value>) -> Result<ApiResponse> {
            self.requests.lock().unwrap().push(options.clone());
            let page = options["page"].as_u64().unwrap() as usize;
            let per_page = options["per_page"].as_u64().unwrap() as usize;
            let start = (page - 1) * per_page;
            let end = self.total_admins.min(start + per_page);
            let members: Vec<Value> = (start..end)
                .map(|i| json!({"id": i, "login": format!("admin{}", i), "type": "User"}))
                .collect();
            Ok(ApiResponse {
                status: 200,
                url: route.to_string(),
                data: Value::Array(members),
            })
        }
    }

    fn repo_node(name: &str, archived: bool, disabled: bool) -> Value {
        json!({
            "name": name,
            "description": "old stuff",
            "updatedAt": "2022-05-01T00:00:00Z",
            "pushedAt": "2022-04-01T00:00:00Z",
            "latestRelease": {"createdAt": "2021-01-01T00:00:00Z"},
            "isArchived": archived,
            "isDisabled": disabled,
            "defaultBranchRef": {"target": {"history": {"nodes": [
                {"committedDate": "2022-04-01T00:00:00Z", "author": {"name": "Ada", "email": "ada@example.com"}}
            ]}}},
            "collaborators": {"edges": [
                {"permission": "WRITE", "node": {"login": "bob", "name": "Bob", "email": null}}
            ]}
        })
    }

    fn gateway(client: FixtureClient) -> CachingGateway<FixtureClient> {
        CachingGateway::new(client, Arc::new(MemoryStore::new()), &ClientConfig::new("tok1")).unwrap()
    }

    #[test]
    fn test_validate_org() {
        assert!(validate_org("SoftwareDefinedVehicle").is_ok());
        assert!(validate_org("acme-corp-2").is_ok());
        assert!(validate_org("acme corp").is_err());
        assert!(validate_org("acme\" OR 1").is_err());
        assert!(validate_org("").is_err());
    }

    #[test]
    fn test_one_year_ago() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(one_year_ago(today), NaiveDate::from_ymd_opt(2025, 10, 16).unwrap());

        let leap = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(one_year_ago(leap), NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
    }

    #[test]
    fn test_stale_search_query() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(
            stale_search_query("acme", date).unwrap(),
            "org:acme pushed:<2025-01-05"
        );
        assert!(stale_search_query("a/b", date).is_err());
    }

    #[tokio::test]
    async fn test_admins_follow_pagination() {
        let gw = gateway(FixtureClient::new(230));

        let admins = get_repository_admins(&gw, "acme").await.unwrap();

        assert_eq!(admins.len(), 230);
        assert_eq!(admins[229].login, "admin229");
        let requests = gw.client().requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0]["role"], json!("admin"));
    }

    #[tokio::test]
    async fn test_admins_second_run_is_cached() {
        let gw = gateway(FixtureClient::new(3));

        get_repository_admins(&gw, "acme").await.unwrap();
        let admins = get_repository_admins(&gw, "acme").await.unwrap();

        assert_eq!(admins.len(), 3);
        assert_eq!(gw.client().requests.lock().unwrap().len(), 1);
        assert_eq!(gw.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_admins_reject_bad_org_before_calling() {
        let gw = gateway(FixtureClient::new(3));
        assert!(get_repository_admins(&gw, "../etc").await.is_err());
        assert!(gw.client().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_repos_skip_inactive() {
        let gw = gateway(FixtureClient::new(0));
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let repos = get_stale_repos(&gw, "acme", today).await.unwrap();

        assert_eq!(repos.len(), 1);
        let repo = &repos[0];
        assert_eq!(repo.name, "active");
        assert_eq!(repo.last_commits.len(), 1);
        assert_eq!(repo.collaborators[0].login, "bob");
        assert_eq!(repo.collaborators[0].permission, RepositoryPermission::Write);
        assert!(repo.latest_release.is_some());

        let queries = gw.client().queries.lock().unwrap();
        assert_eq!(queries[0]["search_query"], json!("org:acme pushed:<2025-10-16"));
        assert_eq!(queries[0]["limit"], json!(STALE_REPO_LIMIT));
    }
}
