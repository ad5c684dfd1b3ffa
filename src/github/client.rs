// GitHub API HTTP client.
// Handles authentication, rate limiting, and request/response processing.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::ClientConfig;
use crate::error::{ReportError, Result};

use super::route::Route;
use super::types::RateLimit;

const GITHUB_API_VERSION: &str = "2022-11-28";

/// Response of a REST call: status, final URL, and decoded body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    pub data: Value,
}

/// The two remote call shapes the cache layer needs.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Run a GraphQL query and return its `data` object.
    async fn graphql(&self, query: &str, variables: &Map<String, Value>) -> Result<Value>;

    /// Call a REST route template such as `GET /orgs/{org}/members`.
    async fn request(&self, route: &str, options: &Map<String, Value>) -> Result<ApiResponse>;
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// GitHub API client with authentication and rate limit tracking.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    rate_limit: Mutex<RateLimit>,
}

impl GitHubClient {
    /// Create a new GitHub client from its configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.auth))
                .map_err(|e| ReportError::InvalidConfig(e.to_string()))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("stale-repos"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ReportError::Api)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            rate_limit: Mutex::new(RateLimit::default()),
        })
    }

    /// Get the most recent rate limit information.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
            .lock()
            .map(|limit| limit.clone())
            .unwrap_or_default()
    }

    async fn send(&self, route: &Route) -> Result<Response> {
        let url = format!("{}{}", self.base_url, route.path);
        let mut builder = self.client.request(route.method.clone(), &url);
        if !route.query.is_empty() {
            builder = builder.query(&route.query);
        }
        for (name, value) in &route.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &route.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ReportError::Api)?;

        self.update_rate_limit(&response);
        self.check_response(response).await
    }

    /// Update rate limit from response headers.
    fn update_rate_limit(&self, response: &Response) {
        let header = |name: &str| -> Option<u64> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        };

        let Ok(mut rate_limit) = self.rate_limit.lock() else {
            return;
        };
        if let Some(limit) = header("x-ratelimit-limit") {
            rate_limit.limit = limit;
        }
        if let Some(remaining) = header("x-ratelimit-remaining") {
            rate_limit.remaining = remaining;
        }
        if let Some(reset) = header("x-ratelimit-reset") {
            rate_limit.reset = reset;
        }
    }

    /// Check response status and convert errors.
    async fn check_response(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::UNAUTHORIZED => Err(ReportError::Unauthorized),
            StatusCode::NOT_FOUND => {
                let url = response.url().to_string();
                Err(ReportError::NotFound(url))
            }
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                let rate_limit = self.rate_limit();
                if rate_limit.remaining == 0 && rate_limit.limit > 0 {
                    let reset_at = chrono::DateTime::from_timestamp(rate_limit.reset as i64, 0)
                        .map(|dt| dt.format("%H:%M:%S").to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    Err(ReportError::RateLimited { reset_at })
                } else {
                    Err(ReportError::Other(format!(
                        "Forbidden: {}",
                        response.text().await.unwrap_or_default()
                    )))
                }
            }
            status => Err(ReportError::Other(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            ))),
        }
    }
}

#[async_trait]
impl ApiClient for GitHubClient {
    async fn graphql(&self, query: &str, variables: &Map<String, Value>) -> Result<Value> {
        let route = Route {
            method: reqwest::Method::POST,
            path: "/graphql".to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Some(json!({ "query": query, "variables": variables })),
        };
        let response = self.send(&route).await?;
        let body: GraphQlResponse = response.json().await?;
        into_graphql_data(body)
    }

    async fn request(&self, route: &str, options: &Map<String, Value>) -> Result<ApiResponse> {
        let route = Route::expand(route, options)?;
        let response = self.send(&route).await?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let text = response.text().await?;
        let data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok(ApiResponse { status, url, data })
    }
}

/// GraphQL reports failures in the body with a 200 status.
fn into_graphql_data(body: GraphQlResponse) -> Result<Value> {
    if !body.errors.is_empty() {
        return Err(ReportError::GraphQl(
            body.errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    body.data
        .ok_or_else(|| ReportError::Other("GraphQL response without data".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_errors_are_surfaced() {
        let body: GraphQlResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{"message": "Field 'x' doesn't exist"}, {"message": "second"}]
        }))
        .unwrap();

        match into_graphql_data(body) {
            Err(ReportError::GraphQl(messages)) => assert_eq!(messages.len(), 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_graphql_data_is_returned() {
        let body: GraphQlResponse =
            serde_json::from_value(json!({"data": {"search": {"edges": []}}})).unwrap();
        assert_eq!(
            into_graphql_data(body).unwrap(),
            json!({"search": {"edges": []}})
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(GitHubClient::new(&ClientConfig::new("")).is_err());
        let client = GitHubClient::new(&ClientConfig::new("tok1")).unwrap();
        assert_eq!(client.rate_limit().remaining, 0);
    }
}
