// Configuration for the report and the GitHub client.
// Command-line flags plus the client settings that scope cache keys.

use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use crate::cache::{DEFAULT_NAMESPACE, DEFAULT_TTL_SECS, GatewayOptions, ReadFailurePolicy};
use crate::error::{ReportError, Result};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Log filter used when `RUST_LOG` is unset. Cache hit notices are debug
/// events from this crate, so they stay visible by default.
pub const DEFAULT_LOG_FILTER: &str = "info,stale_repos=debug";

/// Print admins and stale repositories of a GitHub organization.
#[derive(Debug, Clone, Parser)]
#[command(name = "stale-repos", version, about)]
pub struct Args {
    /// Organization to report on.
    #[arg(long)]
    pub org: String,

    /// Base directory for the response cache.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Cache namespace (subdirectory of the cache directory).
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Retention of cached responses, in seconds. Zero keeps them forever.
    #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
    pub ttl: u64,

    /// Keep cached responses in memory only.
    #[arg(long)]
    pub no_persist: bool,

    /// GitHub API base URL.
    #[arg(long, default_value = GITHUB_API_BASE)]
    pub api_url: String,

    /// Fail when the cache cannot be read instead of fetching live.
    #[arg(long)]
    pub strict_store: bool,
}

impl Args {
    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            default_ttl: self.ttl,
            read_failure: if self.strict_store {
                ReadFailurePolicy::Propagate
            } else {
                ReadFailurePolicy::TreatAsMiss
            },
        }
    }
}

/// Settings for the GitHub client.
///
/// The serialized form is the cache fingerprint, so every field that changes
/// what the API returns belongs here.
#[derive(Clone, Serialize)]
pub struct ClientConfig {
    pub auth: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl ClientConfig {
    pub fn new(auth: impl Into<String>) -> Self {
        Self {
            auth: auth.into(),
            base_url: GITHUB_API_BASE.to_string(),
            log: None,
        }
    }

    /// Build a config from the GITHUB_TOKEN environment variable.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN").map_err(|_| ReportError::MissingToken)?;
        Ok(Self::new(token))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = Some(log.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.trim().is_empty() {
            return Err(ReportError::InvalidConfig("auth token is empty".into()));
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(ReportError::InvalidConfig(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("auth", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("log", &self.log)
            .finish()
    }
}
