// GitHub API module.
// Provides the client, route expansion, and types for the GitHub REST and GraphQL APIs.

pub mod client;
pub mod route;
pub mod types;

pub use client::{ApiClient, ApiResponse, GitHubClient};
pub use route::Route;
pub use types::*;
