// stale-repos library.
// Cached GitHub API access and the stale repository digest built on it.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod report;

pub use error::{ReportError, Result};
