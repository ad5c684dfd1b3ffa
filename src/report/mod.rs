// Report module.
// Collects organization admins and stale repositories and renders the digest.

pub mod digest;
pub mod queries;

pub use digest::{render_admins, render_digest, render_repositories};
pub use queries::{
    Collaborator, StaleRepository, get_repository_admins, get_stale_repos, one_year_ago,
    validate_org,
};
