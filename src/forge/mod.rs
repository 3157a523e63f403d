//! forge
//!
//! Pull request lifecycle against remote forges.
//!
//! # Architecture
//!
//! The [`ForgePrService`] trait is the forge-agnostic surface: create (with
//! retry), fetch, live get, merge, reopen and update. Commands obtain a
//! service from [`create_service`] rather than naming a concrete forge.
//!
//! - Forge failures are returned as [`ForgeError`] and never retried except
//!   by `create_pr`
//! - Successful mutations invalidate cached pull request reads
//!
//! # Modules
//!
//! - `traits`: the `ForgePrService` trait and forge-agnostic types
//! - [`gitlab`]: GitLab transport, wire types and service
//! - [`retry`]: fixed-delay retry used by `create_pr`
//! - [`mock`]: in-memory GitLab transport for deterministic testing
//! - `factory`: provider selection and service creation
//!
//! # Example
//!
//! ```no_run
//! use forgeline::forge::{create_service, CreatePullRequestArgs, ForgePrService, ServiceSettings};
//!
//! # async fn demo() -> Result<(), forgeline::forge::ForgeError> {
//! let service = create_service(ServiceSettings {
//!     remote_url: Some("git@gitlab.com:group/project.git".into()),
//!     token: std::env::var("GITLAB_TOKEN").ok(),
//!     ..Default::default()
//! })?;
//!
//! let pr = service
//!     .create_pr(CreatePullRequestArgs {
//!         title: "Add feature".to_string(),
//!         body: "Implements the feature".to_string(),
//!         draft: false,
//!         base_branch_name: "feature".to_string(),
//!         upstream_name: "main".to_string(),
//!     })
//!     .await?;
//!
//! println!("Created !{}: {}", pr.number, pr.html_url);
//! # Ok(())
//! # }
//! ```

mod factory;
pub mod gitlab;
pub mod mock;
pub mod retry;
mod traits;

pub use factory::{
    create_service, detect_provider, valid_forge_names, ForgeProvider, ServiceSettings,
};
pub use retry::RetryPolicy;
pub use traits::*;
