//! forgeline - forge-agnostic pull request lifecycle client
//!
//! Opens, reads, merges, reopens and updates pull requests through a
//! forge-agnostic service trait. GitLab is the implemented backend.
//!
//! # Architecture
//!
//! - [`forge`] - `ForgePrService` trait, GitLab transport and service, retry
//! - [`state`] - Query cache, invalidation bus and loading signal
//! - [`telemetry`] - Optional named-event sink
//! - [`core`] - Configuration schema and loading
//! - [`cli`] - Command-line interface for the `fl` binary
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! 1. Creating a pull request makes at most a bounded number of attempts, with
//!    a constant delay between them, and returns the last error on exhaustion
//! 2. Every other operation makes exactly one forge call
//! 3. The loading signal is raised only while a create attempt is in flight
//! 4. Successful mutations invalidate cached pull request reads

pub mod cli;
pub mod core;
pub mod forge;
pub mod state;
pub mod telemetry;
pub mod ui;
