//! ui
//!
//! User-facing output for the `fl` binary.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing output goes through this module so that `--quiet` and
//! `--json` behave the same for every command. Diagnostics go to `tracing`.

pub mod output;
