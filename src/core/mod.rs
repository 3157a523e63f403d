//! core
//!
//! Configuration shared by the library and the `fl` binary.

pub mod config;
