//! ratechain library
//!
//! Exchange-rate resolution through an ordered chain of storage tiers:
//! an in-process memory cache, per-currency files on disk, and the remote
//! rate provider. Exposed as a library for the binary and integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod server;
pub mod service;
