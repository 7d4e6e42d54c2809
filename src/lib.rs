//! wrapconf library
//!
//! Configuration and path resolution for workflow steps that wrap external
//! executables. This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod schema;
pub mod similarity;
