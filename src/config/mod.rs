//! Configuration module for dsutil
//!
//! Provides the CLI argument definitions for every subcommand.

mod settings;

pub use settings::*;
