//! Spark job submission
//!
//! Builds `spark-submit` command lines from a YAML submission config,
//! drives the child process while throttling its chatty client log, parses
//! the application id and final status out of the stream, and reports the
//! outcome by email.

mod config;
mod filter;
mod submit;

pub use config::*;
pub use filter::*;
pub use submit::*;
