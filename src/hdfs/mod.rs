//! HDFS command wrappers
//!
//! A thin, typed layer over `hdfs dfs`. Listing and accounting commands are
//! parsed into structs through the shell table parser; mutating commands
//! just check the exit status.

mod client;

pub use client::*;
