//! Shell command output parsing
//!
//! Turns the tabular output of shell commands (hdfs dfs -ls, -count, -du,
//! ps, ...) into structured tables with named columns.

mod table;

pub use table::*;
