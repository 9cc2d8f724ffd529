//! Delimited text-file helpers
//!
//! Operations for the flat files that fall out of Hadoop jobs: merging
//! part files (keeping a single header), deduplicating headers left behind
//! by `getmerge`, projecting columns by name, and pruning noisy blocks
//! from JSON profiling dumps.

mod merge;
mod select;

pub use merge::*;
pub use select::*;
