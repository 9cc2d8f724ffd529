//! Filesystem hygiene operations
//!
//! Helpers for keeping working directories tidy: flattening nested layouts,
//! splitting huge directories into batches, finding and removing
//! essentially-empty directories, and small conveniences like
//! copy-if-exists.

mod empty;
mod operations;

pub use empty::*;
pub use operations::*;
