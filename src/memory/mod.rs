//! Memory usage inspection and shaping
//!
//! Reports the resident memory of a user's processes and can hold ballast
//! allocations to steer total usage toward a target. The matcher is used on
//! shared gateway hosts to reserve headroom before launching memory-hungry
//! jobs.

mod matcher;
mod usage;

pub use matcher::*;
pub use usage::*;
