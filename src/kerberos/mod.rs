//! Kerberos authentication helpers
//!
//! Wraps `kinit` so cluster users do not have to retype their password:
//! the password is obfuscated into a profile readable only by the owner and
//! replayed on subsequent authentications, optionally on a timer.

mod auth;
mod profile;

pub use auth::*;
pub use profile::*;
