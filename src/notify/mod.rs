//! Email notification reports
//!
//! Spark submissions and kinit runs can mail their outcome to the owner.
//! Plain SMTP against an internal relay, no authentication. A failed send is
//! logged and swallowed so it never takes down the operation it reports on.

mod email;

pub use email::*;
