//! YARN application log fetching and summarizing
//!
//! A failed Spark application leaves behind tens of thousands of log lines
//! across its containers. `fetch` pulls the aggregated log of an application
//! down into `./<app_id>` and distills it into `./<app_id>_s`, keeping the
//! container boundaries, the error lines with a little context, and one copy
//! of each repeated stack trace.

mod fetch;
mod filter;

pub use fetch::*;
pub use filter::*;
