//! # dsutil - cluster and developer utilities
//!
//! Utilities for day-to-day work on Hadoop/Spark gateway hosts:
//!
//! - **Spark submission**: build `spark-submit` command lines from a YAML
//!   config, throttle the yarn client's log, parse the outcome, and mail a
//!   report
//! - **Kerberos**: `kinit` with a password profile, optionally on a timer
//! - **Memory shaping**: measure per-user resident memory and hold ballast
//!   allocations to steer it toward a target
//! - **YARN logs**: fetch an application's aggregated log and distill it to
//!   its errors
//! - **HDFS**: typed wrappers for the everyday `hdfs dfs` commands
//! - **Text and filesystem helpers**: merge part files, project columns,
//!   flatten/split directories, remove essentially-empty directories
//!
//! ## Quick Start
//!
//! ```no_run
//! use dsutil::spark::{SubmitConfig, submit_job};
//! use dsutil::hdfs::HdfsClient;
//! use std::path::Path;
//!
//! let config = SubmitConfig::load(Path::new("submit.yaml")).unwrap();
//! let ok = submit_job(
//!     &config,
//!     &["job.py".to_string(), "--date".to_string(), "2024-03-01".to_string()],
//!     &HdfsClient::default(),
//! )
//! .unwrap();
//! assert!(ok);
//! ```
//!
//! ## Log summaries
//!
//! ```no_run
//! use dsutil::logf::{LogFetcher, SummaryOptions};
//!
//! let fetcher = LogFetcher::default();
//! let (dump, summary) = fetcher
//!     .fetch("application_1700000000000_12345", SummaryOptions::default())
//!     .unwrap();
//! println!("raw: {}, errors: {}", dump.display(), summary.display());
//! ```

pub mod config;
pub mod error;
pub mod fsops;
pub mod hdfs;
pub mod kerberos;
pub mod logf;
pub mod memory;
pub mod notify;
pub mod shell;
pub mod spark;
pub mod text;

pub use error::{DsutilError, Result};
