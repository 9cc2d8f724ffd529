//! Fetching aggregated YARN application logs

use crate::error::{DsutilError, IoResultExt, Result};
use crate::logf::{filter_log_file, SummaryOptions};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

/// Default yarn binary
pub const YARN_BIN: &str = "/apache/hadoop/bin/yarn";

/// Fetches application logs through `yarn logs`
#[derive(Debug, Clone)]
pub struct LogFetcher {
    /// yarn binary path
    pub bin: String,
    /// Directory the dump and summary are written into
    pub output_dir: PathBuf,
}

impl Default for LogFetcher {
    fn default() -> Self {
        Self {
            bin: YARN_BIN.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl LogFetcher {
    /// Fetch the aggregated log of an application into
    /// `<output_dir>/<app_id>` and summarize it into `<app_id>_s`.
    /// Returns (dump path, summary path).
    pub fn fetch(&self, app_id: &str, options: SummaryOptions) -> Result<(PathBuf, PathBuf)> {
        let command = format!("{} logs -applicationId {}", self.bin, app_id);
        info!("Fetching logs: {command}");
        let output = Command::new(&self.bin)
            .args(["logs", "-applicationId", app_id])
            .output()
            .map_err(|e| DsutilError::CommandIo {
                command: command.clone(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(DsutilError::command_failed(command, output.status));
        }
        let dump = self.output_dir.join(app_id);
        fs::write(&dump, &output.stdout).with_path(&dump)?;
        info!("Raw log written to {}", dump.display());
        let summary = filter_log_file(&dump, options)?;
        Ok((dump, summary))
    }
}
