//! Driving the spark-submit process

use crate::error::{DsutilError, Result};
use crate::hdfs::HdfsClient;
use crate::logf::{LogFetcher, SummaryOptions};
use crate::notify::{self, EmailConfig, Notification};
use crate::spark::{LogFilter, SubmitConfig};
use regex::Regex;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{info, warn};

/// Kept PATH for local trial runs, so the submission does not inherit a
/// conda or virtualenv python by accident
const LOCAL_PATH: &str = "PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Wait before pulling the application log of a failed job; aggregation
/// lags the application end
const LOG_AVAILABILITY_WAIT: Duration = Duration::from_secs(300);

/// Indent continuation lines of a multi-line command and join them with
/// backslash-newlines
fn join_command(lines: &[String], indent_from: usize) -> String {
    let mut rendered = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        if idx >= indent_from {
            rendered.push(format!("    {line}"));
        } else {
            rendered.push(line.clone());
        }
    }
    rendered.join(" \\\n") + "\n"
}

/// Build the cluster submission command
pub fn build_cluster_command(
    config: &SubmitConfig,
    files: &str,
    cmd: &[String],
) -> Result<String> {
    if config.spark_submit.is_empty() {
        return Err(DsutilError::config("the field spark-submit is not defined"));
    }
    if !PathBuf::from(&config.spark_submit).is_file() {
        return Err(DsutilError::NotFound(PathBuf::from(&config.spark_submit)));
    }
    let mut lines = vec![config.spark_submit.clone()];
    lines.extend(config.option_lines(files));
    if !config.jars.is_empty() {
        lines.push(format!("--jars {}", config.jars.join()));
    }
    lines.extend(cmd.iter().cloned());
    Ok(join_command(&lines, 1))
}

/// Build the local trial-run command. Returns None when no local
/// spark-submit is configured.
pub fn build_local_command(config: &SubmitConfig, cmd: &[String]) -> Result<Option<String>> {
    if config.spark_submit_local.is_empty() {
        return Ok(None);
    }
    if !PathBuf::from(&config.spark_submit_local).is_file() {
        return Err(DsutilError::NotFound(PathBuf::from(
            &config.spark_submit_local,
        )));
    }
    let mut lines = vec![LOCAL_PATH.to_string(), config.spark_submit_local.clone()];
    if !config.jars.is_empty() {
        lines.push(format!("--jars {}", config.jars.join()));
    }
    lines.extend([
        "--conf spark.yarn.maxAppAttempts=1".to_string(),
        "--conf spark.yarn.appMasterEnv.ARROW_PRE_0_15_IPC_FORMAT=1".to_string(),
        "--conf spark.executorEnv.ARROW_PRE_0_15_IPC_FORMAT=1".to_string(),
    ]);
    let python = config.resolve_python()?;
    lines.push(format!("--conf spark.pyspark.driver.python={python}"));
    lines.push(format!("--conf spark.pyspark.python={python}"));
    lines.extend(cmd.iter().cloned());
    Ok(Some(join_command(&lines, 2)))
}

/// Outcome of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Application id parsed from the client log, empty when none appeared
    pub app_id: String,
    /// Final status line value (SUCCEEDED, FAILED, ...), empty when the
    /// client never reported one
    pub final_status: String,
}

impl SubmitOutcome {
    /// The submission counts as successful unless the final status is
    /// FAILED
    pub fn succeeded(&self) -> bool {
        self.final_status != "FAILED"
    }
}

/// Drives spark-submit processes and reports their outcome
pub struct SparkSubmit {
    email: Option<EmailConfig>,
    filter: LogFilter,
    fetcher: LogFetcher,
    log_wait: Duration,
}

impl SparkSubmit {
    pub fn new(email: Option<EmailConfig>) -> Self {
        Self {
            email,
            filter: LogFilter::spark_default(),
            fetcher: LogFetcher::default(),
            log_wait: LOG_AVAILABILITY_WAIT,
        }
    }

    /// Override the log fetcher (binary and output dir)
    pub fn with_fetcher(mut self, fetcher: LogFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Override the wait before fetching the log of a failed application
    pub fn with_log_wait(mut self, wait: Duration) -> Self {
        self.log_wait = wait;
        self
    }

    /// Submit a job, streaming its filtered client log to stdout. Returns
    /// true when the application did not fail.
    pub fn submit(&mut self, cmd: &str, attachments: &[PathBuf]) -> Result<bool> {
        info!("Submitting Spark job...\n{cmd}");
        self.filter.reset();
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DsutilError::CommandIo {
                command: cmd.to_string(),
                source: e,
            })?;
        let mut kept = Vec::new();
        // The yarn client writes its progress to stderr.
        if let Some(stderr) = child.stderr.take() {
            for line in BufReader::new(stderr).lines() {
                let line = line.map_err(|e| DsutilError::CommandIo {
                    command: cmd.to_string(),
                    source: e,
                })?;
                let line = line.trim_end();
                if !line.is_empty() && self.filter.keep(line) {
                    println!("{line}");
                    kept.push(line.to_string());
                }
            }
        }
        child.wait().map_err(|e| DsutilError::CommandIo {
            command: cmd.to_string(),
            source: e,
        })?;
        let outcome = parse_outcome(&kept);
        let subject = report_subject(&outcome);
        if let Some(email) = &self.email {
            let mut notification =
                Notification::new(&subject, format!("{cmd}\n{}", kept.join("\n")));
            for attachment in attachments {
                notification = notification.with_attachment(attachment);
            }
            notify::send_best_effort(email, &notification);
        }
        if outcome.final_status == "FAILED" {
            warn!("Spark application {} failed", outcome.app_id);
            if self.email.is_some() && !outcome.app_id.is_empty() {
                self.mail_failure_log(&outcome.app_id, &subject);
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Fetch the application log of a failed job and mail its summary
    fn mail_failure_log(&self, app_id: &str, subject: &str) {
        info!(
            "Waiting {} for the application log to be aggregated...",
            humantime::format_duration(self.log_wait)
        );
        std::thread::sleep(self.log_wait);
        let summary = match self.fetcher.fetch(app_id, SummaryOptions::default()) {
            Ok((_, summary)) => summary,
            Err(e) => {
                warn!("Could not fetch the log of {app_id}: {e}");
                return;
            }
        };
        if let Some(email) = &self.email {
            let body = std::fs::read_to_string(&summary).unwrap_or_default();
            notify::send_best_effort(
                email,
                &Notification::new(format!("Re: {subject}"), body),
            );
        }
    }
}

/// Email subject for a submission report. Without a final status line the
/// submission itself failed, even when an application id was already
/// assigned.
fn report_subject(outcome: &SubmitOutcome) -> String {
    if outcome.final_status.is_empty() {
        "Spark Application Submission Failed".to_string()
    } else {
        format!(
            "Spark Application {} {}",
            outcome.app_id, outcome.final_status
        )
    }
}

/// Parse the application id and final status out of the retained client
/// log lines; the last occurrence of each wins
pub fn parse_outcome(lines: &[String]) -> SubmitOutcome {
    let app_re = Regex::new(r"(application_\d+_\d+)").expect("static regex");
    let mut app_id = String::new();
    let mut final_status = String::new();
    for line in lines.iter().rev() {
        if app_id.is_empty() {
            if let Some(m) = app_re.captures(line) {
                app_id = m[1].to_string();
            }
        }
        if final_status.is_empty() {
            let lowered = line.to_lowercase();
            if let Some(idx) = lowered.find("final status: ") {
                final_status = lowered[idx + "final status: ".len()..]
                    .trim()
                    .to_uppercase();
            }
        }
        if !app_id.is_empty() && !final_status.is_empty() {
            break;
        }
    }
    SubmitOutcome {
        app_id,
        final_status,
    }
}

/// Run the local trial submission (when configured) followed by the
/// cluster submission. The first command of the user's job is attached to
/// the report so the reader sees which script ran.
pub fn submit_job(config: &SubmitConfig, cmd: &[String], hdfs: &HdfsClient) -> Result<bool> {
    let attachments: Vec<PathBuf> = cmd
        .first()
        .map(|first| PathBuf::from(first))
        .filter(|path| path.is_file())
        .into_iter()
        .collect();
    if let Some(local_cmd) = build_local_command(config, cmd)? {
        let mut local = SparkSubmit::new(None);
        if !local.submit(&local_cmd, &attachments)? {
            return Ok(false);
        }
    }
    let files = config.resolve_files(hdfs);
    let cluster_cmd = match build_cluster_command(config, &files, cmd) {
        Ok(command) => command,
        Err(DsutilError::ConfigError(message)) => {
            warn!("{message}; skipping cluster submission");
            return Ok(true);
        }
        Err(e) => return Err(e),
    };
    let mut cluster = SparkSubmit::new(config.email.clone());
    cluster.submit(&cluster_cmd, &attachments)
}
