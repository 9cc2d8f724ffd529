//! Error-focused log summarization

use crate::error::{IoResultExt, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Suffix appended to the input path for the summary file
pub const SUMMARY_SUFFIX: &str = "_s";

/// Settings for log summarization
#[derive(Debug, Clone)]
pub struct SummaryOptions {
    /// Lines kept after each matching line
    pub context_after: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self { context_after: 2 }
    }
}

/// Distills a raw YARN application log into its interesting lines
pub struct LogSummarizer {
    options: SummaryOptions,
    error_line: Regex,
    continuation: Regex,
    container_header: Regex,
}

impl LogSummarizer {
    pub fn new(options: SummaryOptions) -> Self {
        Self {
            options,
            // Lines that start (or continue) an interesting block.
            error_line: Regex::new(
                r"(?i)(exception|\berror\b|caused by|traceback|container killed|killed by|exit code|fatal|out of memory|outofmemory)",
            )
            .expect("static regex"),
            // Java stack frames and python traceback frames extend a block.
            continuation: Regex::new(r"^\s+(at |\.\.\. \d+ more|File .+, line \d+)")
                .expect("static regex"),
            // Aggregated yarn logs delimit each container's section.
            container_header: Regex::new(r"^Container: \S+ on \S+").expect("static regex"),
        }
    }

    /// Summarize `text`, returning the kept lines
    pub fn summarize(&self, text: &str) -> String {
        let blocks = self.collect_blocks(text);
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut ordered: Vec<&str> = Vec::new();
        for block in &blocks {
            let entry = counts.entry(block.as_str()).or_insert(0);
            if *entry == 0 {
                ordered.push(block.as_str());
            }
            *entry += 1;
        }
        let mut out = String::new();
        for block in ordered {
            out.push_str(block);
            let count = counts[block];
            if count > 1 {
                out.push_str(&format!("[repeated {count} times]\n"));
            }
            out.push('\n');
        }
        out
    }

    /// Split the log into kept blocks: container headers, and error lines
    /// with their continuation/context lines
    fn collect_blocks(&self, text: &str) -> Vec<String> {
        let mut blocks = Vec::new();
        let mut current = String::new();
        let mut context_left = 0usize;
        for line in text.lines() {
            if self.container_header.is_match(line) {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                // Each container header starts a fresh block so errors are
                // attributed to the container that produced them.
                blocks.push(format!("{line}\n"));
                context_left = 0;
                continue;
            }
            if self.error_line.is_match(line) {
                current.push_str(line);
                current.push('\n');
                context_left = self.options.context_after;
                continue;
            }
            if self.continuation.is_match(line) && !current.is_empty() {
                current.push_str(line);
                current.push('\n');
                // Context applies only right after the matching line; a
                // stack frame ends it so trailing noise is not absorbed.
                context_left = 0;
                continue;
            }
            if context_left > 0 {
                current.push_str(line);
                current.push('\n');
                context_left -= 1;
                if context_left == 0 {
                    blocks.push(std::mem::take(&mut current));
                }
            } else if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }
        blocks
    }
}

/// Path of the summary for a given log dump
pub fn summary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(SUMMARY_SUFFIX);
    path.with_file_name(name)
}

/// Summarize a log file on disk, writing `<path>_s` next to it
pub fn filter_log_file(path: &Path, options: SummaryOptions) -> Result<PathBuf> {
    let text = fs::read_to_string(path).with_path(path)?;
    let summary = LogSummarizer::new(options).summarize(&text);
    let out = summary_path(path);
    fs::write(&out, summary).with_path(&out)?;
    info!("Summary written to {}", out.display());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn summarize(text: &str) -> String {
        LogSummarizer::new(SummaryOptions { context_after: 1 }).summarize(text)
    }

    #[test]
    fn test_keeps_errors_drops_noise() {
        let log = "INFO starting up\n\
                   ERROR something broke\n\
                   detail line\n\
                   INFO routine chatter\n\
                   INFO more chatter\n";
        let summary = summarize(log);
        assert!(summary.contains("ERROR something broke"));
        assert!(summary.contains("detail line"));
        assert!(!summary.contains("routine chatter"));
    }

    #[test]
    fn test_stack_frames_stay_with_their_exception() {
        let log = "java.lang.NullPointerException: boom\n\
                   \tat com.example.Job.run(Job.java:42)\n\
                   \tat com.example.Main.main(Main.java:7)\n\
                   INFO unrelated\n";
        let summary = summarize(log);
        assert!(summary.contains("NullPointerException"));
        assert!(summary.contains("Job.java:42"));
        assert!(!summary.contains("unrelated"));
    }

    #[test]
    fn test_repeated_trace_collapsed() {
        let trace = "ERROR task failed\n\tat a.B.c(B.java:1)\nINFO f\nINFO g\nINFO h\n";
        let log = trace.repeat(3);
        let summary = summarize(&log);
        assert_eq!(summary.matches("task failed").count(), 1);
        assert!(summary.contains("[repeated 3 times]"));
    }

    #[test]
    fn test_repeated_trace_collapsed_despite_differing_noise() {
        let mut log = String::new();
        for i in 0..3 {
            log.push_str("ERROR task failed\n\tat a.B.c(B.java:1)\n");
            log.push_str(&format!("INFO heartbeat {i}\nINFO other {i}\n"));
        }
        let summary = summarize(&log);
        assert_eq!(summary.matches("task failed").count(), 1);
        assert!(summary.contains("[repeated 3 times]"));
        assert!(!summary.contains("heartbeat"));
    }

    #[test]
    fn test_container_headers_survive() {
        let log = "Container: container_e1_2_3 on host-a.example.com_8041\n\
                   INFO noise\n\
                   Container: container_e1_2_4 on host-b.example.com_8041\n\
                   ERROR bad\n";
        let summary = summarize(log);
        assert!(summary.contains("container_e1_2_3"));
        assert!(summary.contains("container_e1_2_4"));
        assert!(summary.contains("ERROR bad"));
    }

    #[test]
    fn test_summary_path() {
        assert_eq!(
            summary_path(Path::new("application_123_456")),
            PathBuf::from("application_123_456_s")
        );
        assert_eq!(
            summary_path(Path::new("/tmp/app.log")),
            PathBuf::from("/tmp/app.log_s")
        );
    }

    #[test]
    fn test_filter_log_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("application_1_2");
        fs::write(&path, "INFO ok\nERROR x\n").unwrap();
        let out = filter_log_file(&path, SummaryOptions::default()).unwrap();
        let summary = fs::read_to_string(out).unwrap();
        assert!(summary.contains("ERROR x"));
        assert!(!summary.contains("INFO ok"));
    }
}
