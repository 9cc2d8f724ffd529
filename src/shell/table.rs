//! Tabular command-output parser
//!
//! Commands like `hdfs dfs -ls` and `ps` print tables whose columns are
//! separated by runs of whitespace. This module parses such output either by
//! splitting every line with a regex, or by cutting columns at the byte
//! offsets of the headers (for tables whose cells themselves contain the
//! split pattern).

use crate::error::{DsutilError, Result};
use regex::Regex;
use std::process::Command;

/// How the header row of a parsed table is determined
#[derive(Debug, Clone)]
pub enum HeaderSpec {
    /// Use the given (post-skip) row as the header
    Row(usize),
    /// Use the supplied column names
    Names(Vec<String>),
    /// Generate `c0`, `c1`, ... column names
    Auto,
}

/// Options controlling how command output is parsed into a table
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Regex used to split a line into fields (or to split the header line
    /// in header-position mode)
    pub split: String,
    /// Header handling
    pub header: HeaderSpec,
    /// Indexes of raw lines to drop before parsing
    pub skip: Vec<usize>,
    /// Cut data columns at the header offsets instead of regex-splitting
    /// every line
    pub split_by_header: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            split: r"  +".to_string(),
            header: HeaderSpec::Auto,
            skip: Vec::new(),
            split_by_header: false,
        }
    }
}

/// A parsed table: named columns plus string rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Normalized column names (lowercase, spaces replaced by underscores)
    pub columns: Vec<String>,
    /// Row-major cell data
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Run a shell command and parse its stdout into a table
    pub fn from_command(cmd: &str, opts: &ParseOptions) -> Result<Self> {
        let lines = run_lines(cmd)?;
        Self::from_lines(&lines, opts)
    }

    /// Parse pre-captured output lines into a table
    pub fn from_lines<S: AsRef<str>>(lines: &[S], opts: &ParseOptions) -> Result<Self> {
        let lines: Vec<&str> = lines
            .iter()
            .enumerate()
            .filter(|(idx, _)| !opts.skip.contains(idx))
            .map(|(_, line)| line.as_ref())
            .filter(|line| !line.trim().is_empty())
            .collect();
        if lines.is_empty() {
            return Ok(Table {
                columns: Vec::new(),
                rows: Vec::new(),
            });
        }
        if opts.split_by_header {
            Self::parse_by_header_offsets(&lines, &opts.split)
        } else {
            Self::parse_by_split(&lines, &opts.split, &opts.header)
        }
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of a named column
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| DsutilError::TableError(format!("no such column: {name}")))?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn parse_by_split(lines: &[&str], split: &str, header: &HeaderSpec) -> Result<Self> {
        let re = Regex::new(split).map_err(|e| DsutilError::TableError(e.to_string()))?;
        let mut data: Vec<Vec<String>> = lines
            .iter()
            .map(|line| re.split(line.trim()).map(str::to_string).collect())
            .collect();
        let columns = match header {
            HeaderSpec::Row(idx) => {
                if *idx >= data.len() {
                    return Err(DsutilError::TableError(format!(
                        "header row {idx} out of range ({} rows)",
                        data.len()
                    )));
                }
                let columns = data.remove(*idx).iter().map(|c| normalize(c)).collect();
                columns
            }
            HeaderSpec::Names(names) => names.clone(),
            HeaderSpec::Auto => {
                let width = data.iter().map(Vec::len).max().unwrap_or(0);
                (0..width).map(|i| format!("c{i}")).collect()
            }
        };
        // Rows narrower than the header are right-padded so column access
        // stays in bounds.
        for row in &mut data {
            while row.len() < columns.len() {
                row.push(String::new());
            }
        }
        Ok(Table {
            columns,
            rows: data,
        })
    }

    /// Cut data columns at the byte offset of each header in the header
    /// line. Handles tables whose cells contain the split pattern (e.g.
    /// dates with single spaces under multi-space separated headers).
    fn parse_by_header_offsets(lines: &[&str], split: &str) -> Result<Self> {
        let re = Regex::new(split).map_err(|e| DsutilError::TableError(e.to_string()))?;
        let header_line = lines[0];
        let headers: Vec<&str> = re.split(header_line.trim()).collect();
        let mut offsets = Vec::with_capacity(headers.len());
        for header in &headers {
            let offset = header_line.find(header).ok_or_else(|| {
                DsutilError::TableError(format!("header '{header}' not found in header line"))
            })?;
            offsets.push(offset);
        }
        let mut rows = Vec::with_capacity(lines.len() - 1);
        for line in &lines[1..] {
            let mut row = Vec::with_capacity(headers.len());
            for idx in 0..offsets.len() {
                // Offsets come from the header line; a data row may place a
                // multi-byte character across one, so clamp to a boundary.
                let start = floor_boundary(line, offsets[idx]);
                let end = if idx + 1 < offsets.len() {
                    floor_boundary(line, offsets[idx + 1])
                } else {
                    line.len()
                };
                row.push(line[start..end].trim().to_string());
            }
            rows.push(row);
        }
        Ok(Table {
            columns: headers.iter().map(|h| normalize(h)).collect(),
            rows,
        })
    }
}

/// Largest char boundary in `s` at or below `idx`
fn floor_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn normalize(column: &str) -> String {
    column.trim().to_lowercase().replace(' ', "_")
}

/// Run a command through the shell and capture stdout as lines
pub fn run_lines(cmd: &str) -> Result<Vec<String>> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .map_err(|e| DsutilError::CommandIo {
            command: cmd.to_string(),
            source: e,
        })?;
    if !output.status.success() {
        return Err(DsutilError::command_failed(cmd, output.status));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.trim_end().lines().map(str::to_string).collect())
}

/// Run a command through the shell, checking the exit status
pub fn run_checked(cmd: &str) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .status()
        .map_err(|e| DsutilError::CommandIo {
            command: cmd.to_string(),
            source: e,
        })?;
    if !status.success() {
        return Err(DsutilError::command_failed(cmd, status));
    }
    Ok(())
}

/// Run a command through the shell, returning whether it succeeded
pub fn run_status(cmd: &str) -> Result<bool> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .status()
        .map_err(|e| DsutilError::CommandIo {
            command: cmd.to_string(),
            source: e,
        })?;
    Ok(status.success())
}
