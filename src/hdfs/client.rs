//! The hdfs dfs client

use crate::error::{DsutilError, IoResultExt, Result};
use crate::fsops::count_path;
use crate::shell::{self, HeaderSpec, ParseOptions, Table};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Default hdfs binary
pub const HDFS_BIN: &str = "/apache/hadoop/bin/hdfs";

/// One row of `hdfs dfs -ls`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdfsEntry {
    pub permissions: String,
    pub replicas: String,
    pub userid: String,
    pub groupid: String,
    pub bytes: u64,
    pub mtime: Option<NaiveDateTime>,
    pub path: String,
}

impl HdfsEntry {
    /// Whether the entry is a directory
    pub fn is_dir(&self) -> bool {
        self.permissions.starts_with('d')
    }
}

/// One row of `hdfs dfs -du`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuEntry {
    pub size: u64,
    pub path: String,
}

/// Typed wrapper around the hdfs command
#[derive(Debug, Clone)]
pub struct HdfsClient {
    /// hdfs binary path
    pub bin: String,
}

impl Default for HdfsClient {
    fn default() -> Self {
        Self {
            bin: HDFS_BIN.to_string(),
        }
    }
}

impl HdfsClient {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// List a path, optionally recursively
    pub fn ls(&self, path: &str, recursive: bool) -> Result<Vec<HdfsEntry>> {
        let cmd = format!(
            "{} dfs -ls {} {}",
            self.bin,
            if recursive { "-R" } else { "" },
            path
        );
        info!("Running command: {cmd} (might take several minutes)");
        let lines = shell::run_lines(&cmd)?;
        self.parse_ls(&cmd, &lines)
    }

    fn parse_ls(&self, cmd: &str, lines: &[String]) -> Result<Vec<HdfsEntry>> {
        let columns = [
            "permissions",
            "replicas",
            "userid",
            "groupid",
            "bytes",
            "mdate",
            "mtime",
            "path",
        ];
        let opts = ParseOptions {
            split: r" +".to_string(),
            header: HeaderSpec::Names(columns.iter().map(|c| c.to_string()).collect()),
            // `-ls` prefixes its output with "Found N items".
            skip: vec![0],
            split_by_header: false,
        };
        let table = Table::from_lines(lines, &opts)?;
        let mut entries = Vec::with_capacity(table.len());
        for row in &table.rows {
            if row.len() < columns.len() {
                continue;
            }
            let bytes = row[4].parse::<u64>().map_err(|e| DsutilError::OutputParse {
                command: cmd.to_string(),
                message: format!("bad byte count '{}': {e}", row[4]),
            })?;
            let mtime =
                NaiveDateTime::parse_from_str(&format!("{} {}", row[5], row[6]), "%Y-%m-%d %H:%M")
                    .ok();
            entries.push(HdfsEntry {
                permissions: row[0].clone(),
                replicas: row[1].clone(),
                userid: row[2].clone(),
                groupid: row[3].clone(),
                bytes,
                mtime,
                path: row[7..].join(" "),
            });
        }
        Ok(entries)
    }

    /// Disk usage of the immediate children of a path
    pub fn du(&self, path: &str) -> Result<Vec<DuEntry>> {
        let cmd = format!("{} dfs -du {}", self.bin, path);
        let lines = shell::run_lines(&cmd)?;
        let mut entries = Vec::with_capacity(lines.len());
        for line in &lines {
            let mut fields = line.split_whitespace();
            let size = fields
                .next()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| DsutilError::OutputParse {
                    command: cmd.clone(),
                    message: format!("bad du line: {line}"),
                })?;
            let path = fields.last().unwrap_or_default().to_string();
            entries.push(DuEntry { size, path });
        }
        Ok(entries)
    }

    /// Disk usage at a given depth below the path. Any depth below 1 is
    /// treated as 1.
    pub fn du_depth(&self, path: &str, depth: usize) -> Result<Vec<DuEntry>> {
        if depth <= 1 {
            return self.du(path);
        }
        let base_len = path.trim_end_matches('/').len();
        let mut entries = Vec::new();
        for entry in self.ls(path, true)? {
            let relative_depth = entry.path[base_len..].matches('/').count();
            if relative_depth + 1 == depth {
                entries.extend(self.du(&entry.path)?);
            }
        }
        Ok(entries)
    }

    /// Quota and usage counters (`hdfs dfs -count -q -v`)
    pub fn count(&self, path: &str) -> Result<Table> {
        let cmd = format!("{} dfs -count -q -v {}", self.bin, path);
        let lines = shell::run_lines(&cmd)?;
        Table::from_lines(
            &lines,
            &ParseOptions {
                split: r" +".to_string(),
                header: HeaderSpec::Row(0),
                ..Default::default()
            },
        )
    }

    /// Whether a path exists
    pub fn exists(&self, path: &str) -> Result<bool> {
        shell::run_status(&format!("{} dfs -test -e {}", self.bin, path))
    }

    /// Whether a path exists and is a file
    pub fn exists_file(&self, path: &str) -> Result<bool> {
        shell::run_status(&format!("{} dfs -test -f {}", self.bin, path))
    }

    /// Remove a path recursively
    pub fn remove(&self, path: &str) -> Result<()> {
        shell::run_checked(&format!("{} dfs -rm -r {}", self.bin, path))
    }

    /// Create a path, with parents
    pub fn mkdir(&self, path: &str) -> Result<()> {
        shell::run_checked(&format!("{} dfs -mkdir -p {}", self.bin, path))?;
        info!("The HDFS path {path} has been created");
        Ok(())
    }

    /// Upload a local path into HDFS
    pub fn put(&self, local: &Path, hdfs_path: &str, create: bool) -> Result<()> {
        if create {
            self.mkdir(hdfs_path)?;
        }
        shell::run_checked(&format!(
            "{} dfs -put -f {} {}",
            self.bin,
            local.display(),
            hdfs_path
        ))?;
        info!(
            "The local path {} has been uploaded into the HDFS path {hdfs_path}",
            local.display()
        );
        Ok(())
    }

    /// Download a path (file contents when `is_file`, otherwise the
    /// children of a directory) into a local directory
    pub fn get(&self, hdfs_path: &str, local_dir: &Path, is_file: bool) -> Result<()> {
        fs::create_dir_all(local_dir).with_path(local_dir)?;
        let source = if is_file {
            hdfs_path.to_string()
        } else {
            format!("{hdfs_path}/*")
        };
        shell::run_checked(&format!(
            "{} dfs -get {} {}",
            self.bin,
            source,
            local_dir.display()
        ))?;
        info!(
            "Content of the HDFS path {hdfs_path} has been fetched into {}",
            local_dir.display()
        );
        Ok(())
    }

    /// Number of part files under a path
    pub fn num_partitions(&self, path: &str) -> Result<usize> {
        let cmd = format!("{} dfs -ls {}/part-* | wc -l", self.bin, path);
        let lines = shell::run_lines(&cmd)?;
        lines
            .first()
            .and_then(|line| line.trim().parse::<usize>().ok())
            .ok_or_else(|| DsutilError::OutputParse {
                command: cmd,
                message: "expected a count".to_string(),
            })
    }

    /// Frequency of parent prefixes among the paths below `path`
    pub fn count_path(&self, path: &str) -> Result<Vec<(String, usize)>> {
        let entries = self.ls(path, true)?;
        Ok(count_path(entries.iter().map(|e| e.path.as_str())))
    }

    /// Sizes of every directory and file below a path, largest first.
    /// Directory sizes are accumulated from the file listing since `-ls`
    /// reports directories as zero bytes.
    pub fn sizes(&self, path: &str) -> Result<Vec<DuEntry>> {
        Ok(sizes_of(&self.ls(path, true)?))
    }
}

/// Accumulate file bytes into every ancestor directory and sort the
/// combined listing largest first
fn sizes_of(entries: &[HdfsEntry]) -> Vec<DuEntry> {
    let mut dir_size: HashMap<String, u64> = HashMap::new();
    for entry in entries {
        if entry.is_dir() {
            dir_size.entry(entry.path.clone()).or_insert(0);
            continue;
        }
        let mut parent = parent_path(&entry.path);
        while let Some(p) = parent {
            *dir_size.entry(p.to_string()).or_insert(0) += entry.bytes;
            parent = parent_path(p);
        }
    }
    let mut sizes: Vec<DuEntry> = entries
        .iter()
        .map(|entry| DuEntry {
            size: if entry.is_dir() {
                dir_size.get(&entry.path).copied().unwrap_or(0)
            } else {
                entry.bytes
            },
            path: entry.path.clone(),
        })
        .collect();
    sizes.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    sizes
}

fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    if idx == 0 {
        return None;
    }
    Some(&trimmed[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> HdfsClient {
        HdfsClient::default()
    }

    fn ls_lines() -> Vec<String> {
        vec![
            "Found 3 items".to_string(),
            "drwxr-xr-x   - alice hdfs          0 2024-03-01 10:00 /data/events".to_string(),
            "-rw-r--r--   3 alice hdfs    1048576 2024-03-01 10:05 /data/events/part-00000"
                .to_string(),
            "-rw-r--r--   3 alice hdfs        512 2024-03-01 10:06 /data/events/part-00001"
                .to_string(),
        ]
    }

    #[test]
    fn test_parse_ls() {
        let entries = client().parse_ls("hdfs dfs -ls", &ls_lines()).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_dir());
        assert_eq!(entries[1].bytes, 1048576);
        assert_eq!(entries[1].path, "/data/events/part-00000");
        assert_eq!(
            entries[1].mtime.unwrap().format("%Y-%m-%d %H:%M").to_string(),
            "2024-03-01 10:05"
        );
    }

    #[test]
    fn test_parse_ls_bad_bytes() {
        let lines = vec![
            "Found 1 items".to_string(),
            "-rw-r--r--   3 alice hdfs    oops 2024-03-01 10:05 /data/x".to_string(),
        ];
        assert!(matches!(
            client().parse_ls("hdfs dfs -ls", &lines),
            Err(DsutilError::OutputParse { .. })
        ));
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/a/b/c"), Some("/a/b"));
        assert_eq!(parent_path("/a/b/"), Some("/a"));
        assert_eq!(parent_path("/a"), None);
    }

    #[test]
    fn test_sizes_accumulate_into_dirs() {
        let entries = client().parse_ls("hdfs dfs -ls", &ls_lines()).unwrap();
        let sizes = sizes_of(&entries);
        assert_eq!(sizes.len(), 3);
        // The directory inherits its files' bytes and sorts first.
        assert_eq!(sizes[0].path, "/data/events");
        assert_eq!(sizes[0].size, 1048576 + 512);
        assert_eq!(sizes[1].path, "/data/events/part-00000");
        assert_eq!(sizes[2].size, 512);
    }

    #[cfg(unix)]
    #[test]
    fn test_du_depth_with_stub_hdfs() {
        use std::os::unix::fs::PermissionsExt;
        // A stand-in hdfs answering -ls -R with a two-level tree and -du
        // with one child line for the queried path.
        let dir = tempfile::TempDir::new().unwrap();
        let stub = dir.path().join("hdfs");
        std::fs::write(
            &stub,
            "#!/bin/sh\n\
             if [ \"$2\" = \"-ls\" ]; then\n\
             echo 'Found 4 items'\n\
             echo 'drwxr-xr-x   - u g          0 2024-03-01 10:00 /data/a'\n\
             echo 'drwxr-xr-x   - u g          0 2024-03-01 10:00 /data/a/x'\n\
             echo '-rw-r--r--   3 u g         10 2024-03-01 10:00 /data/a/f'\n\
             echo '-rw-r--r--   3 u g         20 2024-03-01 10:00 /data/a/x/g'\n\
             else\n\
             echo \"5 $3/child\"\n\
             fi\n",
        )
        .unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();
        let client = HdfsClient::new(stub.display().to_string());
        // Only /data/a sits at depth 2 below the (trailing-slash) query.
        let entries = client.du_depth("/data/", 2).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], DuEntry {
            size: 5,
            path: "/data/a/child".to_string(),
        });
    }
}
