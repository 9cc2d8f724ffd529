//! Merging part files

use crate::error::{DsutilError, IoResultExt, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Decide whether the files share a header by comparing the first line of
/// the first `num_files` non-empty files
pub fn has_header(files: &[PathBuf], num_files: usize) -> Result<bool> {
    let mut candidate: Option<String> = None;
    let mut checked = 0usize;
    for path in files {
        if checked >= num_files {
            break;
        }
        let mut reader = BufReader::new(File::open(path).with_path(path)?);
        let mut first_line = String::new();
        reader.read_line(&mut first_line).with_path(path)?;
        if first_line.is_empty() {
            continue;
        }
        checked += 1;
        match &candidate {
            None => candidate = Some(first_line),
            Some(header) => {
                if *header != first_line {
                    return Ok(false);
                }
            }
        }
    }
    Ok(candidate.is_some())
}

/// Merge files into `output` (stdout when None). When the first lines of
/// the first `probe` non-empty files agree they are treated as a header and
/// only one copy is kept.
pub fn merge(files: &[PathBuf], output: Option<&Path>, probe: usize) -> Result<()> {
    if files.is_empty() {
        return Err(DsutilError::config("no files to merge"));
    }
    let probe = if probe == 0 {
        files.len().min(10)
    } else {
        probe
    };
    let mut writer = open_output(output)?;
    if has_header(files, probe)? {
        merge_with_header(files, &mut writer)
    } else {
        merge_plain(files, &mut writer)
    }
}

/// Merge every file in a directory
pub fn merge_dir(dir: &Path, output: Option<&Path>, probe: usize) -> Result<()> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_path(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    merge(&files, output, probe)
}

fn merge_with_header(files: &[PathBuf], writer: &mut dyn Write) -> Result<()> {
    // First file verbatim, then every other file minus its first line.
    copy_file(&files[0], writer)?;
    for path in &files[1..] {
        let mut reader = BufReader::new(File::open(path).with_path(path)?);
        let mut header = String::new();
        reader.read_line(&mut header).with_path(path)?;
        std::io::copy(&mut reader, writer).with_path(path)?;
    }
    Ok(())
}

fn merge_plain(files: &[PathBuf], writer: &mut dyn Write) -> Result<()> {
    for path in files {
        copy_file(path, writer)?;
        writer.write_all(b"\n").with_path(path)?;
    }
    Ok(())
}

fn copy_file(path: &Path, writer: &mut dyn Write) -> Result<()> {
    let mut reader = BufReader::new(File::open(path).with_path(path)?);
    std::io::copy(&mut reader, writer).with_path(path)?;
    Ok(())
}

/// Drop header lines repeated mid-file (a `hdfs dfs -getmerge` artifact):
/// the first line is the header and any later identical line is removed
pub fn dedup_header(file: &Path, output: Option<&Path>) -> Result<()> {
    let reader = BufReader::new(File::open(file).with_path(file)?);
    let mut writer = open_output(output)?;
    let mut header: Option<String> = None;
    for line in reader.lines() {
        let line = line.with_path(file)?;
        match &header {
            None => {
                header = Some(line.clone());
                writeln!(writer, "{line}").with_path(file)?;
            }
            Some(h) => {
                if line != *h {
                    writeln!(writer, "{line}").with_path(file)?;
                }
            }
        }
    }
    writer.flush().with_path(file)?;
    Ok(())
}

/// Stream-remove `"value_counts": { ... }` blocks from a JSON profiling
/// dump. The blocks are large and uninteresting for diffing profiles.
pub fn prune_json<R: Read>(input: R, writer: &mut dyn Write) -> Result<()> {
    let reader = BufReader::new(input);
    let mut skipping = false;
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed == "\"value_counts\": {" {
            skipping = true;
            continue;
        }
        if skipping {
            if trimmed == "}" || trimmed == "}," {
                skipping = false;
            }
            continue;
        }
        writeln!(writer, "{trimmed}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Prune a JSON file on disk. When `output` is None the result lands next
/// to the input as `<stem>_prune.json`.
pub fn prune_json_file(input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let out = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = input
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned();
            input.with_file_name(format!("{stem}_prune.json"))
        }
    };
    let file = File::open(input).with_path(input)?;
    let mut writer = BufWriter::new(File::create(&out).with_path(&out)?);
    prune_json(file, &mut writer)?;
    Ok(out)
}

pub(crate) fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) => Ok(Box::new(BufWriter::new(
            File::create(path).with_path(path)?,
        ))),
        None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_files(dir: &TempDir, contents: &[&str]) -> Vec<PathBuf> {
        contents
            .iter()
            .enumerate()
            .map(|(idx, content)| {
                let path = dir.path().join(format!("part-{idx:05}"));
                fs::write(&path, content).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_merge_keeps_single_header() {
        let dir = TempDir::new().unwrap();
        let files = write_files(&dir, &["id,name\n1,a\n", "id,name\n2,b\n"]);
        let out = dir.path().join("merged.csv");
        merge(&files, Some(&out), 5).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "id,name\n1,a\n2,b\n");
    }

    #[test]
    fn test_merge_without_headers() {
        let dir = TempDir::new().unwrap();
        let files = write_files(&dir, &["1,a\n", "2,b\n"]);
        let out = dir.path().join("merged.csv");
        merge(&files, Some(&out), 5).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "1,a\n\n2,b\n\n");
    }

    #[test]
    fn test_has_header_disagreement() {
        let dir = TempDir::new().unwrap();
        let files = write_files(&dir, &["id,name\n", "other\n"]);
        assert!(!has_header(&files, 5).unwrap());
    }

    #[test]
    fn test_dedup_header() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("merged.csv");
        fs::write(&input, "id,name\n1,a\nid,name\n2,b\n").unwrap();
        let out = dir.path().join("clean.csv");
        dedup_header(&input, Some(&out)).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "id,name\n1,a\n2,b\n");
    }

    #[test]
    fn test_prune_json() {
        let input = concat!(
            "{\n",
            "\"field\": \"price\",\n",
            "\"value_counts\": {\n",
            "\"1\": 100,\n",
            "\"2\": 200\n",
            "},\n",
            "\"mean\": 1.5\n",
            "}\n",
        );
        let mut out = Vec::new();
        prune_json(input.as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"mean\": 1.5"));
        assert!(!text.contains("value_counts"));
        assert!(!text.contains("100"));
    }

    #[test]
    fn test_prune_json_file_default_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("profile.json");
        fs::write(&input, "{\n\"a\": 1\n}\n").unwrap();
        let out = prune_json_file(&input, None).unwrap();
        assert!(out.ends_with("profile_prune.json"));
        assert!(out.is_file());
    }
}
