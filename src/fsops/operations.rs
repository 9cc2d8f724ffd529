//! Directory reshaping and file conveniences

use crate::error::{DsutilError, IoResultExt, Result};
use globset::Glob;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copy a file, doing nothing when the source does not exist.
/// Returns whether a copy was made.
pub fn copy_if_exists(src: &Path, dst: &Path) -> bool {
    if !src.exists() {
        return false;
    }
    let target = if dst.is_dir() {
        dst.join(src.file_name().unwrap_or_default())
    } else {
        dst.to_path_buf()
    };
    fs::copy(src, target).is_ok()
}

/// Symlink a file, doing nothing when the source does not exist. An existing
/// destination is replaced. Returns whether a link was created.
#[cfg(unix)]
pub fn link_if_exists(src: &Path, dst: &Path) -> bool {
    if !src.exists() {
        return false;
    }
    if dst.exists() || dst.is_symlink() {
        let removed = if dst.is_dir() && !dst.is_symlink() {
            fs::remove_dir_all(dst).is_ok()
        } else {
            fs::remove_file(dst).is_ok()
        };
        if !removed {
            return false;
        }
    }
    std::os::unix::fs::symlink(src, dst).is_ok()
}

/// Move the files of immediate subdirectories up into `dir` and remove the
/// emptied subdirectories
pub fn flatten_dir(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).with_path(dir)? {
        let path = entry.with_path(dir)?.path();
        if path.is_dir() {
            for sub in fs::read_dir(&path).with_path(&path)? {
                let sub = sub.with_path(&path)?.path();
                let target = dir.join(sub.file_name().unwrap_or_default());
                fs::rename(&sub, &target).with_path(&sub)?;
            }
            fs::remove_dir(&path).with_path(&path)?;
        }
    }
    Ok(())
}

/// Partition the files of a directory into numbered batch subdirectories of
/// `batch_size` files each. Batch names are zero-padded so they sort. The
/// move is rename-based and cheap; a progress bar tracks the batches.
pub fn split_dir(dir: &Path, batch_size: usize, wildcard: &str) -> Result<usize> {
    if batch_size == 0 {
        return Err(DsutilError::config("batch size must be positive"));
    }
    let glob = Glob::new(wildcard)
        .map_err(|e| DsutilError::config(format!("bad wildcard '{wildcard}': {e}")))?
        .compile_matcher();
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_path(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|name| glob.is_match(name))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    let num_batches = files.len().div_ceil(batch_size);
    let width = num_batches.to_string().len();
    let bar = ProgressBar::new(num_batches as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("Invalid template")
            .progress_chars("=> "),
    );
    bar.set_prefix("Batches");
    for (batch_idx, chunk) in files.chunks(batch_size).enumerate() {
        let subdir = dir.join(format!("{batch_idx:0>width$}"));
        fs::create_dir_all(&subdir).with_path(&subdir)?;
        for path in chunk {
            let target = subdir.join(path.file_name().unwrap_or_default());
            fs::rename(path, &target).with_path(path)?;
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(num_batches)
}

/// Patterns applied to a text file by [`update_file`]
#[derive(Debug, Clone, Default)]
pub struct FileUpdate {
    /// Regex substitutions, applied in order
    pub regex: Vec<(String, String)>,
    /// Exact substring replacements, applied in order
    pub exact: Vec<(String, String)>,
    /// Text appended to the file
    pub append: Option<String>,
    /// Skip appending when the text is already present
    pub exist_skip: bool,
}

/// Rewrite a text file in place with substitutions and appends
pub fn update_file(path: &Path, update: &FileUpdate) -> Result<()> {
    let mut text = fs::read_to_string(path).with_path(path)?;
    for (pattern, replacement) in &update.regex {
        let re = Regex::new(pattern)
            .map_err(|e| DsutilError::config(format!("bad pattern '{pattern}': {e}")))?;
        text = re.replace_all(&text, replacement.as_str()).into_owned();
    }
    for (pattern, replacement) in &update.exact {
        text = text.replace(pattern, replacement);
    }
    if let Some(append) = &update.append {
        if !update.exist_skip || !text.contains(append) {
            text.push_str(append);
        }
    }
    fs::write(path, text).with_path(path)
}

/// Recursively collect files with one of the given extensions (compared
/// case-insensitively, with the leading dot, e.g. `.txt`)
pub fn get_files(dir: &Path, exts: &[String]) -> Vec<PathBuf> {
    let exts: Vec<String> = exts.iter().map(|e| e.to_lowercase()).collect();
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| exts.contains(&format!(".{}", ext.to_string_lossy().to_lowercase())))
                .unwrap_or(false)
        })
        .collect()
}

/// Count how often each parent prefix occurs among the given paths,
/// most frequent first (ties broken by path)
pub fn count_path<I, S>(paths: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut freq: HashMap<String, usize> = HashMap::new();
    for path in paths {
        let path = path.as_ref().trim_end_matches('/');
        let fields: Vec<&str> = path.split('/').collect();
        let mut prefix = String::new();
        // The final component is the entry itself, not a parent.
        for field in &fields[..fields.len().saturating_sub(1)] {
            prefix.push_str(field);
            prefix.push('/');
            *freq.entry(prefix.clone()).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<(String, usize)> = freq.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_copy_if_exists() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        assert!(!copy_if_exists(&src, &dst));
        touch(&src);
        assert!(copy_if_exists(&src, &dst));
        assert!(dst.is_file());
    }

    #[test]
    fn test_flatten_dir() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        touch(&sub.join("a.txt"));
        touch(&sub.join("b.txt"));
        flatten_dir(dir.path()).unwrap();
        assert!(dir.path().join("a.txt").is_file());
        assert!(dir.path().join("b.txt").is_file());
        assert!(!sub.exists());
    }

    #[test]
    fn test_split_dir_batches() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            touch(&dir.path().join(format!("f{i}.csv")));
        }
        touch(&dir.path().join("skip.txt"));
        let batches = split_dir(dir.path(), 2, "*.csv").unwrap();
        assert_eq!(batches, 3);
        assert!(dir.path().join("0").join("f0.csv").is_file());
        assert!(dir.path().join("2").join("f4.csv").is_file());
        // Non-matching files stay put.
        assert!(dir.path().join("skip.txt").is_file());
    }

    #[test]
    fn test_update_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.txt");
        fs::write(&path, "workers = 4\nname = old\n").unwrap();
        let update = FileUpdate {
            regex: vec![(r"workers = \d+".into(), "workers = 8".into())],
            exact: vec![("name = old".into(), "name = new".into())],
            append: Some("extra = 1\n".into()),
            exist_skip: true,
        };
        update_file(&path, &update).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "workers = 8\nname = new\nextra = 1\n");
        // Appending again is a no-op with exist_skip.
        update_file(&path, &update).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn test_get_files_by_extension() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        touch(&dir.path().join("a.TXT"));
        touch(&sub.join("b.txt"));
        touch(&sub.join("c.csv"));
        let mut files = get_files(dir.path(), &[".txt".to_string()]);
        files.sort();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_count_path() {
        let counts = count_path(["/a/b/x.txt", "/a/b/y.txt", "/a/c/z.txt"]);
        let lookup: HashMap<_, _> = counts.into_iter().collect();
        assert_eq!(lookup["/a/"], 3);
        assert_eq!(lookup["/a/b/"], 2);
        assert_eq!(lookup["/a/c/"], 1);
    }
}
