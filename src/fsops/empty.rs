//! Essentially-empty directory detection and cleanup
//!
//! A directory counts as essentially empty when, ignoring dotfiles and tool
//! droppings, it contains no real file at any depth. Such directories
//! accumulate under shared scratch spaces and only add noise.

use crate::error::{DsutilError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory names that never count as content
const IGNORED_DIRS: [&str; 4] = [".ipynb_checkpoints", ".mypy_cache", ".mtj.tmp", "__pycache__"];

/// Default ignore rule: hidden files and tool cache directories
pub fn default_ignore(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return false,
    };
    if path.is_file() && name.starts_with('.') {
        return true;
    }
    path.is_dir() && IGNORED_DIRS.contains(&name.as_ref())
}

/// Check whether a directory is essentially empty
pub fn is_ess_empty(path: &Path) -> Result<bool> {
    let mut cache = HashMap::new();
    is_ess_empty_cached(path, &mut cache)
}

fn is_ess_empty_cached(path: &Path, cache: &mut HashMap<PathBuf, bool>) -> Result<bool> {
    if !path.exists() {
        return Err(DsutilError::NotFound(path.to_path_buf()));
    }
    if path.is_symlink() {
        return Ok(true);
    }
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if let Some(&cached) = cache.get(&resolved) {
        return Ok(cached);
    }
    if default_ignore(&resolved) {
        return Ok(true);
    }
    let entries = match fs::read_dir(&resolved) {
        Ok(entries) => entries,
        // Unreadable directories might hold anything; treat as non-empty.
        Err(_) => return Ok(false),
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry.path(),
            Err(_) => return Ok(false),
        };
        if default_ignore(&entry) {
            continue;
        }
        if entry.is_file() {
            cache.insert(resolved, false);
            return Ok(false);
        }
        if entry.is_dir() && !is_ess_empty_cached(&entry, cache)? {
            cache.insert(resolved, false);
            return Ok(false);
        }
    }
    cache.insert(resolved, true);
    Ok(true)
}

/// Find the top-most essentially empty directories under a path
pub fn find_ess_empty(path: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut cache = HashMap::new();
    find_ess_empty_helper(path, &mut cache, &mut found)?;
    Ok(found)
}

fn find_ess_empty_helper(
    path: &Path,
    cache: &mut HashMap<PathBuf, bool>,
    found: &mut Vec<PathBuf>,
) -> Result<()> {
    if is_ess_empty_cached(path, cache)? {
        found.push(path.to_path_buf());
        return Ok(());
    }
    for entry in fs::read_dir(path).into_iter().flatten().flatten() {
        let entry = entry.path();
        if entry.is_dir() && !entry.is_symlink() {
            find_ess_empty_helper(&entry, cache, found)?;
        }
    }
    Ok(())
}

/// Remove essentially empty directories under a path, returning the paths
/// that could not be removed
pub fn remove_ess_empty(path: &Path) -> Result<Vec<PathBuf>> {
    let mut failed = Vec::new();
    for target in find_ess_empty(path)? {
        let result = if target.is_file() || target.is_symlink() {
            fs::remove_file(&target)
        } else {
            fs::remove_dir_all(&target)
        };
        if result.is_err() {
            failed.push(target);
        }
    }
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_dir_is_ess_empty() {
        let dir = TempDir::new().unwrap();
        assert!(is_ess_empty(dir.path()).unwrap());
    }

    #[test]
    fn test_real_file_breaks_emptiness() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("data.txt"), b"x").unwrap();
        assert!(!is_ess_empty(dir.path()).unwrap());
    }

    #[test]
    fn test_droppings_do_not_count() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        let cache = dir.path().join("__pycache__");
        fs::create_dir(&cache).unwrap();
        fs::write(cache.join("mod.pyc"), b"x").unwrap();
        assert!(is_ess_empty(dir.path()).unwrap());
    }

    #[test]
    fn test_nested_content_detected() {
        let dir = TempDir::new().unwrap();
        let deep = dir.path().join("a").join("b");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("keep.txt"), b"x").unwrap();
        assert!(!is_ess_empty(dir.path()).unwrap());
    }

    #[test]
    fn test_find_returns_topmost() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("empty").join("inner")).unwrap();
        let busy = dir.path().join("busy");
        fs::create_dir(&busy).unwrap();
        fs::write(busy.join("f.txt"), b"x").unwrap();
        let found = find_ess_empty(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("empty"));
    }

    #[test]
    fn test_remove_ess_empty() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("empty").join("inner")).unwrap();
        fs::write(dir.path().join("keep.txt"), b"x").unwrap();
        let failed = remove_ess_empty(dir.path()).unwrap();
        assert!(failed.is_empty());
        assert!(!dir.path().join("empty").exists());
        assert!(dir.path().join("keep.txt").is_file());
    }

    #[test]
    fn test_missing_path_errors() {
        assert!(matches!(
            is_ess_empty(Path::new("/no/such/dir")),
            Err(DsutilError::NotFound(_))
        ));
    }
}
