//! Role directory scanning and file manipulation
//!
//! Every operation takes the role root explicitly: the process working
//! directory is never changed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::path::ExcludeSet;

/// List the files under `root`, as sorted root-relative paths.
///
/// Excluded paths are pruned (an excluded directory is not descended into),
/// and so is any top-level entry named in `skip`, e.g. the build directory.
pub fn scan(root: &Path, excludes: &ExcludeSet, skip: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let Ok(relative) = entry.path().strip_prefix(root) else {
                return false;
            };
            let skipped = entry.depth() == 1
                && skip
                    .iter()
                    .any(|name| entry.file_name().to_string_lossy() == *name);
            !skipped && !excludes.is_excluded(relative)
        });

    for entry in walker {
        let entry = entry.map_err(|e| Error::Filesystem {
            message: format!("Failed to scan '{}': {}", root.display(), e),
        })?;
        if entry.file_type().is_file() {
            if let Ok(relative) = entry.path().strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }
    }

    Ok(files)
}

/// List the names of the top-level directories of `root`, sorted.
pub fn top_level_dirs(root: &Path, excludes: &ExcludeSet) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !excludes.is_excluded(Path::new(&name)) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Modification time of `path`, or `None` if it does not exist.
pub fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Write `content` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
            message: format!("Failed to create directory '{}': {}", parent.display(), e),
        })?;
    }
    log::info!("writing {}", path.display());
    fs::write(path, content).map_err(|e| Error::Filesystem {
        message: format!("Failed to write file '{}': {}", path.display(), e),
    })
}

/// Remove a file or a directory tree. Returns whether anything was removed.
pub fn remove(path: &Path) -> Result<bool> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(false);
    };
    log::info!("removing {}", path.display());
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| Error::Filesystem {
        message: format!("Failed to remove '{}': {}", path.display(), e),
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn role_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_file(&root.join("meta/main.yml"), "---\n").unwrap();
        write_file(&root.join("tasks/install.yml"), "---\n").unwrap();
        write_file(&root.join("tasks/.install.yml.swp"), "x").unwrap();
        write_file(&root.join(".git/HEAD"), "ref").unwrap();
        write_file(&root.join("dist/foo-0.0.1.tgz"), "x").unwrap();
        temp
    }

    #[test]
    fn test_scan_is_sorted_and_excludes() {
        let temp = role_tree();
        let excludes = ExcludeSet::from_csv(".*").unwrap();
        let files = scan(temp.path(), &excludes, &["dist"]).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("meta/main.yml"),
                PathBuf::from("tasks/install.yml")
            ]
        );
    }

    #[test]
    fn test_scan_without_excludes_sees_everything() {
        let temp = role_tree();
        let files = scan(temp.path(), &ExcludeSet::default(), &[]).unwrap();
        assert_eq!(files.len(), 5);
    }

    #[test]
    fn test_top_level_dirs() {
        let temp = role_tree();
        let excludes = ExcludeSet::from_csv(".*").unwrap();
        let dirs = top_level_dirs(temp.path(), &excludes).unwrap();
        assert_eq!(dirs, vec!["dist", "meta", "tasks"]);
    }

    #[test]
    fn test_remove_file_and_dir() {
        let temp = role_tree();
        assert!(remove(&temp.path().join("dist")).unwrap());
        assert!(!temp.path().join("dist").exists());
        assert!(remove(&temp.path().join("meta/main.yml")).unwrap());
        assert!(!remove(&temp.path().join("meta/main.yml")).unwrap());
    }

    #[test]
    fn test_modified() {
        let temp = role_tree();
        assert!(modified(&temp.path().join("meta/main.yml")).is_some());
        assert!(modified(&temp.path().join("nope")).is_none());
    }
}
