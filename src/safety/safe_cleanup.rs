use crate::config::types::{Result, ScopeError};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

fn removal_error(path: &Path, err: std::io::Error) -> ScopeError {
    ScopeError::Io(std::io::Error::new(
        err.kind(),
        format!("Failed to remove {}: {}", path.display(), err),
    ))
}

/// Entries that vanished between listing and removal count as removed.
fn tolerate_missing(result: std::io::Result<()>, path: &Path) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(removal_error(path, e)),
    }
}

fn remove_dir_contents(dir: &Path, root_dev: u64) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(removal_error(dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| removal_error(dir, e))?;
        let path = entry.path();

        // symlink_metadata: a link is removed as a link, never followed
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(removal_error(&path, e)),
        };

        if meta.file_type().is_dir() {
            if meta.dev() != root_dev {
                return Err(ScopeError::Workspace(format!(
                    "Refusing to cross filesystem boundary at {}",
                    path.display()
                )));
            }
            remove_dir_contents(&path, root_dev)?;
            tolerate_missing(fs::remove_dir(&path), &path)?;
        } else {
            tolerate_missing(fs::remove_file(&path), &path)?;
        }
    }

    Ok(())
}

/// Remove a tree children-first without following symlinks.
///
/// A path that does not exist is treated as already removed.
pub fn remove_tree(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(removal_error(path, e)),
    };

    if !meta.file_type().is_dir() {
        return tolerate_missing(fs::remove_file(path), path);
    }

    remove_dir_contents(path, meta.dev())?;
    tolerate_missing(fs::remove_dir(path), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("jvmscope_cleanup_{}_{}", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn removes_nested_tree() {
        let root = scratch("nested");
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("a/Test.class"), b"\xca\xfe\xba\xbe").unwrap();
        fs::write(root.join("a/b/c/deep.txt"), b"deep").unwrap();

        remove_tree(&root).unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn missing_path_is_success() {
        let root = scratch("missing");
        assert!(remove_tree(&root).is_ok());
        assert!(remove_tree(&root).is_ok());
    }

    #[test]
    fn symlinks_are_not_followed() {
        let root = scratch("link");
        let outside = scratch("outside");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("keep.txt"), b"keep").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("escape")).unwrap();

        remove_tree(&root).unwrap();
        assert!(!root.exists());
        assert!(outside.join("keep.txt").exists());

        remove_tree(&outside).unwrap();
    }

    #[test]
    fn single_file_is_removed() {
        let file = scratch("file");
        fs::write(&file, b"x").unwrap();
        remove_tree(&file).unwrap();
        assert!(!file.exists());
    }
}
