/// Request-scoped workspaces
///
/// Each pipeline run owns exactly one directory under the temp root. The
/// directory is removed by `release`, and by `Drop` on any path that skips it.
use crate::config::types::{Result, ScopeError};
use crate::safety::safe_cleanup;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

const CREATE_ATTEMPTS: usize = 3;

/// Isolated directory for one pipeline run
#[derive(Debug)]
pub struct Workspace {
    /// Directory name (prefix + random id)
    name: String,
    path: PathBuf,
    created_at: DateTime<Utc>,
    released: bool,
}

impl Workspace {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time since the workspace was acquired
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Path of a file directly inside the workspace
    pub fn file(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    /// Recursively delete the workspace.
    ///
    /// A directory that is already gone counts as released.
    pub fn release(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        safe_cleanup::remove_tree(&self.path)?;
        self.released = true;
        log::debug!(
            "Released workspace {} after {}ms",
            self.path.display(),
            self.age().num_milliseconds()
        );
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.remove() {
            log::warn!(
                "Failed to remove workspace {} on drop: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Allocates workspaces under one temp root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    temp_root: PathBuf,
    prefix: String,
}

impl WorkspaceManager {
    /// Create a manager; the temp root is created if missing
    pub fn new(temp_root: PathBuf, prefix: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&temp_root).map_err(|e| {
            ScopeError::Workspace(format!(
                "Failed to create temp root {}: {}",
                temp_root.display(),
                e
            ))
        })?;

        Ok(Self {
            temp_root,
            prefix: prefix.into(),
        })
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Create a uniquely named, owner-only directory
    pub fn acquire(&self) -> Result<Workspace> {
        let mut last_err = None;

        for _ in 0..CREATE_ATTEMPTS {
            let name = format!("{}{}", self.prefix, Uuid::new_v4().simple());
            let path = self.temp_root.join(&name);

            // create_dir, not create_dir_all: an existing directory must never be shared
            match fs::DirBuilder::new().mode(0o700).create(&path) {
                Ok(()) => {
                    log::debug!("Created workspace {}", path.display());
                    return Ok(Workspace {
                        name,
                        path,
                        created_at: Utc::now(),
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    log::warn!("Workspace name collision at {}, retrying", path.display());
                    last_err = Some(e);
                }
                Err(e) => {
                    return Err(ScopeError::Workspace(format!(
                        "Failed to create workspace directory {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(ScopeError::Workspace(format!(
            "Failed to allocate a unique workspace under {}: {}",
            self.temp_root.display(),
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Directories under the temp root that carry this manager's prefix
    pub fn owned_workspaces(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.temp_root).map_err(|e| {
            ScopeError::Workspace(format!(
                "Failed to read temp root {}: {}",
                self.temp_root.display(),
                e
            ))
        })?;

        let mut owned = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            let is_ours = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&self.prefix))
                .unwrap_or(false);
            if is_ours && entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                owned.push(entry.path());
            }
        }
        Ok(owned)
    }

    /// Remove owned workspaces last modified more than `max_age` ago.
    ///
    /// Covers directories leaked by a process that died mid-run.
    pub fn reap_orphans(&self, max_age: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut reaped = 0;

        for path in self.owned_workspaces()? {
            let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Failed to stat {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = match now.duration_since(modified) {
                Ok(d) => d,
                Err(_) => continue, // future timestamp
            };

            if age >= max_age {
                match safe_cleanup::remove_tree(&path) {
                    Ok(()) => {
                        log::info!("Reaped orphaned workspace {}", path.display());
                        reaped += 1;
                    }
                    Err(e) => log::warn!("Failed to reap {}: {}", path.display(), e),
                }
            }
        }

        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(name: &str) -> WorkspaceManager {
        let root = std::env::temp_dir().join(format!("jvmscope_ws_{}_{}", name, Uuid::new_v4()));
        WorkspaceManager::new(root, "jvmscope-").unwrap()
    }

    #[test]
    fn acquire_creates_unique_directories() {
        let manager = manager("unique");
        let a = manager.acquire().unwrap();
        let b = manager.acquire().unwrap();

        assert!(a.path().is_dir());
        assert!(b.path().is_dir());
        assert_ne!(a.path(), b.path());
        assert!(a.name().starts_with("jvmscope-"));
        // prefix + 32 hex chars of a v4 uuid
        assert_eq!(a.name().len(), "jvmscope-".len() + 32);

        a.release().unwrap();
        b.release().unwrap();
        safe_cleanup::remove_tree(manager.temp_root()).unwrap();
    }

    #[test]
    fn release_removes_contents() {
        let manager = manager("release");
        let workspace = manager.acquire().unwrap();
        let path = workspace.path().to_path_buf();
        fs::write(workspace.file("Test.java"), "class Test {}").unwrap();
        fs::create_dir(workspace.file("nested")).unwrap();
        fs::write(path.join("nested/Test.class"), b"\xca\xfe").unwrap();

        workspace.release().unwrap();
        assert!(!path.exists());
        safe_cleanup::remove_tree(manager.temp_root()).unwrap();
    }

    #[test]
    fn age_counts_from_acquisition() {
        let manager = manager("age");
        let before = Utc::now();
        let workspace = manager.acquire().unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert!(workspace.created_at() >= before);
        assert!(workspace.age() >= chrono::Duration::milliseconds(20));

        workspace.release().unwrap();
        safe_cleanup::remove_tree(manager.temp_root()).unwrap();
    }

    #[test]
    fn release_tolerates_already_deleted_directory() {
        let manager = manager("gone");
        let workspace = manager.acquire().unwrap();
        fs::remove_dir_all(workspace.path()).unwrap();
        assert!(workspace.release().is_ok());
        safe_cleanup::remove_tree(manager.temp_root()).unwrap();
    }

    #[test]
    fn drop_removes_unreleased_workspace() {
        let manager = manager("drop");
        let path = {
            let workspace = manager.acquire().unwrap();
            fs::write(workspace.file("Test.java"), "x").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
        safe_cleanup::remove_tree(manager.temp_root()).unwrap();
    }

    #[test]
    fn drop_runs_during_unwind() {
        let manager = manager("unwind");
        let manager_in = manager.clone();
        let result = std::panic::catch_unwind(move || {
            let _workspace = manager_in.acquire().unwrap();
            panic!("stage fault");
        });
        assert!(result.is_err());
        assert!(manager.owned_workspaces().unwrap().is_empty());
        safe_cleanup::remove_tree(manager.temp_root()).unwrap();
    }

    #[test]
    fn reaper_only_touches_prefixed_directories() {
        let manager = manager("reap");
        let foreign = manager.temp_root().join("someone-else");
        fs::create_dir(&foreign).unwrap();

        let leaked = manager.acquire().unwrap();
        let leaked_path = leaked.path().to_path_buf();
        std::mem::forget(leaked);

        let reaped = manager.reap_orphans(Duration::from_secs(0)).unwrap();
        assert_eq!(reaped, 1);
        assert!(!leaked_path.exists());
        assert!(foreign.exists());

        safe_cleanup::remove_tree(manager.temp_root()).unwrap();
    }

    #[test]
    fn reaper_keeps_fresh_workspaces() {
        let manager = manager("fresh");
        let workspace = manager.acquire().unwrap();

        let reaped = manager.reap_orphans(Duration::from_secs(3600)).unwrap();
        assert_eq!(reaped, 0);
        assert!(workspace.path().exists());

        workspace.release().unwrap();
        safe_cleanup::remove_tree(manager.temp_root()).unwrap();
    }
}
