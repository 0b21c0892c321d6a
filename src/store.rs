use std::fs::{self, File, OpenOptions};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const CURRENT_LINK_NAME: &str = "current";
pub const MANIFEST_NAME: &str = "manifest.json";

const LOCK_FILE_NAME: &str = ".lock";
const SCRATCH_LINK_NAME: &str = ".current.new";

/// Local store layout: `<root>/<version>/<files...>` per fetched version,
/// `<root>/current` designating one of them. Every operation takes the root
/// explicitly; nothing depends on the process working directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, SyncError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("refdb-sync")).ok()
            })
            .ok_or_else(|| SyncError::Filesystem("unable to resolve store root".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn version_dir(&self, version: &str) -> Utf8PathBuf {
        self.root.join(version)
    }

    pub fn current_link(&self) -> Utf8PathBuf {
        self.root.join(CURRENT_LINK_NAME)
    }

    pub fn ensure_root(&self) -> Result<(), SyncError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }

    /// Takes the exclusive cycle lock for this store root. Held until the
    /// returned guard is dropped.
    pub fn lock(&self) -> Result<SyncLock, SyncError> {
        self.ensure_root()?;
        let path = self.root.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        file.try_lock_exclusive()
            .map_err(|_| SyncError::LockContention(self.root.clone()))?;
        Ok(SyncLock { file })
    }

    /// Version name the `current` pointer resolves to, `None` when nothing
    /// has been published yet.
    pub fn read_current(&self) -> Result<Option<String>, SyncError> {
        read_pointer(&self.current_link())
    }

    /// Atomically points `current` at the given version directory.
    ///
    /// Precondition: the directory holds every required file; a violation
    /// fails with `IncompleteStagingDirectory` and leaves the pointer
    /// untouched. Re-publishing the already-current version is a no-op.
    /// The swap is a rename of a freshly created pointer, never a
    /// delete-then-create, so the pointer stays valid at all times.
    pub fn publish(&self, version: &str, required: &[String]) -> Result<(), SyncError> {
        let dir = self.version_dir(version);
        let missing = missing_files(&dir, required);
        if !missing.is_empty() {
            return Err(SyncError::IncompleteStagingDirectory { path: dir, missing });
        }

        if self.read_current()?.as_deref() == Some(version) {
            return Ok(());
        }

        let scratch = self.root.join(SCRATCH_LINK_NAME);
        if scratch
            .as_std_path()
            .symlink_metadata()
            .is_ok()
        {
            fs::remove_file(scratch.as_std_path())
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        }
        create_pointer(&scratch, version)?;
        fs::rename(scratch.as_std_path(), self.current_link().as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }

    pub fn write_manifest(&self, version: &str, manifest: &Manifest) -> Result<(), SyncError> {
        let dir = self.version_dir(version);
        let path = dir.join(MANIFEST_NAME);
        let content = serde_json::to_vec_pretty(manifest)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix(".manifest")
            .tempfile_in(dir.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), &content).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        if path.as_std_path().exists() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        }
        temp.persist(path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Guard for the per-root sync cycle lock; releases on drop.
#[derive(Debug)]
pub struct SyncLock {
    file: File,
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// True iff `path` is a directory containing every file in `required`.
pub fn is_complete(path: &Utf8Path, required: &[String]) -> bool {
    path.as_std_path().is_dir() && missing_files(path, required).is_empty()
}

pub fn missing_files(path: &Utf8Path, required: &[String]) -> Vec<String> {
    if !path.as_std_path().is_dir() {
        return required.to_vec();
    }
    required
        .iter()
        .filter(|name| !path.join(name.as_str()).as_std_path().is_file())
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub source: String,
    pub fetched_at: String,
    pub files: Vec<String>,
}

#[cfg(unix)]
fn create_pointer(path: &Utf8Path, version: &str) -> Result<(), SyncError> {
    std::os::unix::fs::symlink(version, path.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))
}

#[cfg(not(unix))]
fn create_pointer(path: &Utf8Path, version: &str) -> Result<(), SyncError> {
    fs::write(path.as_std_path(), version).map_err(|err| SyncError::Filesystem(err.to_string()))
}

#[cfg(unix)]
fn read_pointer(link: &Utf8Path) -> Result<Option<String>, SyncError> {
    match fs::read_link(link.as_std_path()) {
        Ok(target) => {
            let name = target
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    SyncError::Filesystem(format!("unreadable pointer target at {link}"))
                })?;
            Ok(Some(name))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SyncError::Filesystem(err.to_string())),
    }
}

#[cfg(not(unix))]
fn read_pointer(link: &Utf8Path) -> Result<Option<String>, SyncError> {
    match fs::read_to_string(link.as_std_path()) {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SyncError::Filesystem(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new_with_root(Utf8PathBuf::from("/data/refdb"));
        assert_eq!(store.version_dir("2024-01-01"), "/data/refdb/2024-01-01");
        assert_eq!(store.current_link(), "/data/refdb/current");
    }

    #[test]
    fn missing_files_of_absent_dir() {
        let required = vec!["A.tab".to_string(), "B.lib".to_string()];
        let missing = missing_files(Utf8Path::new("/no/such/dir"), &required);
        assert_eq!(missing, required);
    }
}
