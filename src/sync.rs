use chrono::Utc;
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::error::SyncError;
use crate::fetch::fetch_version;
use crate::listing::parse_listing;
use crate::remote::RemoteStore;
use crate::store::{self, Manifest, Store};
use crate::version::resolve_current;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Run the full cycle even when the local dataset is already complete.
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub action: SyncAction,
    pub version: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// The current pointer already resolved to a complete version; no
    /// network call was made.
    Fresh,
    Updated,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub root: String,
    pub version: Option<String>,
    pub complete: bool,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink: Sync {
    fn event(&self, event: ProgressEvent);
}

/// Sink that forwards progress events to the `tracing` subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        tracing::info!("{}", event.message);
    }
}

/// One sync cycle against a single local store root.
///
/// Cycles against the same root are serialized by an exclusive lock; within
/// a cycle only the publisher mutates the current pointer, and only once.
pub struct Syncer<R: RemoteStore> {
    remote: R,
    store: Store,
    config: ResolvedConfig,
}

impl<R: RemoteStore> Syncer<R> {
    pub fn new(remote: R, store: Store, config: ResolvedConfig) -> Self {
        Self {
            remote,
            store,
            config,
        }
    }

    /// Runs one sync cycle: check freshness, then list, resolve, fetch,
    /// validate, and publish. Any failure past the freshness check leaves
    /// the current pointer exactly as it was.
    pub fn sync(
        &self,
        options: SyncOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SyncOutcome, SyncError> {
        let _lock = self.store.lock()?;
        let required = &self.config.required_files;

        if !options.force {
            if let Some(current) = self.store.read_current()? {
                let dir = self.store.version_dir(&current);
                if store::is_complete(&dir, required) {
                    tracing::info!(version = current.as_str(), "dataset is current");
                    return Ok(SyncOutcome {
                        action: SyncAction::Fresh,
                        version: current,
                        path: dir.into_string(),
                    });
                }
            }
        }

        sink.event(ProgressEvent {
            message: format!("listing versions at {}", self.config.remote_url),
        });
        let lines = self.remote.list_versions()?;
        let entries = parse_listing(&lines)?;
        let version = resolve_current(&entries, &self.config.latest_alias)?;

        sink.event(ProgressEvent {
            message: format!("fetching version {version}"),
        });
        let staging = fetch_version(
            &self.remote,
            &self.store,
            &version,
            self.config.workers,
            sink,
        )?;

        let files = list_file_names(&staging)?;
        self.store.write_manifest(
            &version,
            &Manifest {
                version: version.clone(),
                source: self.config.remote_url.clone(),
                fetched_at: Utc::now().to_rfc3339(),
                files,
            },
        )?;

        self.store.publish(&version, required)?;
        tracing::info!(version = version.as_str(), "published");

        Ok(SyncOutcome {
            action: SyncAction::Updated,
            version,
            path: staging.into_string(),
        })
    }

    /// Read-only report of the locally published state.
    pub fn status(&self) -> Result<StatusReport, SyncError> {
        let version = self.store.read_current()?;
        let (complete, missing) = match &version {
            Some(version) => {
                let dir = self.store.version_dir(version);
                let missing = store::missing_files(&dir, &self.config.required_files);
                (missing.is_empty(), missing)
            }
            None => (false, self.config.required_files.clone()),
        };
        Ok(StatusReport {
            root: self.store.root().to_string(),
            version,
            complete,
            missing,
        })
    }
}

fn list_file_names(dir: &camino::Utf8Path) -> Result<Vec<String>, SyncError> {
    let mut names = Vec::new();
    let entries =
        std::fs::read_dir(dir.as_std_path()).map_err(|err| SyncError::Filesystem(err.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|err| SyncError::Filesystem(err.to_string()))?;
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with('.') || name == store::MANIFEST_NAME {
                continue;
            }
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
