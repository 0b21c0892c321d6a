use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use camino::Utf8PathBuf;

use crate::error::SyncError;
use crate::remote::RemoteStore;
use crate::store::Store;
use crate::sync::{ProgressEvent, ProgressSink};

/// Transfers are network-bound; a small constant beats sizing to cores.
pub const DEFAULT_WORKERS: usize = 4;

/// Retrieves every file of the remote `version` into the staging directory
/// `<root>/<version>` and returns its path.
///
/// File transfers run on a bounded pool of `workers` threads; ordering
/// between files is irrelevant. The first failure wins, the remaining
/// workers stop picking up new transfers, and the call fails with
/// `FetchIncomplete`. The staging directory is left on disk for inspection
/// and is never promoted here; the current pointer is not touched.
pub fn fetch_version<R: RemoteStore + ?Sized>(
    remote: &R,
    store: &Store,
    version: &str,
    workers: usize,
    sink: &dyn ProgressSink,
) -> Result<Utf8PathBuf, SyncError> {
    let mut files = remote.list_files(version)?;
    files.retain(|name| name != "." && name != "..");
    for name in &files {
        // Listing entries are bare names; a separator would escape staging.
        if name.contains('/') || name.contains('\\') {
            return Err(SyncError::FetchIncomplete {
                file: name.clone(),
                cause: "unsafe file name in remote listing".to_string(),
            });
        }
    }
    let staging = store.version_dir(version);
    fs::create_dir_all(staging.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;

    let next = AtomicUsize::new(0);
    let failure: Mutex<Option<SyncError>> = Mutex::new(None);
    let workers = workers.clamp(1, files.len().max(1));

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= files.len() {
                        break;
                    }
                    if failure.lock().unwrap().is_some() {
                        break;
                    }
                    let name = &files[index];
                    let destination = staging.join(name);
                    match remote.retrieve(version, name, destination.as_std_path()) {
                        Ok(()) => {
                            tracing::debug!(file = name.as_str(), "fetched");
                            sink.event(ProgressEvent {
                                message: format!("fetched {name}"),
                            });
                        }
                        Err(err) => {
                            let mut slot = failure.lock().unwrap();
                            if slot.is_none() {
                                *slot = Some(SyncError::FetchIncomplete {
                                    file: name.clone(),
                                    cause: err.to_string(),
                                });
                            }
                            break;
                        }
                    }
                }
            });
        }
    });

    if let Some(err) = failure.into_inner().unwrap() {
        return Err(err);
    }
    Ok(staging)
}
