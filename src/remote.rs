use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::SyncError;

/// Boundary to the remote store holding the published versions.
///
/// The store is an opaque hierarchical listing: one facts line per object at
/// the top level, bare file names inside a version directory, and a byte
/// stream per file. Any transport exposing this shape satisfies the
/// contract; see [`HttpRemoteStore`] for the HTTP rendition.
pub trait RemoteStore: Send + Sync {
    /// Raw facts lines for the top-level listing, one entry per line.
    fn list_versions(&self) -> Result<Vec<String>, SyncError>;

    /// Bare file names inside the given version directory.
    fn list_files(&self, version: &str) -> Result<Vec<String>, SyncError>;

    /// Streams one file of the given version to `destination`.
    fn retrieve(&self, version: &str, name: &str, destination: &Path) -> Result<(), SyncError>;
}

/// HTTP implementation of [`RemoteStore`].
///
/// Expects the base URL to serve the facts listing as plain text, each
/// version subdirectory to serve its file names one per line, and the files
/// themselves as plain GETs.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("refdb-sync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::TransportUnavailable(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::TransportUnavailable(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_lines(&self, url: &str, name: &str) -> Result<Vec<String>, SyncError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SyncError::TransportUnavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response, name));
        }
        let body = response
            .text()
            .map_err(|err| SyncError::TransportUnavailable(err.to_string()))?;
        Ok(body
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl RemoteStore for HttpRemoteStore {
    fn list_versions(&self) -> Result<Vec<String>, SyncError> {
        self.get_lines(&format!("{}/", self.base_url), "/")
    }

    fn list_files(&self, version: &str) -> Result<Vec<String>, SyncError> {
        self.get_lines(&format!("{}/{version}/", self.base_url), version)
    }

    fn retrieve(&self, version: &str, name: &str, destination: &Path) -> Result<(), SyncError> {
        let url = format!("{}/{version}/{name}", self.base_url);
        let mut response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| SyncError::TransportUnavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response, name));
        }
        let mut file =
            File::create(destination).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn status_error(response: reqwest::blocking::Response, name: &str) -> SyncError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "remote request failed".to_string());
    SyncError::RemoteStatus {
        status,
        name: name.to_string(),
        message,
    }
}
