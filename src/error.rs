use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("malformed listing entry `{line}`: {reason}")]
    MalformedListingEntry { line: String, reason: String },

    #[error("remote listing has no `{0}` pointer")]
    NoCurrentPointer(String),

    #[error("cannot resolve `{alias}` to a version directory: {detail}")]
    AmbiguousOrMissingTarget { alias: String, detail: String },

    #[error("failed to fetch `{file}`: {cause}")]
    FetchIncomplete { file: String, cause: String },

    #[error("staging directory {path} is missing required files: {files}", files = .missing.join(", "))]
    IncompleteStagingDirectory {
        path: Utf8PathBuf,
        missing: Vec<String>,
    },

    #[error("another sync cycle already holds the lock on {0}")]
    LockContention(Utf8PathBuf),

    #[error("cannot reach remote store: {0}")]
    TransportUnavailable(String),

    #[error("remote returned status {status} for `{name}`: {message}")]
    RemoteStatus {
        status: u16,
        name: String,
        message: String,
    },

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
