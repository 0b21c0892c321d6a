use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::fetch::DEFAULT_WORKERS;
use crate::version::LATEST_ALIAS;

pub const CONFIG_FILE_NAME: &str = "refdb-sync.json";

pub const DEFAULT_REMOTE_URL: &str =
    "https://ftp.ncbi.nlm.nih.gov/pathogen/Antimicrobial_resistance/AMRFinder/data";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// On-disk configuration; every field is optional and falls back to the
/// AMRFinder reference-database defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub required_files: Option<Vec<String>>,
    #[serde(default)]
    pub latest_alias: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub remote_url: String,
    pub root: Option<Utf8PathBuf>,
    pub required_files: Vec<String>,
    pub latest_alias: String,
    pub timeout: Duration,
    pub workers: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the config file, falling back to defaults when no file exists.
    /// An explicitly named file must exist and parse.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SyncError> {
        let config_path = Utf8PathBuf::from(path.unwrap_or(CONFIG_FILE_NAME));

        if path.is_none() && !config_path.as_std_path().exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| SyncError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SyncError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            remote_url: config
                .remote_url
                .unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string()),
            root: config.root.map(Utf8PathBuf::from),
            required_files: config
                .required_files
                .unwrap_or_else(default_required_files),
            latest_alias: config
                .latest_alias
                .unwrap_or_else(|| LATEST_ALIAS.to_string()),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            workers: config.workers.unwrap_or(DEFAULT_WORKERS).max(1),
        }
    }
}

pub fn default_required_files() -> Vec<String> {
    vec![
        "AMR.LIB".to_string(),
        "AMRProt".to_string(),
        "fam.tab".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let resolved = ConfigLoader::resolve_config(Config::default());
        assert_eq!(resolved.remote_url, DEFAULT_REMOTE_URL);
        assert_eq!(resolved.required_files, default_required_files());
        assert_eq!(resolved.latest_alias, "latest");
        assert_eq!(resolved.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn workers_are_clamped_to_at_least_one() {
        let resolved = ConfigLoader::resolve_config(Config {
            workers: Some(0),
            ..Config::default()
        });
        assert_eq!(resolved.workers, 1);
    }
}
