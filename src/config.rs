use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PackError;

pub const DEFAULT_CONFIG_FILE: &str = "imgpack.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Upper bound on fetches in flight.
    pub concurrency: usize,
    /// Per-request timeout, covering connect and body transfer.
    pub timeout_secs: u64,
    /// Extension given to every archive entry, whatever the image type.
    pub extension: String,
    pub archive_name: String,
    pub failure_report_name: String,
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout_secs: 10,
            extension: "jpg".to_string(),
            archive_name: "downloaded_images.zip".to_string(),
            failure_report_name: "failed_items.csv".to_string(),
            user_agent: format!("imgpack/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), PackError> {
        if self.timeout_secs == 0 {
            return Err(PackError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        for (field, value) in [
            ("extension", &self.extension),
            ("archive_name", &self.archive_name),
            ("failure_report_name", &self.failure_report_name),
        ] {
            if value.trim().is_empty() {
                return Err(PackError::InvalidConfig(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads an explicit config path, or `imgpack.json` from the working
    /// directory when it exists. Without either, the defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<PipelineConfig, PackError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(PipelineConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PackError::ConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<PipelineConfig, PackError> {
        let config: PipelineConfig =
            serde_json::from_str(content).map_err(|err| PackError::ConfigParse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
