//! Defines the configuration of the runner.

use std::{path::Path, str::FromStr};

use dibc_bridge::BridgeConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;

/// The top level configuration for the runner.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[allow(clippy::module_name_repetitions)]
pub struct RunnerConfig {
    /// The bridge served to the controller.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// How to start the controller.
    pub controller: ControllerCommand,
    /// The log level of the runner.
    #[serde(default)]
    pub log_level: String,
}

/// The controller process to spawn.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ControllerCommand {
    /// The executable.
    pub command: String,
    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,
}

impl RunnerConfig {
    /// Returns the log level, `INFO` if unset or unknown.
    #[must_use]
    pub fn log_level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }

    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not hold a valid
    /// configuration.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        parse_config(value)
    }
}

/// Parse a configuration value into the target struct while producing
/// detailed path-aware error messages (e.g. `controller.command`).
///
/// # Errors
/// Returns an [`anyhow::Error`] with the precise path and the original serde
/// error message.
pub fn parse_config<T>(value: serde_json::Value) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let json_string = value.to_string();

    let mut deserializer = serde_json::Deserializer::from_str(&json_string);
    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(v) => Ok(v),
        Err(e) => Err(anyhow::anyhow!(format!(
            "config error at {}: {}",
            e.path(),
            e
        ))),
    }
}
