use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub driver: DriverConfig,
    pub engine: EngineConfig,
    pub log: LogConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Base for processor and payload paths; the process working directory when unset.
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig { pub phase_tick_ms: u64 }
impl EngineConfig {
    pub fn phase_tick(&self) -> Duration {
        Duration::from_millis(self.phase_tick_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { format: LogFormat::Json, filter: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig { pub report_path: Option<PathBuf> }

impl Config {
    /// Loads `config/default.toml`, then `extra` if given, then `LOADTASK__*`
    /// environment variables (`LOADTASK__LOG__FORMAT=pretty`).
    pub fn load(extra: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file("config/default.toml"));
        if let Some(path) = extra {
            figment = figment.merge(Toml::file(path));
        }
        let figment = figment.merge(Env::prefixed("LOADTASK__").split("__"));
        Ok(figment.extract()?)
    }
}
