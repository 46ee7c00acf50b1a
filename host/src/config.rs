use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Cli;

const CONFIG_FILE: &str = "config.toml";
const TEMPO_DIR: &str = ".tempo";
const DATA_DIR: &str = "data";
const RETRY_COUNT: u32 = 10;
const RETRY_DELAY_MS: u64 = 250;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub spid: String,
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Config {
    /// Load a config from file
    pub fn load() -> std::io::Result<Self> {
        let config_file = tempo_dir().join(CONFIG_FILE);
        toml::from_str(&std::fs::read_to_string(config_file)?).map_err(|e| {
            std::io::Error::new(
                ErrorKind::InvalidData,
                format!("Could not parse config file: {e}"),
            )
        })
    }

    /// Build a config from CLI arguments alone. Requires an spid since a
    /// new installation cannot sign up without one.
    pub fn init(cli: &Cli) -> std::io::Result<Self> {
        let spid = cli.spid.clone().ok_or_else(|| {
            std::io::Error::new(
                ErrorKind::InvalidInput,
                "an --spid is required to create a new config",
            )
        })?;
        validate_spid(&spid)?;
        Ok(Self {
            data_dir: cli
                .data_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| tempo_dir().join(DATA_DIR)),
            spid,
            retry_count: cli.retries.unwrap_or(RETRY_COUNT),
            retry_delay: cli
                .retry_delay
                .map(Duration::from_millis)
                .unwrap_or_else(|| Duration::from_millis(RETRY_DELAY_MS)),
        })
    }

    /// First try to load the config file. If that succeeds, overwrite the
    /// config with the CLI args present and persist it. If loading fails,
    /// create a config from the CLI args and persist it.
    ///
    /// Returns the final config.
    pub fn load_or_init(cli: &Cli) -> std::io::Result<Self> {
        match Self::load() {
            Ok(mut conf) => {
                if let Some(dir) = &cli.data_dir {
                    conf.data_dir = PathBuf::from(dir);
                }
                if let Some(spid) = &cli.spid {
                    validate_spid(spid)?;
                    conf.spid = spid.clone();
                }
                if let Some(retries) = cli.retries {
                    conf.retry_count = retries;
                }
                if let Some(delay) = cli.retry_delay {
                    conf.retry_delay = Duration::from_millis(delay);
                }
                conf.save()?;
                Ok(conf)
            }
            Err(e) => {
                tracing::warn!("Could not load config file: {e}");
                let conf = Self::init(cli)?;
                tracing::info!("New config created.");
                conf.save()?;
                Ok(conf)
            }
        }
    }

    /// Save the config file
    pub fn save(&self) -> std::io::Result<()> {
        let dir = tempo_dir();
        std::fs::create_dir_all(&dir)?;
        let config_file = dir.join(CONFIG_FILE);
        let rendered = toml::to_string(self).map_err(|e| {
            std::io::Error::new(
                ErrorKind::InvalidData,
                format!("Could not render config file: {e}"),
            )
        })?;
        std::fs::write(config_file, rendered)
    }

    /// Create the data directory if it does not exist yet.
    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

pub fn tempo_dir() -> PathBuf {
    home::home_dir().unwrap_or_default().join(TEMPO_DIR)
}

fn validate_spid(spid: &str) -> std::io::Result<()> {
    if spid.len() == 32 && spid.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(std::io::Error::new(
            ErrorKind::InvalidInput,
            "spid must be exactly 32 hex characters",
        ))
    }
}
