use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug)]
pub struct FanoutConfig {
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
    #[serde(default = "defaults::readers")]
    pub readers: usize,
    #[serde(default = "defaults::messages")]
    pub messages: usize,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::lock_pages")]
    pub lock_pages: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn capacity() -> usize {
        64
    }

    pub fn readers() -> usize {
        2
    }

    pub fn messages() -> usize {
        10_000
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn lock_pages() -> bool {
        true
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::capacity(),
            readers: defaults::readers(),
            messages: defaults::messages(),
            log_level: defaults::log_level(),
            lock_pages: defaults::lock_pages(),
        }
    }
}

impl FanoutConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: FanoutConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}
