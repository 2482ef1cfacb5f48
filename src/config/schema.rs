use std::path::Path;

use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

use crate::catalog::pagination::MAX_PAGE_SIZE;
use crate::queue::{
    ReceiveOptions, DEFAULT_VISIBILITY_TIMEOUT_SECONDS, MAX_RECEIVE_MESSAGES,
    MAX_WAIT_TIME_SECONDS,
};

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StrataConfig {
    pub storage: Storage,
    #[serde(default)]
    pub catalog: Catalog,
    pub queue: Option<Queue>,
    #[serde(default)]
    pub misc: Misc,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Storage {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Catalog {
    pub database_prefix: String,
    pub database_suffix: String,
    pub page_size: usize,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            database_prefix: "".to_string(),
            database_suffix: "".to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Queue {
    pub url: String,
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
    #[serde(default = "default_wait_time_seconds")]
    pub wait_time_seconds: u32,
    #[serde(default = "default_visibility_timeout_seconds")]
    pub visibility_timeout_seconds: u32,
}

impl Queue {
    pub fn receive_options(&self) -> ReceiveOptions {
        ReceiveOptions::new(
            self.max_messages,
            self.wait_time_seconds,
            self.visibility_timeout_seconds,
        )
    }
}

fn default_max_messages() -> u32 {
    MAX_RECEIVE_MESSAGES
}

fn default_wait_time_seconds() -> u32 {
    MAX_WAIT_TIME_SECONDS
}

fn default_visibility_timeout_seconds() -> u32 {
    DEFAULT_VISIBILITY_TIMEOUT_SECONDS
}

#[derive(Deserialize, Debug, PartialEq, Eq, Default, Clone)]
#[serde(default)]
pub struct Misc {
    pub poll_interval_ms: u64,
    pub json_logs: bool,
}

pub fn validate_config(config: StrataConfig) -> Result<StrataConfig, ConfigError> {
    if config.storage.bucket.is_empty() {
        return Err(ConfigError::Message(
            "storage.bucket must not be empty".to_string(),
        ));
    }

    if !(1..=MAX_PAGE_SIZE).contains(&config.catalog.page_size) {
        return Err(ConfigError::Message(format!(
            "catalog.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
            config.catalog.page_size
        )));
    }

    if let Some(queue) = &config.queue {
        if !(1..=MAX_RECEIVE_MESSAGES).contains(&queue.max_messages) {
            return Err(ConfigError::Message(format!(
                "queue.max_messages must be between 1 and {MAX_RECEIVE_MESSAGES}, got {}",
                queue.max_messages
            )));
        }

        if queue.wait_time_seconds > MAX_WAIT_TIME_SECONDS {
            return Err(ConfigError::Message(format!(
                "queue.wait_time_seconds must be at most {MAX_WAIT_TIME_SECONDS}, got {}",
                queue.wait_time_seconds
            )));
        }
    }

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<StrataConfig, ConfigError> {
    let path = path.to_str().ok_or_else(|| {
        ConfigError::Message(format!("Config path {path:?} is not valid UTF-8"))
    })?;
    let config = Config::builder().add_source(File::with_name(path));

    config.build()?.try_deserialize().and_then(validate_config)
}

// Load a config from a string (to test our structs are defined correctly)
pub fn load_config_from_string(
    config_str: &str,
    skip_validation: bool,
) -> Result<StrataConfig, ConfigError> {
    let config =
        Config::builder().add_source(File::from_str(config_str, FileFormat::Toml));

    if skip_validation {
        config.build()?.try_deserialize()
    } else {
        config.build()?.try_deserialize().and_then(validate_config)
    }
}
