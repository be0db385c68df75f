use std::path::PathBuf;

use anyhow::{anyhow, Result};
use toml::Value;

const DEFAULT_STATE_FILE: &str = "schema_state.json";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Config {
    state: StateConfig,
    settings: SettingsConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsConfig {
    pub parallelism: Option<usize>,
    pub target: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            state: StateConfig {
                path: PathBuf::from(DEFAULT_STATE_FILE),
            },
            settings: SettingsConfig::default(),
        }
    }
}

impl Config {
    pub(crate) fn from_toml(config: Value) -> Result<Self> {
        let state = match config.get("state") {
            Some(state) => parse_state_config(state)?,
            None => Config::default().state,
        };

        let settings = match config.get("settings") {
            Some(settings) => parse_settings_config(settings)?,
            None => SettingsConfig::default(),
        };

        Ok(Config { state, settings })
    }

    pub fn state(&self) -> &StateConfig {
        &self.state
    }

    pub fn settings(&self) -> &SettingsConfig {
        &self.settings
    }
}

fn parse_state_config(config: &Value) -> Result<StateConfig> {
    let path = match config.get("path") {
        Some(value) => value
            .as_str()
            .ok_or_else(|| anyhow!("Invalid state file path"))?
            .into(),
        None => PathBuf::from(DEFAULT_STATE_FILE),
    };

    Ok(StateConfig { path })
}

fn parse_settings_config(config: &Value) -> Result<SettingsConfig> {
    let parallelism = match config.get("parallelism") {
        Some(value) => {
            let parallelism = value
                .as_integer()
                .filter(|value| *value > 0)
                .ok_or_else(|| anyhow!("Invalid parallelism, expected a positive integer"))?;
            Some(parallelism.try_into()?)
        }
        None => None,
    };

    let target = match config.get("target") {
        Some(value) => Some(
            value
                .as_str()
                .ok_or_else(|| anyhow!("Invalid migration target"))?
                .to_string(),
        ),
        None => None,
    };

    Ok(SettingsConfig {
        parallelism,
        target,
    })
}
