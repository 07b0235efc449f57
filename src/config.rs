//! Settings for the completion service, read from the environment.
use crate::error::CfoError;
use log::debug;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_VAR: &str = "RUSTY_CFO_MODEL";
pub const TEMPERATURE_VAR: &str = "RUSTY_CFO_TEMPERATURE";
pub const BASE_URL_VAR: &str = "RUSTY_CFO_BASE_URL";
pub const TIMEOUT_VAR: &str = "RUSTY_CFO_TIMEOUT_SECS";

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing API key: set {0} in the environment or in a .env file")]
    MissingApiKey(&'static str),

    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub base_url: String,
    pub timeout: Duration,
}

impl Config {
    /// Loads `.env` when present, then reads the environment
    pub fn from_env() -> Result<Self, CfoError> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CfoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty());

        let api_key = lookup(API_KEY_VAR).ok_or(ConfigError::MissingApiKey(API_KEY_VAR))?;
        let model = lookup(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        let temperature = match lookup(TEMPERATURE_VAR) {
            Some(value) => parse_temperature(TEMPERATURE_VAR, &value)?,
            None => DEFAULT_TEMPERATURE,
        };
        let base_url = lookup(BASE_URL_VAR)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let timeout = match lookup(TIMEOUT_VAR) {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|seconds| *seconds > 0)
                .ok_or_else(|| invalid(TIMEOUT_VAR, &value))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Config {
            api_key,
            model,
            temperature,
            base_url,
            timeout: Duration::from_secs(timeout),
        })
    }

    /// Applies command-line overrides
    pub fn with_overrides(mut self, model: Option<String>, temperature: Option<f32>) -> Result<Self, CfoError> {
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(temperature) = temperature {
            self.temperature = check_temperature("--temperature", temperature)?;
        }
        Ok(self)
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_owned(),
        value: value.to_owned(),
    }
}

fn parse_temperature(name: &str, value: &str) -> Result<f32, ConfigError> {
    let temperature = value.parse::<f32>().map_err(|_| invalid(name, value))?;
    check_temperature(name, temperature)
}

fn check_temperature(name: &str, temperature: f32) -> Result<f32, ConfigError> {
    if (0.0..=2.0).contains(&temperature) {
        Ok(temperature)
    } else {
        Err(invalid(name, &temperature.to_string()))
    }
}
