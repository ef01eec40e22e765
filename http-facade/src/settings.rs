use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::HeadersValidation;

/// Configuration of a [`Client`](crate::Client) backed by the default reqwest transport.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub max_retries: u32,
    pub gzip: bool,
    pub user_agent: Option<String>,
    pub headers_validation: HeadersValidation,
}

impl Settings {
    /// Reads `config/http-facade.{yml,...}` if present, overridden by `HTTP_FACADE__*`
    /// environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("config/http-facade").required(false))
            .add_source(Environment::with_prefix("HTTP_FACADE").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// A builder pre-populated with the defaults, for layering custom sources.
    pub fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("max_retries", 3)?
            .set_default("gzip", true)?
            .set_default("headers_validation", "Yes")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: None,
            max_retries: 3,
            gzip: true,
            user_agent: None,
            headers_validation: HeadersValidation::Yes,
        }
    }
}
