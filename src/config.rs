use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub port: u16,
}

impl Config {
    /// Read configuration from the environment. The decision-provider
    /// credential is mandatory: without it every decision would silently
    /// degrade, so startup fails instead.
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY must be set")?;
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            gemini_api_key,
            port,
        })
    }
}
