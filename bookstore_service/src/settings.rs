use anyhow::Context;
use config::{Config, Environment};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "BOOKSTORE";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
/// Runtime settings, every field can be overridden with a `BOOKSTORE_<FIELD>` env variable
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Exports spans to a local Jaeger agent when enabled
    pub jaeger_enabled: bool,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(environment: Environment) -> anyhow::Result<Self> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("jaeger_enabled", false)?
            .add_source(environment.try_parsing(true))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Failed to parse settings")
    }
}
