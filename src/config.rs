use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Resolved configuration values for the char service.
///
/// The surface that resolves these (host config store, file, CLI) is
/// external; the reconciler only consumes the values. Every field has a
/// default so rendering never blocks on configuration alone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Port the char REST endpoint listens on, also the port peers are
    /// dialled at.
    pub port: u16,
    /// Name the char reports in its `/status` payload.
    pub display_name: String,
    /// Log level handed to the workload verbatim.
    pub log_level: String,
    /// Host the workload binds to.
    pub bind_host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            display_name: "char".into(),
            log_level: "INFO".into(),
            bind_host: "0.0.0.0".into(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("warband.toml"))
            .merge(Json::file("warband.json"))
            .merge(Env::prefixed("WARBAND_"))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        Ok(config)
    }
}
