//! Service layer rendering.
//!
//! Turns the resolved config values and a peer address list into the
//! configuration the char service should be running. Rendering is a pure
//! function: same inputs, same layer, no errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;

pub const SERVICE_NAME: &str = "char";
pub const COMMAND: &str = "./main.sh";

/// Separator for the serialized peer list.
pub const ENEMIES_SEPARATOR: &str = ";";

pub const ENV_ENEMIES: &str = "ENEMIES";
pub const ENV_PORT: &str = "UVICORN_PORT";
pub const ENV_HOST: &str = "UVICORN_HOST";
pub const ENV_NAME: &str = "NAME";
pub const ENV_LOG_LEVEL: &str = "LOGLEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    Enabled,
    Disabled,
}

/// How a newly applied configuration combines with the previous one.
///
/// `Merge` overlays only the supplied fields; under it an environment
/// key dropped from the desired layer (a departed peer's address)
/// survives in the running service. Rendering therefore always emits
/// `Replace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    Replace,
    Merge,
}

/// Desired state of the char service.
///
/// Two layers are equivalent iff all fields compare equal; that
/// structural equality is what decides whether a reconciliation pass
/// applies anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service: String,
    pub command: String,
    pub startup: Startup,
    #[serde(rename = "override")]
    pub override_policy: Override,
    pub environment: BTreeMap<String, String>,
}

/// Render the desired layer from config values and peer addresses.
pub fn render(config: &Config, peer_addresses: &[String]) -> ServiceConfig {
    let enemies = peer_addresses.join(ENEMIES_SEPARATOR);

    let mut environment = BTreeMap::new();
    environment.insert(ENV_ENEMIES.to_string(), enemies);
    environment.insert(ENV_PORT.to_string(), config.port.to_string());
    environment.insert(ENV_HOST.to_string(), config.bind_host.clone());
    environment.insert(ENV_NAME.to_string(), config.display_name.clone());
    environment.insert(ENV_LOG_LEVEL.to_string(), config.log_level.clone());

    ServiceConfig {
        service: SERVICE_NAME.to_string(),
        command: COMMAND.to_string(),
        startup: Startup::Enabled,
        override_policy: Override::Replace,
        environment,
    }
}
