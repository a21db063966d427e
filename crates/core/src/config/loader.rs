use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `REPOMETER_SUMMARIZER__API_KEY`.
pub const ENV_PREFIX: &str = "REPOMETER_";

/// Environment variable naming the config file. Not a config key itself.
pub const CONFIG_PATH_VAR: &str = "REPOMETER_CONFIG";

/// Layered sources: the TOML file, then `REPOMETER_*` variables on top.
///
/// Nesting uses `__` because keys such as `max_prompt_tokens` contain
/// single underscores.
pub fn config_figment(path: &Path) -> Figment {
    Figment::from(Toml::file(path)).merge(
        Env::prefixed(ENV_PREFIX)
            .ignore(&["config"])
            .split("__"),
    )
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    config_figment(path)
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse TOML text alone, without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
