use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration beyond what deserialization enforces.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(invalid("auth.api_key must be set when auth.method = \"api_key\""));
    }

    let analysis = &config.analysis;
    if analysis.max_repositories == 0 {
        return Err(invalid("analysis.max_repositories must be at least 1"));
    }
    if !(0.0..1.0).contains(&analysis.progress_reserve) {
        return Err(invalid("analysis.progress_reserve must be in [0, 1)"));
    }

    if config.teams.min_members < 2 {
        return Err(invalid("teams.min_members must be at least 2"));
    }
    if config.teams.max_members < config.teams.min_members {
        return Err(invalid("teams.max_members cannot be below teams.min_members"));
    }

    if config.summarizer.max_prompt_tokens == 0 || config.summarizer.chars_per_token == 0 {
        return Err(invalid(
            "summarizer.max_prompt_tokens and summarizer.chars_per_token must be positive",
        ));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
