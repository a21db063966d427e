//! Caller resolution for the HTTP surface.
//!
//! An [`Authenticator`] decides whether a request may reach the protected
//! routes and turns its headers into an [`Identity`]: the GitHub login the
//! request acts for plus the access token it forwards.

mod methods;
mod types;

pub use methods::{ApiKeyAuthenticator, NoneAuthenticator};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AuthConfig, AuthMethod};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Auth misconfigured: {0}")]
    Misconfigured(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// The configured method this authenticator implements.
    fn method(&self) -> AuthMethod;
}

pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    let authenticator: Box<dyn Authenticator> = match config.method {
        AuthMethod::None => Box::new(NoneAuthenticator),
        AuthMethod::ApiKey => match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Box::new(ApiKeyAuthenticator::new(key)),
            _ => {
                return Err(AuthError::Misconfigured(
                    "auth.api_key is required for the api_key method".to_string(),
                ))
            }
        },
    };
    Ok(authenticator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config(method: AuthMethod, api_key: Option<&str>) -> AuthConfig {
        AuthConfig {
            method,
            api_key: api_key.map(String::from),
        }
    }

    #[test]
    fn test_factory_follows_configured_method() {
        let none = create_authenticator(&auth_config(AuthMethod::None, None)).unwrap();
        assert_eq!(none.method(), AuthMethod::None);

        let keyed =
            create_authenticator(&auth_config(AuthMethod::ApiKey, Some("secret-key"))).unwrap();
        assert_eq!(keyed.method(), AuthMethod::ApiKey);
    }

    #[test]
    fn test_api_key_method_needs_a_key() {
        for key in [None, Some(""), Some("   ")] {
            let result = create_authenticator(&auth_config(AuthMethod::ApiKey, key));
            assert!(
                matches!(result, Err(AuthError::Misconfigured(_))),
                "key {:?} was accepted",
                key
            );
        }
    }
}
