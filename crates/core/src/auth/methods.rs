use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};
use crate::config::AuthMethod;

/// Trusts the acting-user header as sent. Meant for single-user or
/// loopback deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneAuthenticator;

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::from_request(AuthMethod::None, request))
    }

    fn method(&self) -> AuthMethod {
        AuthMethod::None
    }
}

/// Requires the deployment's shared key, sent as `Authorization: Bearer <key>`
/// or `X-API-Key: <key>`, before the acting-user header is trusted.
pub struct ApiKeyAuthenticator {
    key: Vec<u8>,
}

impl ApiKeyAuthenticator {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into().into_bytes(),
        }
    }

    fn matches(&self, presented: &str) -> bool {
        let presented = presented.as_bytes();
        // Compare every byte so timing does not leak the matching prefix.
        presented.len() == self.key.len()
            && presented
                .iter()
                .zip(&self.key)
                .fold(0u8, |diff, (a, b)| diff | (a ^ b))
                == 0
    }
}

fn presented_key(request: &AuthRequest) -> Option<&str> {
    let bearer = request.headers.get("authorization").and_then(|value| {
        let (scheme, key) = value.split_once(' ')?;
        scheme.eq_ignore_ascii_case("bearer").then(|| key.trim())
    });
    bearer.or_else(|| request.headers.get("x-api-key").map(|k| k.trim()))
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        match presented_key(request) {
            None => Err(AuthError::NotAuthenticated),
            Some(key) if self.matches(key) => {
                Ok(Identity::from_request(AuthMethod::ApiKey, request))
            }
            Some(_) => Err(AuthError::InvalidCredentials("Invalid API key".to_string())),
        }
    }

    fn method(&self) -> AuthMethod {
        AuthMethod::ApiKey
    }
}
