use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

use crate::config::AuthMethod;

/// Header naming the GitHub login the request acts for.
pub const USER_HEADER: &str = "x-repometer-user";
/// Header carrying the caller's GitHub access token.
pub const GITHUB_TOKEN_HEADER: &str = "x-github-token";

const GITHUB_TOKEN_CLAIM: &str = "github_token";

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Lowercased header names.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
    pub claims: HashMap<String, serde_json::Value>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            method: "none".to_string(),
            claims: HashMap::new(),
        }
    }

    /// Build an identity from the acting-user and token headers.
    pub fn from_request(method: AuthMethod, request: &AuthRequest) -> Self {
        let user_id = request
            .headers
            .get(USER_HEADER)
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .unwrap_or("anonymous")
            .to_string();

        let mut claims = HashMap::new();
        if let Some(token) = request
            .headers
            .get(GITHUB_TOKEN_HEADER)
            .filter(|t| !t.is_empty())
        {
            claims.insert(
                GITHUB_TOKEN_CLAIM.to_string(),
                serde_json::Value::String(token.clone()),
            );
        }

        Self {
            user_id,
            method: method.as_str().to_string(),
            claims,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id == "anonymous"
    }

    /// GitHub access token forwarded by the caller, if any.
    pub fn github_token(&self) -> Option<&str> {
        self.claims.get(GITHUB_TOKEN_CLAIM).and_then(|v| v.as_str())
    }
}
