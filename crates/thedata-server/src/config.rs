use std::fmt;

pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
pub const NATS_URL_ENV: &str = "NATS_URL";
pub const NATS_AUTH_TOKEN_ENV: &str = "NATS_AUTH_TOKEN";

/// Broker settings for the liveness service, read from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub nats_url: String,
    pub nats_auth_token: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            nats_url: DEFAULT_NATS_URL.to_string(),
            nats_auth_token: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            nats_url: get(NATS_URL_ENV).unwrap_or_else(|| DEFAULT_NATS_URL.to_string()),
            nats_auth_token: get(NATS_AUTH_TOKEN_ENV),
        }
    }
}

// The token never reaches logs.
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("nats_url", &self.nats_url)
            .field(
                "nats_auth_token",
                &self.nats_auth_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
