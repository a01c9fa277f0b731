use crate::error::{NavError, Result};
use std::fmt;
use std::time::Duration;

/// Path prefix under the server root where top-level resources live.
pub const REST_ROOT: &str = "/httpAuth/app/rest/";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_USER_AGENT: &str = concat!("teamhuh/", env!("CARGO_PKG_VERSION"));

pub const ENV_URL: &str = "TEAMHUH_URL";
pub const ENV_USERNAME: &str = "TEAMHUH_USERNAME";
pub const ENV_PASSWORD: &str = "TEAMHUH_PASSWORD";
pub const ENV_TIMEOUT_SECS: &str = "TEAMHUH_TIMEOUT_SECS";

/// Username and password sent with every request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server root, without a trailing slash (e.g. `https://ci.example.com`).
    pub base_address: String,
    pub credentials: Credentials,
    /// Per-request timeout for the HTTP transport.
    pub timeout: Duration,
    pub user_agent: String,
}

impl ServerConfig {
    pub fn new(
        base_address: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_address: normalize_base_address(base_address.as_ref()),
            credentials: Credentials::new(username, password),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Reads `TEAMHUH_URL`, `TEAMHUH_USERNAME`, `TEAMHUH_PASSWORD` and the
    /// optional `TEAMHUH_TIMEOUT_SECS` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| NavError::Config(format!("{} is not set", key)))
        };

        let mut config = Self::new(
            required(ENV_URL)?,
            required(ENV_USERNAME)?,
            required(ENV_PASSWORD)?,
        );

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                NavError::Config(format!("{} must be a whole number of seconds, got {:?}", ENV_TIMEOUT_SECS, raw))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Drops a single trailing `/` so URL joins don't produce `//`.
pub fn normalize_base_address(base: &str) -> String {
    base.strip_suffix('/').unwrap_or(base).to_string()
}

/// URL of a top-level resource: the name is lowercased and `_` becomes `-`.
pub fn resource_url(base_address: &str, name: &str) -> String {
    format!(
        "{}{}{}",
        base_address,
        REST_ROOT,
        name.to_lowercase().replace('_', "-")
    )
}

/// URL of a linked resource; the href is used verbatim.
pub fn linked_url(base_address: &str, href: &str) -> String {
    format!("{}{}", base_address, href)
}
