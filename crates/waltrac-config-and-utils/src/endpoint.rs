//! Broker endpoint URI parsing.
//!
//! Format: `mqtt://[user:password@]host[:port]/<toplevel>`

use crate::{ConfigError, ConfigResult};
use std::fmt;
use url::Url;

/// Port used when the URI does not name one.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Topic namespace used when the URI has no path.
pub const DEFAULT_TOPLEVEL: &str = "waltrac";

/// Connection parameters for the message broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Namespace prefixed to every outbound topic.
    pub toplevel: String,
}

impl BrokerEndpoint {
    /// Parse a broker URI.
    pub fn parse(uri: &str) -> ConfigResult<Self> {
        let url = Url::parse(uri)?;

        match url.scheme() {
            "mqtt" | "tcp" => {}
            other => {
                return Err(ConfigError::InvalidEndpoint(format!(
                    "unsupported scheme '{}', expected mqtt://",
                    other
                )))
            }
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::InvalidEndpoint(format!("no host in '{}'", uri)))?
            .to_string();

        let port = url.port().unwrap_or(DEFAULT_MQTT_PORT);

        // Credentials only count when both halves are present.
        let (username, password) = match (url.username(), url.password()) {
            (user, Some(pass)) if !user.is_empty() => {
                (Some(user.to_string()), Some(pass.to_string()))
            }
            _ => (None, None),
        };

        let toplevel = url.path().trim_matches('/');
        let toplevel = if toplevel.is_empty() {
            DEFAULT_TOPLEVEL.to_string()
        } else {
            toplevel.to_string()
        };

        Ok(Self {
            host,
            port,
            username,
            password,
            toplevel,
        })
    }

    /// Credentials pair, if both were supplied.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl fmt::Display for BrokerEndpoint {
    /// Renders the endpoint with the password redacted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(user) => write!(
                f,
                "mqtt://{}:***@{}:{}/{}",
                user, self.host, self.port, self.toplevel
            ),
            None => write!(f, "mqtt://{}:{}/{}", self.host, self.port, self.toplevel),
        }
    }
}
