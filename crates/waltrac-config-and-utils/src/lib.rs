//! Configuration, broker endpoint parsing and logging for the Waltrac gateway.

mod config;
mod endpoint;
mod error;
mod logging;

pub use config::{
    GatewayConfig, DEFAULT_BIND_HOST, DEFAULT_BIND_PORT, DEFAULT_KEEPALIVE_INTERVAL_SECS,
    DEFAULT_LOG_LEVEL, DEFAULT_PUBLISH_WAIT_MS, DEFAULT_RECONNECT_DELAY_SECS,
};
pub use endpoint::{BrokerEndpoint, DEFAULT_MQTT_PORT, DEFAULT_TOPLEVEL};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, parse_level, LogFormat};
