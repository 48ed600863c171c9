//! Application configuration.
//!
//! Values come from environment variables; anything missing or unparseable
//! falls back to its default.

use std::str::FromStr;
use std::time::Duration;

/// Default TCP port of the wire protocol listener.
pub const DEFAULT_PORT: u16 = 9999;
/// Default port of the admin HTTP surface.
pub const DEFAULT_ADMIN_PORT: u16 = 9998;
/// Default capacity of the per-session read buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Runtime configuration for a gateway process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs and health responses.
    pub service_name: String,
    /// Bind host for both listeners.
    pub host: String,
    /// Wire protocol port.
    pub port: u16,
    /// Admin HTTP port, `0` disables the admin surface.
    pub admin_port: u16,
    /// Pool size for networked backends.
    pub max_connections: u32,
    /// Backend connect/acquire timeout.
    pub connect_timeout_secs: u64,
    /// Fixed capacity of the per-session read buffer.
    pub read_buffer_size: usize,
    /// Idle read deadline per session, `0` disables it.
    pub idle_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "sql-gateway".to_string(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            max_connections: 5,
            connect_timeout_secs: 10,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            idle_timeout_secs: 0,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the environment for the named service.
    pub fn load_with_service(service_name: &str) -> Self {
        let defaults = Self::default();
        Self {
            service_name: service_name.to_string(),
            host: std::env::var("SERVER_HOST").unwrap_or(defaults.host),
            port: env_or("SERVER_PORT", defaults.port),
            admin_port: env_or("ADMIN_PORT", defaults.admin_port),
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            read_buffer_size: env_or("READ_BUFFER_SIZE", defaults.read_buffer_size).max(1),
            idle_timeout_secs: env_or("IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
        }
    }

    /// Wire protocol bind address.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Admin HTTP bind address, if enabled.
    pub fn admin_addr(&self) -> Option<String> {
        (self.admin_port != 0).then(|| format!("{}:{}", self.host, self.admin_port))
    }

    /// Backend connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Session idle deadline, if enabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs != 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(key, value = raw, "ignoring unparseable config value");
            default
        }
    }
}
