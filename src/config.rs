//! Runtime configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every address is fixed at startup; there is no discovery. Each service
//! reads the same `Config` and picks out what it needs, so a single `.env`
//! describes a whole deployment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::internal_auth::{DEV_INTERNAL_KEY, InternalKey};

pub const DEFAULT_GATEWAY_PORT: u16 = 5000;
pub const DEFAULT_USERS_PORT: u16 = 5001;
pub const DEFAULT_POSTS_PORT: u16 = 5002;
pub const DEFAULT_CALCULATOR_PORT: u16 = 5003;
pub const DEFAULT_FACADE_PORT: u16 = 4000;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    pub gateway: u16,
    pub users: u16,
    pub posts: u16,
    pub calculator: u16,
    pub facade: u16,
}

/// Base URLs of the backend services, without trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrls {
    pub users: String,
    pub posts: String,
    pub calculator: String,
}

/// Deadlines applied to every outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamTimeouts {
    pub request: Duration,
    pub connect: Duration,
}

impl Default for UpstreamTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_host: IpAddr,
    pub ports: Ports,
    pub urls: ServiceUrls,
    pub internal_key: InternalKey,
    /// True when `INTERNAL_API_KEY` was unset and the development key is in use.
    pub internal_key_is_default: bool,
    pub timeouts: UpstreamTimeouts,
    pub database_url: Option<String>,
}

impl Config {
    /// Build config from the process environment.
    ///
    /// Optional (all have defaults):
    /// - `BIND_HOST`: default `0.0.0.0`
    /// - `GATEWAY_PORT`, `USERS_PORT`, `POSTS_PORT`, `CALCULATOR_PORT`, `FACADE_PORT`
    /// - `USERS_SERVICE_URL`, `POSTS_SERVICE_URL`, `CALCULATOR_SERVICE_URL`:
    ///   default `http://127.0.0.1:<port>`
    /// - `INTERNAL_API_KEY`: shared secret for `/internal` routes
    /// - `UPSTREAM_TIMEOUT_SECS`: default 5
    /// - `UPSTREAM_CONNECT_TIMEOUT_SECS`: default 2
    /// - `DATABASE_URL`: enables Postgres storage for users
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_host = parse_or(&lookup, "BIND_HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let ports = Ports {
            gateway: parse_or(&lookup, "GATEWAY_PORT", DEFAULT_GATEWAY_PORT)?,
            users: parse_or(&lookup, "USERS_PORT", DEFAULT_USERS_PORT)?,
            posts: parse_or(&lookup, "POSTS_PORT", DEFAULT_POSTS_PORT)?,
            calculator: parse_or(&lookup, "CALCULATOR_PORT", DEFAULT_CALCULATOR_PORT)?,
            facade: parse_or(&lookup, "FACADE_PORT", DEFAULT_FACADE_PORT)?,
        };
        let urls = ServiceUrls {
            users: service_url(&lookup, "USERS_SERVICE_URL", ports.users)?,
            posts: service_url(&lookup, "POSTS_SERVICE_URL", ports.posts)?,
            calculator: service_url(&lookup, "CALCULATOR_SERVICE_URL", ports.calculator)?,
        };

        let configured_key = non_empty(&lookup, "INTERNAL_API_KEY");
        let internal_key_is_default = configured_key.is_none();
        let internal_key = InternalKey::new(configured_key.as_deref().unwrap_or(DEV_INTERNAL_KEY));

        let request_secs: u64 = parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS)?;
        let connect_secs: u64 =
            parse_or(&lookup, "UPSTREAM_CONNECT_TIMEOUT_SECS", DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS)?;
        if request_secs == 0 {
            return Err(ConfigError::Invalid { var: "UPSTREAM_TIMEOUT_SECS", value: "0".into() });
        }
        let timeouts =
            UpstreamTimeouts { request: Duration::from_secs(request_secs), connect: Duration::from_secs(connect_secs) };

        Ok(Self {
            bind_host,
            ports,
            urls,
            internal_key,
            internal_key_is_default,
            timeouts,
            database_url: non_empty(&lookup, "DATABASE_URL"),
        })
    }

    #[must_use]
    pub fn addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.bind_host, port)
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var: key, value: raw }),
        None => Ok(default),
    }
}

fn service_url<F>(lookup: &F, key: &'static str, port: u16) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = non_empty(lookup, key) else {
        return Ok(format!("http://127.0.0.1:{port}"));
    };
    if !(raw.starts_with("http://") || raw.starts_with("https://")) {
        return Err(ConfigError::Invalid { var: key, value: raw });
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
