//! HTTP bind-address resolution.
//!
//! Accepts `host:port`, `:port`, `[v6]:port` or a bare port number. Anything
//! unparseable falls back to `0.0.0.0:8888` with a warning rather than
//! refusing to start.

use std::fmt;

use tracing::warn;

const FALLBACK_HOST: &str = "0.0.0.0";
const FALLBACK_PORT: u16 = 8888;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAddr {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for BindAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

pub(crate) fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return Some((host, port));
    }
    let (host, port) = addr.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}

/// Resolve the configured `http.addr` into a concrete bind address.
pub fn resolve_bind_addr(addr: &str) -> BindAddr {
    let addr = addr.trim();
    let addr = if addr.is_empty() { crate::DEFAULT_HTTP_ADDR } else { addr };

    let (host, port) = match split_host_port(addr) {
        Some((host, port)) => (host.to_string(), port.to_string()),
        None if addr.parse::<u16>().is_ok() => (FALLBACK_HOST.to_string(), addr.to_string()),
        None => {
            warn!(addr, "invalid http.addr, falling back to :8888");
            (FALLBACK_HOST.to_string(), FALLBACK_PORT.to_string())
        }
    };

    let host = if host.is_empty() { FALLBACK_HOST.to_string() } else { host };
    let port = port.parse::<u16>().unwrap_or_else(|_| {
        warn!(port = %port, "invalid port, falling back to 8888");
        FALLBACK_PORT
    });

    BindAddr { host, port }
}
