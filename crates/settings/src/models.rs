//! Configuration file model.
//!
//! Mirrors `configs/config.yaml`. Every section is optional; missing
//! sections and fields deserialize to their defaults so a partial file is
//! always accepted.

use serde::{Deserialize, Serialize};

/// Default engine endpoint when `temporal.hostPort` is empty.
pub const DEFAULT_HOST_PORT: &str = "127.0.0.1:7233";
/// Default engine namespace when `temporal.namespace` is empty.
pub const DEFAULT_NAMESPACE: &str = "default";
/// Default task queue when `temporal.defaultTaskQueue` is empty.
pub const DEFAULT_TASK_QUEUE: &str = "zebra-task-queue";
/// Port of the engine's HTTP API, paired with the `hostPort` host when
/// `temporal.httpHostPort` is empty.
pub const DEFAULT_HTTP_API_PORT: u16 = 7243;
/// Default HTTP bind address when `http.addr` is empty.
pub const DEFAULT_HTTP_ADDR: &str = ":8888";

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub http: HttpSection,
    pub logging: LoggingSection,
    pub temporal: TemporalSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub addr: String,
}

impl HttpSection {
    /// The configured address, or [`DEFAULT_HTTP_ADDR`] when blank.
    pub fn addr_or_default(&self) -> &str {
        if self.addr.trim().is_empty() {
            DEFAULT_HTTP_ADDR
        } else {
            &self.addr
        }
    }
}

/// Raw `logging` section. Values are normalized by the telemetry crate,
/// which owns the fallback rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub encoding: String,
    pub outputs: Vec<String>,
}

/// Engine connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemporalSection {
    pub host_port: String,
    /// Endpoint of the engine's HTTP API. `hostPort` is the gRPC frontend.
    pub http_host_port: String,
    pub namespace: String,
    pub default_task_queue: String,
}

impl TemporalSection {
    /// Copy with every empty field replaced by its default.
    pub fn resolved(&self) -> Self {
        fn or_default(value: &str, default: &str) -> String {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        }

        let host_port = or_default(&self.host_port, DEFAULT_HOST_PORT);
        let http_host_port = if self.http_host_port.trim().is_empty() {
            http_api_endpoint(&host_port)
        } else {
            self.http_host_port.clone()
        };

        Self {
            host_port,
            http_host_port,
            namespace: or_default(&self.namespace, DEFAULT_NAMESPACE),
            default_task_queue: or_default(&self.default_task_queue, DEFAULT_TASK_QUEUE),
        }
    }
}

/// Same host as the frontend, HTTP API port.
fn http_api_endpoint(host_port: &str) -> String {
    let host = crate::addr::split_host_port(host_port)
        .map(|(host, _)| host)
        .unwrap_or(host_port);
    if host.contains(':') {
        format!("[{host}]:{DEFAULT_HTTP_API_PORT}")
    } else {
        format!("{host}:{DEFAULT_HTTP_API_PORT}")
    }
}
