//! Reading the configuration file from disk.

use std::path::Path;

use crate::{AppConfig, ConfigError};

/// Load the configuration file at `path`.
///
/// `.json` files are parsed as JSON; everything else as YAML (a superset
/// of JSON, so YAML is the safe default for unknown extensions). An empty
/// file yields the default configuration.
pub fn load(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn full_yaml_config_is_parsed() {
        let file = write_temp(
            ".yaml",
            r#"
app:
  name: zebra
http:
  addr: ":9000"
logging:
  level: debug
  encoding: console
  outputs: [stdout, logs/app.log]
temporal:
  hostPort: temporal:7233
  namespace: prod
  defaultTaskQueue: q1
"#,
        );
        let cfg = load(file.path()).unwrap();
        assert_eq!(cfg.app.name, "zebra");
        assert_eq!(cfg.http.addr, ":9000");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.outputs, vec!["stdout", "logs/app.log"]);
        assert_eq!(cfg.temporal.host_port, "temporal:7233");
        assert_eq!(cfg.temporal.default_task_queue, "q1");
    }

    #[test]
    fn partial_config_uses_defaults() {
        let file = write_temp(".yaml", "logging:\n  level: warn\n");
        let cfg = load(file.path()).unwrap();
        assert_eq!(cfg.logging.level, "warn");
        assert!(cfg.logging.outputs.is_empty());
        assert_eq!(cfg.http.addr_or_default(), ":8888");

        let temporal = cfg.temporal.resolved();
        assert_eq!(temporal.host_port, "127.0.0.1:7233");
        assert_eq!(temporal.http_host_port, "127.0.0.1:7243");
        assert_eq!(temporal.namespace, "default");
        assert_eq!(temporal.default_task_queue, "zebra-task-queue");
    }

    #[test]
    fn json_config_is_parsed_by_extension() {
        let file = write_temp(".json", r#"{"temporal": {"namespace": "ns"}}"#);
        let cfg = load(file.path()).unwrap();
        assert_eq!(cfg.temporal.namespace, "ns");
    }

    #[test]
    fn empty_file_is_default_config() {
        let file = write_temp(".yaml", "  \n");
        assert_eq!(load(file.path()).unwrap(), AppConfig::default());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let file = write_temp(".yaml", "logging: [unclosed");
        assert!(matches!(load(file.path()), Err(ConfigError::Yaml { .. })));
    }
}
