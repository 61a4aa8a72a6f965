//! Normalized logging configuration.
//!
//! Fallbacks:
//! - level: case-insensitive `debug|info|warn|error`, anything else is `info`;
//! - encoding: `json|console`, anything else is `json`;
//! - outputs: `stdout`, `stderr` or a file path; an empty list is `[stdout]`.
//!   A file that cannot be created becomes `stdout` when the sinks are opened.

use std::fmt;
use std::path::PathBuf;

use settings::LoggingSection;
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Console,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Console => "console",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    pub encoding: Encoding,
    pub outputs: Vec<Output>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            encoding: Encoding::Json,
            outputs: vec![Output::Stdout],
        }
    }
}

impl LoggingConfig {
    pub fn normalize(section: &LoggingSection) -> Self {
        let outputs: Vec<Output> = section.outputs.iter().map(|o| parse_output(o)).collect();
        Self {
            level: parse_level(&section.level),
            encoding: parse_encoding(&section.encoding),
            outputs: if outputs.is_empty() {
                vec![Output::Stdout]
            } else {
                outputs
            },
        }
    }

    /// Outputs rendered for log fields.
    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(ToString::to_string).collect()
    }
}

pub fn parse_level(raw: &str) -> Level {
    match raw.trim().to_ascii_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

pub fn parse_encoding(raw: &str) -> Encoding {
    match raw.trim().to_ascii_lowercase().as_str() {
        "console" => Encoding::Console,
        _ => Encoding::Json,
    }
}

fn parse_output(raw: &str) -> Output {
    match raw.trim() {
        "stdout" | "" => Output::Stdout,
        "stderr" => Output::Stderr,
        path => Output::File(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(level: &str, encoding: &str, outputs: &[&str]) -> LoggingSection {
        LoggingSection {
            level: level.into(),
            encoding: encoding.into(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn level_parse_is_case_insensitive_with_info_fallback() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level(" Warn "), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("verbose"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn unknown_encoding_falls_back_to_json() {
        assert_eq!(parse_encoding("console"), Encoding::Console);
        assert_eq!(parse_encoding("xml"), Encoding::Json);
        assert_eq!(parse_encoding(""), Encoding::Json);
    }

    #[test]
    fn empty_outputs_become_stdout() {
        let config = LoggingConfig::normalize(&section("info", "json", &[]));
        assert_eq!(config.outputs, vec![Output::Stdout]);
    }

    #[test]
    fn outputs_keep_their_order() {
        let config = LoggingConfig::normalize(&section("", "", &["stderr", "logs/app.log", "stdout"]));
        assert_eq!(
            config.outputs,
            vec![
                Output::Stderr,
                Output::File(PathBuf::from("logs/app.log")),
                Output::Stdout
            ]
        );
        assert_eq!(config.output_names(), vec!["stderr", "logs/app.log", "stdout"]);
    }
}
