//! `zebra-workflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`: start the HTTP API, optionally with an in-process engine
//!   and worker.
//! - `validate`: run a DSL input file through the input adapter.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::{LocalEngine, OrchestrationClient};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "zebra-workflow",
    about = "HTTP control plane for a durable workflow engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server.
    ///
    /// Only `--embedded` runs workflows in this process. Otherwise executions
    /// are started on the configured engine and stay pending until a worker
    /// polling the task queue is deployed separately; this binary has no
    /// standalone worker command.
    Serve {
        /// Configuration file, also watched for logging changes.
        #[arg(long, env = "ZEBRA_CONFIG", default_value = "configs/config.yaml")]
        config: PathBuf,
        /// OpenAPI document served at /swagger/openapi.yaml.
        #[arg(long, default_value = "docs/openapi.yaml")]
        openapi: PathBuf,
        /// Run an in-process engine and worker instead of dialing the
        /// configured engine. Development only: state is lost on exit.
        #[arg(long)]
        embedded: bool,
    },
    /// Check that a DSL input file (JSON or YAML) is accepted.
    Validate {
        /// Path to the input file.
        path: PathBuf,
        /// Version reported alongside the parse.
        #[arg(long, default_value = "v1")]
        version: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            openapi,
            embedded,
        } => serve(config, openapi, embedded).await,
        Command::Validate { path, version } => validate(&path, &version),
    }
}

async fn serve(config_path: PathBuf, openapi_path: PathBuf, embedded: bool) -> Result<()> {
    let config = settings::load(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let logger = telemetry::init(&config.logging).context("failed to initialize logging")?;
    info!(app = %config.app.name, config = %config_path.display(), "starting");

    let bind = settings::resolve_bind_addr(config.http.addr_or_default());

    let mut worker_task = None;
    let facade = if embedded {
        let engine = LocalEngine::new(config.temporal.resolved().namespace);
        let facade = OrchestrationClient::from_client(Arc::new(engine.clone()), &config.temporal);

        let mut worker = engine.worker(facade.default_queue());
        let registry = workflow::builtin()?;
        workflow::register_all(&mut worker, &registry, activities::builtin())?;
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(worker.run(async move {
            let _ = stop_rx.await;
        }));
        info!(task_queue = %facade.default_queue(), "embedded worker started");
        worker_task = Some((stop_tx, handle));
        facade
    } else {
        OrchestrationClient::connect(&config.temporal)
            .await
            .context("failed to connect to workflow engine")?
    };
    let facade = Arc::new(facade);

    let watch = match telemetry::watch(&config_path, logger.clone()) {
        Ok(watch) => Some(watch),
        Err(e) => {
            warn!(error = %e, "config watch unavailable, logging changes need a restart");
            None
        }
    };

    let state = api::AppState {
        facade: Arc::clone(&facade),
        config_path,
        openapi_path,
    };
    let served = api::serve(&bind.to_string(), state, shutdown_signal()).await;

    if let Some(watch) = watch {
        watch.stop().await;
    }
    if let Some((stop_tx, handle)) = worker_task {
        let _ = stop_tx.send(());
        match handle.await {
            Ok(Ok(())) => info!("embedded worker stopped"),
            Ok(Err(e)) => error!(error = %e, "embedded worker failed"),
            Err(e) => error!(error = %e, "embedded worker task panicked"),
        }
    }
    facade.close().await;
    info!("shutdown complete");
    if let Err(e) = logger.close() {
        eprintln!("failed to flush logs: {e}");
    }

    served.with_context(|| format!("http server on {bind} failed"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn read_input(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let value: Value = if is_json {
        serde_json::from_str(&content).context("invalid JSON")?
    } else {
        serde_yaml::from_str(&content).context("invalid YAML")?
    };
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a mapping at the top level, found {other}"),
    }
}

fn validate(path: &Path, version: &str) -> Result<()> {
    let input = read_input(path)?;
    match workflow::normalize(&input, version) {
        Ok((tree, shape)) => {
            println!(
                "✅ Input is valid ({shape} shape, version {version}). Activities: {:?}",
                tree.activity_names()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Validation failed: {e}");
            std::process::exit(1);
        }
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
    fn yaml_and_json_inputs_are_read_as_maps() {
        let yaml = write_temp(".yaml", "variables:\n  a: 1\nroot:\n  activity:\n    name: X\n");
        let map = read_input(yaml.path()).unwrap();
        assert!(map.contains_key("root"));

        let json = write_temp(".json", r#"{"input": {"variables": {"a": 1}}}"#);
        let map = read_input(json.path()).unwrap();
        assert!(map.contains_key("input"));
    }

    #[test]
    fn non_mapping_input_is_rejected() {
        let file = write_temp(".json", "[1, 2, 3]");
        let err = read_input(file.path()).unwrap_err();
        assert!(err.to_string().contains("expected a mapping"));
    }

    #[test]
    fn valid_input_passes_validation() {
        let file = write_temp(
            ".yaml",
            "root:\n  sequence:\n    - activity: { name: GetTitle, arguments: [r1], result: t }\n",
        );
        assert!(validate(file.path(), "v1").is_ok());
    }

    #[test]
    fn serve_arguments_default_to_the_repository_layout() {
        let cli = Cli::try_parse_from(["zebra-workflow", "serve"]).unwrap();
        match cli.command {
            Command::Serve {
                config,
                openapi,
                embedded,
            } => {
                if std::env::var_os("ZEBRA_CONFIG").is_none() {
                    assert_eq!(config, PathBuf::from("configs/config.yaml"));
                }
                assert_eq!(openapi, PathBuf::from("docs/openapi.yaml"));
                assert!(!embedded);
            }
            Command::Validate { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn serve_help_explains_where_workflows_run() {
        use clap::CommandFactory;

        let cli = Cli::command();
        let serve = cli.find_subcommand("serve").unwrap();
        let help = serve.get_long_about().unwrap().to_string();
        assert!(help.contains("--embedded"));
        assert!(help.contains("standalone worker"));
    }
}
