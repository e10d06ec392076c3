//! Binary entry point for the conf-sync CLI.

mod cli;

use std::future::pending;
use std::io::{self, Write};
use std::process;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use conf_sync::client_config::{ClientConfig, ClientConfigError};
use conf_sync::config::{ConfigError, GistConfig};
use conf_sync::gist::{GistClient, GistError};
use conf_sync::manage::{self, ManageError};
use conf_sync::sync::{ProcessCommandRunner, ShellEffectExecutor, SyncEngine};

type Engine = SyncEngine<GistClient, ShellEffectExecutor<ProcessCommandRunner>>;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ClientConfig(#[from] ClientConfigError),
    #[error("gist ID is required: pass --gist-id, set GIST_ID, or add gist_id to {0}")]
    MissingGistId(Utf8PathBuf),
    #[error("gist error: {0}")]
    Gist(#[from] GistError),
    #[error(transparent)]
    Manage(#[from] ManageError),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    let settings = GistConfig::load_without_cli_args()?;
    settings.validate()?;
    let config_path = Utf8PathBuf::from(cli.config);
    let gist_id = cli.gist_id.or_else(|| settings.id.clone());

    match cli.command {
        Command::Watch => {
            let mut engine = build_engine(&settings, &config_path, gist_id.as_deref())?;
            engine.run_until(shutdown_signal()).await;
            Ok(0)
        }
        Command::Sync => {
            let mut engine = build_engine(&settings, &config_path, gist_id.as_deref())?;
            let report = engine.sync_once().await?;
            info!(applied = report.applied(), "sync complete");
            Ok(0)
        }
        Command::List => {
            let client = management_client(&settings, &config_path, gist_id)?;
            let mut stdout = io::stdout().lock();
            manage::list(&client, &mut stdout).await?;
            Ok(0)
        }
        Command::Upload(args) => {
            let client = management_client(&settings, &config_path, gist_id)?;
            let paths: Vec<Utf8PathBuf> = args.files.into_iter().map(Utf8PathBuf::from).collect();
            manage::upload(&client, &paths).await?;
            Ok(0)
        }
        Command::Delete(args) => {
            let client = management_client(&settings, &config_path, gist_id)?;
            let summary = manage::delete(&client, &args.files).await?;
            Ok(i32::from(!summary.failed.is_empty()))
        }
    }
}

fn build_engine(
    settings: &GistConfig,
    config_path: &Utf8Path,
    gist_id: Option<&str>,
) -> Result<Engine, CliError> {
    let client_config = ClientConfig::load(config_path)?.with_gist_id(gist_id);
    client_config.validate()?;
    let check_interval = client_config.check_interval()?;
    let client = settings.client(&client_config.gist_id)?;
    if !client.is_authenticated() {
        warn!("GIST_TOKEN is not set; polling anonymously at most once a minute");
    }

    Ok(SyncEngine::with_check_interval(
        client,
        ShellEffectExecutor::new(ProcessCommandRunner),
        client_config.mapping_table(),
        check_interval,
    ))
}

fn management_client(
    settings: &GistConfig,
    config_path: &Utf8Path,
    gist_id: Option<String>,
) -> Result<GistClient, CliError> {
    let id = resolve_gist_id(gist_id, config_path)?;
    Ok(settings.client(&id)?)
}

/// Uses the explicit id when given, otherwise the client configuration
/// file's `gist_id`.
fn resolve_gist_id(explicit: Option<String>, config_path: &Utf8Path) -> Result<String, CliError> {
    if let Some(id) = explicit.filter(|value| !value.trim().is_empty()) {
        return Ok(id);
    }
    ClientConfig::load(config_path)
        .ok()
        .map(|config| config.gist_id)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| CliError::MissingGistId(config_path.to_path_buf()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for Ctrl-C; running until killed");
        pending::<()>().await;
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
