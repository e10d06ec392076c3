//! Command-line interface definitions for the `conf-sync` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, Subcommand};

/// Client configuration path used when `--config` is omitted.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "/etc/conf-sync/client.yaml";

/// Top-level CLI for the `conf-sync` binary.
#[derive(Debug, Parser)]
#[command(
    name = "conf-sync",
    version,
    about = "Mirror the files of a GitHub Gist onto the local filesystem",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Log level (`RUST_LOG` takes precedence when set).
    #[arg(
        short = 'l',
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["debug", "info", "warn", "error"]
    )]
    pub(crate) log_level: String,
    /// Path to the client configuration file.
    #[arg(short = 'c', long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub(crate) config: String,
    /// Gist to use instead of the one named by `GIST_ID` or the config file.
    #[arg(short = 'g', long, global = true, value_name = "ID")]
    pub(crate) gist_id: Option<String>,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Subcommands of `conf-sync`.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Poll the gist and keep mapped local files current until interrupted.
    #[command(name = "watch")]
    Watch,
    /// Apply the current gist contents once and exit.
    #[command(name = "sync")]
    Sync,
    /// List the files in the gist.
    #[command(name = "list")]
    List,
    /// Upload local files to the gist under their base names.
    #[command(name = "upload")]
    Upload(FilesArgs),
    /// Delete files from the gist by base name.
    #[command(name = "delete")]
    Delete(FilesArgs),
}

/// File arguments shared by `upload` and `delete`.
#[derive(Debug, Args)]
pub(crate) struct FilesArgs {
    /// Files to operate on.
    #[arg(required = true, value_name = "FILE")]
    pub(crate) files: Vec<String>,
}
