//! Core library for the conf-sync configuration mirror.
//!
//! The crate polls a GitHub Gist and keeps a set of local files in step with
//! it, optionally running a command after each update. The polling engine
//! lives in [`sync`] and talks to the remote only through the
//! [`remote::RemoteCollection`] trait, implemented for GitHub by
//! [`gist::GistClient`].

pub mod client_config;
pub mod config;
pub mod gist;
mod local_fs;
pub mod manage;
pub mod remote;
pub mod sync;
pub mod test_support;

pub use client_config::{ClientConfig, ClientConfigError, MappingEntry};
pub use config::{ConfigError, GistConfig};
pub use gist::{GistClient, GistError};
pub use manage::{DeleteSummary, ManageError};
pub use remote::{Collection, RemoteCollection, RemoteEntry};
pub use sync::{
    BackoffState, CycleReport, EffectExecutor, EffectOutcome, FetchOutcome, Mapping,
    MappingOutcome, MappingTable, ShellEffectExecutor, SyncEngine,
};
