//! Adaptive polling engine that mirrors a remote collection onto local files.
//!
//! Each cycle fetches the whole collection once, adjusts the poll interval,
//! then walks the mapping table in configuration order. An entry is written
//! when the collection timestamp is newer than the mapping's last applied
//! timestamp. Because the remote exposes a single timestamp per collection,
//! any change makes every present mapping eligible at once.
//!
//! Every error is absorbed and logged: the engine never stops on its own.

mod apply;
mod backoff;
mod effect;
mod mapping;
mod types;

use std::future::{Future, pending};
use std::time::Duration;

use chrono::{DateTime, Utc};
use humantime::format_duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::remote::{Collection, MAX_BACKOFF_INTERVAL, RemoteCollection};

pub use apply::{ApplyError, ApplyStage, MappingOutcome, write_local};
pub use backoff::BackoffState;
pub use effect::{EffectExecutor, EffectOutcome, ShellEffectExecutor};
pub use mapping::{Mapping, MappingTable};
pub use types::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};

/// How the fetch step of a cycle ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FetchOutcome {
    /// The collection was fetched.
    Fetched {
        /// Number of entries, deleted ones included.
        entries: usize,
        /// Collection timestamp.
        updated_at: DateTime<Utc>,
    },
    /// The accessor reported a rate-limit error; the interval grew.
    RateLimited {
        /// Error text.
        message: String,
    },
    /// Any other fetch error; the interval is unchanged.
    Failed {
        /// Error text.
        message: String,
    },
}

/// Outcome for one mapping in one cycle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MappingReport {
    /// Remote entry name.
    pub remote_name: String,
    /// What happened.
    pub outcome: MappingOutcome,
}

/// Summary of one poll cycle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CycleReport {
    /// Fetch result.
    pub fetch: FetchOutcome,
    /// Per-mapping outcomes in table order. Empty when the fetch failed.
    pub mappings: Vec<MappingReport>,
    /// Interval the loop sleeps before the next cycle.
    pub interval: Duration,
}

impl CycleReport {
    /// Number of mappings written this cycle.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.mappings
            .iter()
            .filter(|report| report.outcome.is_applied())
            .count()
    }

    /// Outcome recorded for `remote_name`, first match in table order.
    #[must_use]
    pub fn outcome_for(&self, remote_name: &str) -> Option<&MappingOutcome> {
        self.mappings
            .iter()
            .find(|report| report.remote_name == remote_name)
            .map(|report| &report.outcome)
    }
}

/// Polls `remote` and applies changes to the mapping table.
#[derive(Debug)]
pub struct SyncEngine<A, E> {
    remote: A,
    executor: E,
    mappings: MappingTable,
    backoff: BackoffState,
}

impl<A: RemoteCollection, E: EffectExecutor> SyncEngine<A, E> {
    /// Creates an engine whose interval floor is the accessor's minimum.
    #[must_use]
    pub fn new(remote: A, executor: E, mappings: MappingTable) -> Self {
        let floor = remote.minimum_interval();
        Self::with_floor(remote, executor, mappings, floor)
    }

    /// Creates an engine that never polls faster than `check_interval` nor
    /// faster than the accessor allows.
    #[must_use]
    pub fn with_check_interval(
        remote: A,
        executor: E,
        mappings: MappingTable,
        check_interval: Duration,
    ) -> Self {
        let floor = remote.minimum_interval().max(check_interval);
        Self::with_floor(remote, executor, mappings, floor)
    }

    fn with_floor(remote: A, executor: E, mappings: MappingTable, floor: Duration) -> Self {
        Self {
            remote,
            executor,
            mappings,
            backoff: BackoffState::new(floor, MAX_BACKOFF_INTERVAL),
        }
    }

    /// Mapping table with current timestamps.
    #[must_use]
    pub const fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    /// Current backoff state.
    #[must_use]
    pub const fn backoff(&self) -> &BackoffState {
        &self.backoff
    }

    /// Runs one cycle without sleeping. Fetch errors adjust the backoff and
    /// are reported, never returned.
    pub async fn run_cycle(&mut self) -> CycleReport {
        debug!("checking for updates");
        match self.remote.fetch_all().await {
            Ok(collection) => self.apply_collection(&collection),
            Err(err) => self.record_fetch_error(&err),
        }
    }

    /// Runs one cycle, returning the fetch error instead of absorbing it.
    ///
    /// # Errors
    ///
    /// Returns the accessor's error when the fetch fails.
    pub async fn sync_once(&mut self) -> Result<CycleReport, A::Error> {
        let collection = self.remote.fetch_all().await?;
        let report = self.apply_collection(&collection);
        if report.applied() == 0 {
            info!("no files were updated");
        }
        Ok(report)
    }

    /// Polls until the process exits.
    pub async fn run_forever(&mut self) {
        self.run_until(pending::<()>()).await;
    }

    /// Polls until `shutdown` resolves. Shutdown is only observed while
    /// sleeping, so a cycle in progress always completes.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            mappings = self.mappings.len(),
            interval = %format_duration(self.backoff.current()),
            "starting file watcher"
        );
        loop {
            let report = self.run_cycle().await;
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested; stopping file watcher");
                    return;
                }
                () = sleep(report.interval) => {}
            }
        }
    }

    fn record_fetch_error(&mut self, err: &A::Error) -> CycleReport {
        let message = err.to_string();
        let fetch = if self.remote.is_rate_limited(err) {
            let interval = self.backoff.on_rate_limited();
            warn!(
                interval = %format_duration(interval),
                "rate limited; increasing check interval"
            );
            FetchOutcome::RateLimited { message }
        } else {
            error!(error = %message, "failed to download files");
            FetchOutcome::Failed { message }
        };
        CycleReport {
            fetch,
            mappings: Vec::new(),
            interval: self.backoff.current(),
        }
    }

    fn apply_collection(&mut self, collection: &Collection) -> CycleReport {
        if let Some(interval) = self.backoff.on_success() {
            info!(interval = %format_duration(interval), "reducing check interval");
        }
        debug!(
            files = collection.len(),
            updated_at = %collection.updated_at(),
            "fetched gist"
        );

        let executor = &self.executor;
        let reports = self
            .mappings
            .iter_mut()
            .map(|mapping| MappingReport {
                remote_name: mapping.remote_name().to_owned(),
                outcome: apply::process_mapping(mapping, collection, executor),
            })
            .collect();

        CycleReport {
            fetch: FetchOutcome::Fetched {
                entries: collection.len(),
                updated_at: collection.updated_at(),
            },
            mappings: reports,
            interval: self.backoff.current(),
        }
    }
}

#[cfg(test)]
mod tests;
