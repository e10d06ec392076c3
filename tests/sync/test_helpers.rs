//! Shared world for sync BDD scenarios.

use std::time::Duration;

use conf_sync::remote::Collection;
use conf_sync::sync::{CycleReport, Mapping, MappingOutcome, MappingTable, SyncEngine};
use conf_sync::test_support::{RecordingExecutor, ScriptedRemote};
use rstest::fixture;
use rstest_bdd::Slot;

use crate::fixtures::{Utf8TempDir, stamp};

type Engine = SyncEngine<ScriptedRemote, RecordingExecutor>;

/// State carried between the steps of one scenario.
pub struct SyncWorld {
    pub workspace: Utf8TempDir,
    pub remote: ScriptedRemote,
    collection: Slot<Collection>,
    mappings: Slot<Vec<Mapping>>,
    engine: Slot<Engine>,
    report: Slot<CycleReport>,
}

impl SyncWorld {
    fn new() -> Self {
        Self {
            workspace: Utf8TempDir::new(),
            remote: ScriptedRemote::new(Duration::from_secs(1)),
            collection: Slot::new(),
            mappings: Slot::new(),
            engine: Slot::new(),
            report: Slot::new(),
        }
    }

    /// Adds a live file to the gist served on every later cycle.
    pub fn add_file(&self, name: &str, content: &str) {
        self.collection
            .get_or_insert_with(|| Collection::new(stamp(0)))
            .push_file(name, content);
    }

    /// Adds a deleted file to the gist served on every later cycle.
    pub fn add_deleted(&self, name: &str) {
        self.collection
            .get_or_insert_with(|| Collection::new(stamp(0)))
            .push_deleted(name);
    }

    /// Maps `name` to `relative` inside the workspace.
    pub fn add_mapping(&self, name: &str, relative: &str) {
        self.mappings
            .get_or_insert_with(Vec::new)
            .push(Mapping::new(name, self.workspace.path(relative), None));
    }

    /// Serves the current gist once more and runs one cycle. The engine is
    /// built on first use so mapping state carries across cycles.
    pub fn run_cycle(&self) {
        if let Some(collection) = self.collection.get() {
            self.remote.push_collection(collection);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap_or_else(|err| panic!("build runtime: {err}"));
        let mut engine = self.engine.get_or_insert_with(|| {
            let mappings = self.mappings.take().unwrap_or_default();
            SyncEngine::new(
                self.remote.clone(),
                RecordingExecutor::new(),
                MappingTable::new(mappings),
            )
        });
        let report = runtime.block_on(engine.run_cycle());
        self.report.set(report);
    }

    /// Outcome reported for `name` by the latest cycle.
    pub fn outcome_for(&self, name: &str) -> Option<MappingOutcome> {
        self.report
            .with_ref(|report| report.outcome_for(name).cloned())
            .flatten()
    }

    /// Number of mappings the latest cycle processed.
    pub fn processed_mappings(&self) -> usize {
        self.report
            .with_ref(|report| report.mappings.len())
            .unwrap_or_else(|| panic!("no cycle has run"))
    }
}

#[fixture]
pub fn sync_world() -> SyncWorld {
    SyncWorld::new()
}
