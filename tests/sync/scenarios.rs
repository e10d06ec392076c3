//! BDD scenarios for the sync engine.

use rstest_bdd_macros::scenario;

use super::test_helpers::{SyncWorld, sync_world};

#[scenario(
    path = "tests/features/sync.feature",
    name = "Unmapped gist files are ignored"
)]
fn scenario_unmapped_files(sync_world: SyncWorld) {
    drop(sync_world);
}

#[scenario(
    path = "tests/features/sync.feature",
    name = "Deleted gist files are never written"
)]
fn scenario_deleted_files(sync_world: SyncWorld) {
    drop(sync_world);
}

#[scenario(
    path = "tests/features/sync.feature",
    name = "A directory in the way is retried on the next cycle"
)]
fn scenario_directory_collision(sync_world: SyncWorld) {
    drop(sync_world);
}

#[scenario(
    path = "tests/features/sync.feature",
    name = "A rate-limited cycle leaves local files alone"
)]
fn scenario_rate_limited(sync_world: SyncWorld) {
    drop(sync_world);
}
