//! BDD step definitions for mirroring gist files.

use conf_sync::sync::{ApplyStage, MappingOutcome};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::SyncWorld;

#[given("the gist holds {name:string} containing {content:string}")]
fn gist_holds_file(sync_world: &SyncWorld, name: &str, content: &str) {
    sync_world.add_file(name, content);
}

#[given("the gist marks {name:string} as deleted")]
fn gist_marks_deleted(sync_world: &SyncWorld, name: &str) {
    sync_world.add_deleted(name);
}

#[given("the gist is rate limited")]
fn gist_is_rate_limited(sync_world: &SyncWorld) {
    sync_world.remote.push_rate_limited();
}

#[given("{name:string} is mapped to {path:string}")]
fn file_is_mapped(sync_world: &SyncWorld, name: &str, path: &str) {
    sync_world.add_mapping(name, path);
}

#[given("a directory occupies {path:string}")]
fn directory_occupies(sync_world: &SyncWorld, path: &str) {
    std::fs::create_dir_all(sync_world.workspace.path(path))
        .unwrap_or_else(|err| panic!("create {path}: {err}"));
}

#[when("the directory at {path:string} is removed")]
fn directory_removed(sync_world: &SyncWorld, path: &str) {
    std::fs::remove_dir_all(sync_world.workspace.path(path))
        .unwrap_or_else(|err| panic!("remove {path}: {err}"));
}

#[when("a sync cycle runs")]
fn sync_cycle_runs(sync_world: &SyncWorld) {
    sync_world.run_cycle();
}

#[then("the local file {path:string} contains {content:string}")]
fn local_file_contains(sync_world: &SyncWorld, path: &str, content: &str) {
    assert_eq!(sync_world.workspace.read(path), content);
}

#[then("no local file exists at {path:string}")]
fn no_local_file(sync_world: &SyncWorld, path: &str) {
    assert!(
        !sync_world.workspace.path(path).exists(),
        "{path} should not have been written"
    );
}

#[then("the mapping for {name:string} reports a deletion")]
fn mapping_reports_deletion(sync_world: &SyncWorld, name: &str) {
    assert_eq!(sync_world.outcome_for(name), Some(MappingOutcome::Deleted));
}

#[then("the mapping for {name:string} fails while writing")]
fn mapping_fails_while_writing(sync_world: &SyncWorld, name: &str) {
    let Some(MappingOutcome::Failed { stage, .. }) = sync_world.outcome_for(name) else {
        panic!("{name} should have failed to apply");
    };
    assert_eq!(stage, ApplyStage::Write);
}

#[then("no mappings were processed")]
fn no_mappings_processed(sync_world: &SyncWorld) {
    assert_eq!(sync_world.processed_mappings(), 0);
}
