//! Unit tests for the sync engine.

use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::{DateTime, TimeZone, Utc};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::remote::Collection;
use crate::test_support::{RecordingExecutor, ScriptedRemote, ScriptedRunner};

const SECOND: Duration = Duration::from_secs(1);

fn stamp(minute: u32) -> DateTime<Utc> {
    let Some(value) = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).single() else {
        panic!("valid timestamp for minute {minute}");
    };
    value
}

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }

    fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative))
            .unwrap_or_else(|err| panic!("read {relative}: {err}"))
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
    Workspace { _dir: dir, root }
}

fn engine_for(
    remote: &ScriptedRemote,
    executor: &RecordingExecutor,
    mappings: Vec<Mapping>,
) -> SyncEngine<ScriptedRemote, RecordingExecutor> {
    SyncEngine::new(remote.clone(), executor.clone(), MappingTable::new(mappings))
}

#[rstest]
#[tokio::test]
async fn first_cycle_applies_only_mapped_entries(workspace: Workspace) {
    let remote = ScriptedRemote::new(SECOND);
    let collection = Collection::new(stamp(0))
        .with_file("a.conf", "v1")
        .with_file("b.conf", "v2");
    remote.push_collection(collection.clone());
    remote.push_collection(collection);
    let executor = RecordingExecutor::new();
    let mut engine = engine_for(
        &remote,
        &executor,
        vec![Mapping::new("a.conf", workspace.path("a.conf"), None)],
    );

    let first = engine.run_cycle().await;
    assert_eq!(first.applied(), 1);
    assert_eq!(workspace.read("a.conf"), "v1");
    assert!(!workspace.path("b.conf").exists());
    let applied_at = engine.mappings().iter().map(Mapping::last_applied_at).next();
    assert_eq!(applied_at, Some(stamp(0)));

    let second = engine.run_cycle().await;
    assert_eq!(second.applied(), 0);
    assert_eq!(second.outcome_for("a.conf"), Some(&MappingOutcome::Unchanged));
}

#[rstest]
#[tokio::test]
async fn missing_entry_is_skipped_without_touching_state(workspace: Workspace) {
    let remote = ScriptedRemote::new(SECOND);
    remote.push_collection(Collection::new(stamp(0)).with_file("other.conf", "x"));
    let executor = RecordingExecutor::new();
    let mut engine = engine_for(
        &remote,
        &executor,
        vec![Mapping::new("a.conf", workspace.path("a.conf"), None)],
    );

    let report = engine.run_cycle().await;

    assert_eq!(report.outcome_for("a.conf"), Some(&MappingOutcome::NotFound));
    assert!(engine.mappings().iter().all(Mapping::is_pristine));
    assert!(!workspace.path("a.conf").exists());
}

#[rstest]
#[tokio::test]
async fn deleted_entry_is_never_written(workspace: Workspace) {
    let remote = ScriptedRemote::new(SECOND);
    remote.push_collection(Collection::new(stamp(0)).with_deleted("a.conf"));
    let executor = RecordingExecutor::new();
    let mut engine = engine_for(
        &remote,
        &executor,
        vec![Mapping::new(
            "a.conf",
            workspace.path("a.conf"),
            Some(String::from("touch marker")),
        )],
    );

    let report = engine.run_cycle().await;

    assert_eq!(report.outcome_for("a.conf"), Some(&MappingOutcome::Deleted));
    assert!(engine.mappings().iter().all(Mapping::is_pristine));
    assert!(!workspace.path("a.conf").exists());
    assert!(executor.executed().is_empty());
}

#[rstest]
#[tokio::test]
async fn directory_collision_is_retried_next_cycle(workspace: Workspace) {
    std::fs::write(workspace.path("blocker"), "not a directory")
        .unwrap_or_else(|err| panic!("seed blocker: {err}"));
    let remote = ScriptedRemote::new(SECOND);
    let collection = Collection::new(stamp(0)).with_file("a.conf", "v1");
    remote.push_collection(collection.clone());
    remote.push_collection(collection);
    let executor = RecordingExecutor::new();
    let mut engine = engine_for(
        &remote,
        &executor,
        vec![Mapping::new("a.conf", workspace.path("blocker/a.conf"), None)],
    );

    let first = engine.run_cycle().await;
    let Some(MappingOutcome::Failed { stage, .. }) = first.outcome_for("a.conf") else {
        panic!("expected a failed apply, got {first:?}");
    };
    assert_eq!(*stage, ApplyStage::CreateDirectories);
    assert!(engine.mappings().iter().all(Mapping::is_pristine));

    std::fs::remove_file(workspace.path("blocker"))
        .unwrap_or_else(|err| panic!("remove blocker: {err}"));
    let second = engine.run_cycle().await;
    assert_eq!(second.applied(), 1);
    assert_eq!(workspace.read("blocker/a.conf"), "v1");
}

#[rstest]
#[tokio::test]
async fn command_failure_does_not_cause_reapplication(workspace: Workspace) {
    let remote = ScriptedRemote::new(SECOND);
    let collection = Collection::new(stamp(0)).with_file("a.conf", "v1");
    remote.push_collection(collection.clone());
    remote.push_collection(collection);
    let executor = RecordingExecutor::with_outcome(EffectOutcome::Failed {
        code: Some(1),
        output: String::from("reload failed"),
    });
    let mut engine = engine_for(
        &remote,
        &executor,
        vec![Mapping::new(
            "a.conf",
            workspace.path("a.conf"),
            Some(String::from("reload")),
        )],
    );

    engine.run_cycle().await;
    engine.run_cycle().await;

    assert_eq!(executor.executed().len(), 1);
    let applied_at = engine.mappings().iter().map(Mapping::last_applied_at).next();
    assert_eq!(applied_at, Some(stamp(0)));
}

#[rstest]
#[tokio::test]
async fn collection_change_makes_every_present_mapping_eligible(workspace: Workspace) {
    let remote = ScriptedRemote::new(SECOND);
    remote.push_collection(
        Collection::new(stamp(0))
            .with_file("a.conf", "v1")
            .with_file("b.conf", "v1"),
    );
    remote.push_collection(
        Collection::new(stamp(5))
            .with_file("a.conf", "v2")
            .with_file("b.conf", "v1"),
    );
    let executor = RecordingExecutor::new();
    let mut engine = engine_for(
        &remote,
        &executor,
        vec![
            Mapping::new("a.conf", workspace.path("a.conf"), Some(String::from("a"))),
            Mapping::new("b.conf", workspace.path("b.conf"), Some(String::from("b"))),
        ],
    );

    engine.run_cycle().await;
    let report = engine.run_cycle().await;

    assert_eq!(report.applied(), 2);
    assert_eq!(workspace.read("a.conf"), "v2");
    let commands: Vec<String> = executor
        .executed()
        .into_iter()
        .map(|executed| executed.command)
        .collect();
    assert_eq!(commands, vec!["a", "b", "a", "b"]);
}

#[tokio::test]
async fn rate_limits_grow_and_successes_shrink_the_interval() {
    let remote = ScriptedRemote::new(SECOND);
    for _ in 0..3 {
        remote.push_rate_limited();
    }
    for _ in 0..3 {
        remote.push_collection(Collection::new(stamp(0)));
    }
    let mut engine = engine_for(&remote, &RecordingExecutor::new(), Vec::new());

    let mut intervals = vec![engine.backoff().current().as_secs()];
    for _ in 0..6 {
        intervals.push(engine.run_cycle().await.interval.as_secs());
    }

    assert_eq!(intervals, vec![1, 2, 4, 8, 4, 2, 1]);
}

#[tokio::test]
async fn other_errors_leave_the_interval_unchanged() {
    let remote = ScriptedRemote::new(SECOND);
    remote.push_rate_limited();
    remote.push_error("404 Not Found");
    let mut engine = engine_for(&remote, &RecordingExecutor::new(), Vec::new());

    engine.run_cycle().await;
    let report = engine.run_cycle().await;

    assert!(matches!(report.fetch, FetchOutcome::Failed { .. }));
    assert_eq!(report.interval, Duration::from_secs(2));
}

#[test]
fn check_interval_raises_the_floor() {
    let remote = ScriptedRemote::new(SECOND);
    let engine = SyncEngine::with_check_interval(
        remote,
        RecordingExecutor::new(),
        MappingTable::default(),
        Duration::from_secs(30),
    );
    assert_eq!(engine.backoff().min(), Duration::from_secs(30));
}

#[tokio::test]
async fn sync_once_returns_fetch_errors() {
    let remote = ScriptedRemote::new(SECOND);
    remote.push_error("boom");
    let mut engine = engine_for(&remote, &RecordingExecutor::new(), Vec::new());

    let result = engine.sync_once().await;

    let Err(err) = result else {
        panic!("sync_once should surface the fetch error");
    };
    assert_eq!(err.message, "boom");
}

#[tokio::test(start_paused = true)]
async fn run_until_sleeps_between_cycles_and_stops_on_shutdown() {
    let remote = ScriptedRemote::new(Duration::from_secs(10));
    let mut engine = engine_for(&remote, &RecordingExecutor::new(), Vec::new());

    engine
        .run_until(tokio::time::sleep(Duration::from_secs(25)))
        .await;

    assert_eq!(remote.fetches(), 3);
}

#[test]
fn shell_executor_runs_through_sh() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), "reloaded\n", "");
    let executor = ShellEffectExecutor::new(runner.clone());
    let mapping = Mapping::new("a.conf", "/tmp/a.conf", None);

    let outcome = executor.execute(&mapping, "systemctl reload nginx");

    assert_eq!(
        outcome,
        EffectOutcome::Succeeded {
            output: String::from("reloaded"),
        }
    );
    let invocations = runner.invocations();
    let commands: Vec<String> = invocations
        .iter()
        .map(|invocation| invocation.command_string())
        .collect();
    assert_eq!(commands, vec!["sh -c systemctl reload nginx"]);
}

#[rstest]
#[case::non_zero(Some(3), EffectOutcome::Failed { code: Some(3), output: String::from("simulated failure") })]
#[case::signalled(None, EffectOutcome::Failed { code: None, output: String::from("simulated failure") })]
fn shell_executor_reports_failures(#[case] code: Option<i32>, #[case] expected: EffectOutcome) {
    let runner = ScriptedRunner::new();
    runner.push_output(code, "", "simulated failure");
    let executor = ShellEffectExecutor::new(runner);
    let mapping = Mapping::new("a.conf", "/tmp/a.conf", None);

    assert_eq!(executor.execute(&mapping, "false"), expected);
}

#[test]
fn shell_executor_reports_spawn_failures() {
    let executor = ShellEffectExecutor::new(ScriptedRunner::new());
    let mapping = Mapping::new("a.conf", "/tmp/a.conf", None);

    let outcome = executor.execute(&mapping, "true");

    assert!(matches!(outcome, EffectOutcome::SpawnFailed(CommandError::Spawn { .. })));
}

#[test]
fn blank_exec_command_is_treated_as_none() {
    let mapping = Mapping::new("a.conf", "/tmp/a.conf", Some(String::from("   ")));
    assert_eq!(mapping.exec_command(), None);
    assert!(mapping.is_pristine());
}
