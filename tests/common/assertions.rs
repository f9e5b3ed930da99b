//! Custom test assertions for import E2E tests

use std::path::Path;
use std::time::Duration;
use wxr_import::{Event, ImportManager, ImportPhase, JobSnapshot, JobState, RecordKind};

/// Result of waiting for an import to reach a terminal state
#[derive(Debug)]
pub enum WaitResult {
    /// Import completed with every phase run to the end
    Completed(JobSnapshot),
    /// Import aborted with a fatal error
    Failed(JobSnapshot),
    /// Import was stopped by a cancel request
    Cancelled(JobSnapshot),
    /// Timeout waiting for a terminal state
    Timeout,
}

/// Wait for the current import to reach a terminal state
///
/// Polls the manager's status; the job slot keeps its terminal snapshot, so
/// no event can be missed even when the run finishes before the first poll.
///
/// # Arguments
/// * `manager` - The import manager instance
/// * `timeout` - Maximum time to wait
///
/// # Returns
/// `WaitResult` carrying the terminal snapshot, or `Timeout`
pub async fn wait_for_outcome(manager: &ImportManager, timeout: Duration) -> WaitResult {
    let poll = async {
        loop {
            if let Ok(snapshot) = manager.status().await {
                match snapshot.state {
                    JobState::Completed => return WaitResult::Completed(snapshot),
                    JobState::Failed => return WaitResult::Failed(snapshot),
                    JobState::Cancelled => return WaitResult::Cancelled(snapshot),
                    JobState::Running => {}
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => result,
        Err(_) => WaitResult::Timeout,
    }
}

/// Assert that the import completed and return its terminal snapshot
pub async fn assert_import_completed(manager: &ImportManager, timeout: Duration) -> JobSnapshot {
    match wait_for_outcome(manager, timeout).await {
        WaitResult::Completed(snapshot) => snapshot,
        WaitResult::Failed(snapshot) => {
            panic!("Import failed with error: {:?}", snapshot.error);
        }
        WaitResult::Cancelled(snapshot) => {
            panic!("Import was cancelled: {:?}", snapshot.error);
        }
        WaitResult::Timeout => {
            panic!("Timeout waiting for import to complete");
        }
    }
}

/// Assert that the import was cancelled and return its terminal snapshot
pub async fn assert_import_cancelled(manager: &ImportManager, timeout: Duration) -> JobSnapshot {
    match wait_for_outcome(manager, timeout).await {
        WaitResult::Cancelled(snapshot) => snapshot,
        WaitResult::Completed(_) => {
            panic!("Expected import to be cancelled, but it completed");
        }
        WaitResult::Failed(snapshot) => {
            panic!(
                "Expected import to be cancelled, but it failed: {:?}",
                snapshot.error
            );
        }
        WaitResult::Timeout => {
            panic!("Timeout waiting for import to be cancelled");
        }
    }
}

/// Assert that the import failed and return its terminal snapshot
pub async fn assert_import_failed(manager: &ImportManager, timeout: Duration) -> JobSnapshot {
    match wait_for_outcome(manager, timeout).await {
        WaitResult::Failed(snapshot) => snapshot,
        WaitResult::Completed(_) => {
            panic!("Expected import to fail, but it completed");
        }
        WaitResult::Cancelled(snapshot) => {
            panic!(
                "Expected import to fail, but it was cancelled: {:?}",
                snapshot.error
            );
        }
        WaitResult::Timeout => {
            panic!("Timeout waiting for import to fail");
        }
    }
}

/// Drain every event already delivered to the receiver
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Phases that emitted `PhaseStarted`, in emission order
pub fn started_phases(events: &[Event]) -> Vec<ImportPhase> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::PhaseStarted { phase } => Some(*phase),
            _ => None,
        })
        .collect()
}

/// Record keys that emitted `RecordFailed`, with their kinds
pub fn failed_records(events: &[Event]) -> Vec<(RecordKind, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::RecordFailed { kind, key, .. } => Some((*kind, key.clone())),
            _ => None,
        })
        .collect()
}

/// File names under a directory tree, sorted
pub fn file_names_under(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Assert that the expected files exist somewhere under the directory tree
pub fn assert_files_exist(dir: &Path, expected_files: &[&str]) {
    let names = file_names_under(dir);
    for filename in expected_files {
        assert!(
            names.iter().any(|n| n == filename),
            "Expected file '{}' under {:?}, found: {:?}",
            filename,
            dir,
            names
        );
    }
}

/// Assert that none of the files exist anywhere under the directory tree
pub fn assert_files_absent(dir: &Path, unexpected_files: &[&str]) {
    let names = file_names_under(dir);
    for filename in unexpected_files {
        assert!(
            !names.iter().any(|n| n == filename),
            "Expected file '{}' to be absent under {:?}",
            filename,
            dir
        );
    }
}
