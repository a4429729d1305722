/// End-to-end scanner integration tests.
///
/// These drive the real `ScanScheduler` (scan thread, rayon pool, bounded
/// channel) against temporary trees and check the delivery contract:
/// partial results per immediate child, exactly one terminal event per
/// generation, and stale generations filtered out by the consumer.
use foldersize_core::scanner::{
    ScanConfig, ScanEvent, ScanHandle, ScanMessage, ScanScheduler, ScanState, ScanView,
};
use foldersize_core::ScanError;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// ```text
/// root/
///   a.txt     (100 bytes)
///   sub/
///     b.txt   (300 bytes)
/// ```
fn build_small_tree(root: &Path) {
    fs::create_dir_all(root.join("sub")).unwrap();
    write_bytes(&root.join("a.txt"), 100);
    write_bytes(&root.join("sub/b.txt"), 300);
}

/// Wide tree so a scan takes long enough to be cancelled mid-flight.
fn build_wide_tree(root: &Path, dirs: usize, files_per_dir: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("d{d:03}"));
        fs::create_dir_all(&dir).unwrap();
        for f in 0..files_per_dir {
            write_bytes(&dir.join(format!("f{f:03}")), 1);
        }
    }
}

fn write_bytes(path: &Path, n: usize) {
    let mut f = fs::File::create(path).unwrap();
    f.write_all(&vec![0u8; n]).unwrap();
}

fn scheduler() -> ScanScheduler {
    ScanScheduler::with_config(ScanConfig {
        threads: 4,
        channel_capacity: 1_024,
    })
    .expect("failed to build scheduler")
}

/// Collect messages until `handle`'s generation reports a terminal event.
///
/// Waits up to 30 seconds so a stuck scan fails the test instead of
/// hanging the suite.
fn drain_generation(scheduler: &ScanScheduler, handle: &ScanHandle) -> Vec<ScanMessage> {
    let deadline = Instant::now() + Duration::from_secs(30);
    let mut seen = Vec::new();
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        assert!(!left.is_zero(), "scan did not finish within 30 seconds");
        match scheduler.receiver().recv_timeout(left) {
            Ok(msg) => {
                let done = msg.generation == handle.generation() && msg.is_terminal();
                seen.push(msg);
                if done {
                    return seen;
                }
            }
            Err(err) => panic!("scan channel failed: {err}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// root/{a.txt, sub/{b.txt}}: one partial per child, then Done with the
/// grand total and the regular-file count.
#[test]
fn small_tree_reports_partials_then_done() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    build_small_tree(tmp.path());

    let mut scheduler = scheduler();
    let handle = scheduler.start_scan(tmp.path()).unwrap();
    let msgs = drain_generation(&scheduler, &handle);

    let mut partials: Vec<(String, u64)> = msgs
        .iter()
        .filter_map(|m| match &m.event {
            ScanEvent::Partial(item) => Some((item.name.to_string(), item.size_or_zero())),
            _ => None,
        })
        .collect();
    partials.sort();
    assert_eq!(
        partials,
        [("a.txt".to_string(), 100), ("sub".to_string(), 300)]
    );

    let terminals: Vec<&ScanMessage> = msgs.iter().filter(|m| m.is_terminal()).collect();
    assert_eq!(terminals.len(), 1);
    match &terminals[0].event {
        ScanEvent::Done(summary) => {
            assert_eq!(summary.total_bytes, 400);
            assert_eq!(summary.file_count, 2);
            assert_eq!(summary.items.len(), 2);
            assert_eq!(summary.items[0].name, "sub");
        }
        other => panic!("expected Done, got {other:?}"),
    }

    assert_eq!(handle.state(), ScanState::Completed);
    assert_eq!(handle.sizes().get(tmp.path()), Some(400));
    assert_eq!(handle.sizes().get(&tmp.path().join("sub")), Some(300));
}

/// An empty directory completes with no partials and zero totals.
#[test]
fn empty_directory_completes_with_zero() {
    let tmp = TempDir::new().expect("failed to create temp dir");

    let mut scheduler = scheduler();
    let handle = scheduler.start_scan(tmp.path()).unwrap();
    let msgs = drain_generation(&scheduler, &handle);

    assert_eq!(msgs.len(), 1);
    match &msgs[0].event {
        ScanEvent::Done(summary) => {
            assert_eq!(summary.total_bytes, 0);
            assert_eq!(summary.file_count, 0);
            assert!(summary.items.is_empty());
        }
        other => panic!("expected Done, got {other:?}"),
    }
}

/// A missing root fails once, without partials.
#[test]
fn missing_root_fails_once() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let missing = tmp.path().join("does-not-exist");

    let mut scheduler = scheduler();
    let handle = scheduler.start_scan(&missing).unwrap();
    let msgs = drain_generation(&scheduler, &handle);

    assert_eq!(msgs.len(), 1);
    assert!(matches!(
        msgs[0].event,
        ScanEvent::Failed(ScanError::RootUnavailable { .. })
    ));
    assert_eq!(handle.state(), ScanState::Failed);
}

/// A regular file is not a scan root.
#[test]
fn file_root_is_rejected() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let file = tmp.path().join("plain.txt");
    write_bytes(&file, 10);

    let mut scheduler = scheduler();
    let handle = scheduler.start_scan(&file).unwrap();
    let msgs = drain_generation(&scheduler, &handle);

    assert!(matches!(
        msgs[0].event,
        ScanEvent::Failed(ScanError::NotADirectory { .. })
    ));
}

/// Cancelling yields exactly one Cancelled and never a Done for that
/// generation; nothing follows the terminal event.
#[test]
fn cancelled_scan_reports_cancelled_once() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    build_wide_tree(tmp.path(), 200, 20);

    let mut scheduler = scheduler();
    let handle = scheduler.start_scan(tmp.path()).unwrap();
    handle.cancel();
    let msgs = drain_generation(&scheduler, &handle);

    let terminal = msgs.last().unwrap();
    // Even if every subtree finished before the flag was seen, the terminal
    // event is Cancelled.
    assert!(matches!(terminal.event, ScanEvent::Cancelled));
    assert_eq!(msgs.iter().filter(|m| m.is_terminal()).count(), 1);
    assert!(!msgs.iter().any(|m| matches!(m.event, ScanEvent::Done(_))));
    assert_eq!(handle.state(), ScanState::Cancelled);

    std::thread::sleep(Duration::from_millis(50));
    assert!(scheduler.receiver().try_recv().is_err());
}

/// Starting a new scan supersedes the old one; a consumer tracking the
/// new generation never observes the old generation's messages.
#[test]
fn superseded_generation_is_never_observed() {
    let old_tree = TempDir::new().expect("failed to create temp dir");
    build_wide_tree(old_tree.path(), 100, 10);
    let new_tree = TempDir::new().expect("failed to create temp dir");
    build_small_tree(new_tree.path());

    let mut scheduler = scheduler();
    let first = scheduler.start_scan(old_tree.path()).unwrap();
    let second = scheduler.start_scan(new_tree.path()).unwrap();
    assert!(second.generation() > first.generation());
    assert!(first.is_cancelled() || first.state() == ScanState::Completed);

    let mut view = ScanView::default();
    view.begin(second.generation());
    for msg in drain_generation(&scheduler, &second) {
        let stale = msg.generation != second.generation();
        assert_eq!(view.apply(msg), !stale);
    }

    assert_eq!(view.state(), ScanState::Completed);
    assert_eq!(view.total_bytes(), 400);
    let names: Vec<&str> = view.items().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["sub", "a.txt"]);
}

/// After a terminal state the scheduler can go back to Idle.
#[test]
fn reset_after_completion() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    build_small_tree(tmp.path());

    let mut scheduler = scheduler();
    let handle = scheduler.start_scan(tmp.path()).unwrap();
    drain_generation(&scheduler, &handle);

    assert_eq!(scheduler.state(), ScanState::Completed);
    assert!(scheduler.reset());
    assert_eq!(scheduler.state(), ScanState::Idle);
}
