/// Per-scan orchestration, run on the scan's own thread.
///
/// Files of the scan root are reported first, in name order, as soon as
/// they are stat'ed. Subdirectories are then aggregated in parallel on the
/// scheduler's pool; each one is reported the moment its subtree total is
/// known.
///
/// All sends go through an [`Emitter`], which serialises them behind one
/// lock and closes for good after the terminal event. That gives the two
/// delivery guarantees the consumer relies on: exactly one terminal event,
/// and no partial after it or after cancellation is acknowledged.
use super::progress::{ScanEvent, ScanMessage, ScanSummary};
use super::{Generation, ScanState};
use crate::aggregate::{ParallelAggregator, Subtotal};
use crate::error::ScanError;
use crate::model::{AggregateSizeMap, SizeItem};
use crate::sort::{sort_items, SortMode};
use crate::walker;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything one scan needs, moved onto its thread.
pub(crate) struct ScanContext {
    pub generation: Generation,
    pub root: PathBuf,
    pub cancel: Arc<AtomicBool>,
    pub state: Arc<Mutex<ScanState>>,
    pub sizes: Arc<AggregateSizeMap>,
    pub pool: Arc<ThreadPool>,
    pub tx: Sender<ScanMessage>,
}

impl ScanContext {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Serialised, closable sender for one generation.
pub(crate) struct Emitter<'a> {
    generation: Generation,
    tx: &'a Sender<ScanMessage>,
    cancel: &'a AtomicBool,
    state: &'a Mutex<ScanState>,
    closed: Mutex<bool>,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(
        generation: Generation,
        tx: &'a Sender<ScanMessage>,
        cancel: &'a AtomicBool,
        state: &'a Mutex<ScanState>,
    ) -> Self {
        Self {
            generation,
            tx,
            cancel,
            state,
            closed: Mutex::new(false),
        }
    }

    /// Send a partial result unless the scan is closed or cancelled.
    ///
    /// The lock is held across the send. When the channel is full, the
    /// first pool worker blocks on the channel and the others queue on
    /// the lock, which is the back-pressure the scan accepts. The terminal
    /// event can then never overtake a partial already in flight.
    pub(crate) fn partial(&self, item: SizeItem) -> bool {
        let closed = self.closed.lock();
        if *closed || self.cancel.load(Ordering::Relaxed) {
            return false;
        }
        self.tx
            .send(ScanMessage {
                generation: self.generation,
                event: ScanEvent::Partial(item),
            })
            .is_ok()
    }

    /// Send the single terminal event.
    ///
    /// `Ok(None)` means the work stopped early. A raised cancel flag always
    /// wins, whatever the outcome was. Later calls are no-ops.
    pub(crate) fn finish(&self, outcome: Result<Option<ScanSummary>, ScanError>) {
        let mut closed = self.closed.lock();
        if *closed {
            return;
        }
        *closed = true;

        let cancelled = self.cancel.load(Ordering::Relaxed);
        let (state, event) = match outcome {
            _ if cancelled => (ScanState::Cancelled, ScanEvent::Cancelled),
            Ok(None) => (ScanState::Cancelled, ScanEvent::Cancelled),
            Ok(Some(summary)) => (ScanState::Completed, ScanEvent::Done(summary)),
            Err(err) => (ScanState::Failed, ScanEvent::Failed(err)),
        };
        *self.state.lock() = state;

        if self
            .tx
            .send(ScanMessage {
                generation: self.generation,
                event,
            })
            .is_err()
        {
            debug!("scan {}: consumer gone before terminal event", self.generation);
        }
    }
}

/// Run one scan to its terminal event.
pub(crate) fn run_scan(ctx: ScanContext) {
    let start = Instant::now();
    info!("scan {} started: {}", ctx.generation, ctx.root.display());

    let emitter = Emitter::new(ctx.generation, &ctx.tx, &ctx.cancel, &ctx.state);
    let outcome = scan_root(&ctx, &emitter, start);

    match &outcome {
        Ok(Some(summary)) if !ctx.cancelled() => info!(
            "scan {} complete: {} bytes in {} files ({:?})",
            ctx.generation, summary.total_bytes, summary.file_count, summary.duration
        ),
        Err(err) if !ctx.cancelled() => warn!("scan {} failed: {err}", ctx.generation),
        _ => info!("scan {} cancelled after {:?}", ctx.generation, start.elapsed()),
    }

    emitter.finish(outcome);
}

fn scan_root(
    ctx: &ScanContext,
    emitter: &Emitter<'_>,
    start: Instant,
) -> Result<Option<ScanSummary>, ScanError> {
    let meta = fs::metadata(&ctx.root).map_err(|source| ScanError::RootUnavailable {
        path: ctx.root.clone(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory {
            path: ctx.root.clone(),
        });
    }

    let listing =
        walker::read_children(&ctx.root, &ctx.cancel).map_err(|source| {
            ScanError::RootUnavailable {
                path: ctx.root.clone(),
                source,
            }
        })?;
    debug!(
        "scan {}: {} files, {} subdirectories at root",
        ctx.generation,
        listing.files.len(),
        listing.dirs.len()
    );

    let items: Mutex<Vec<SizeItem>> = Mutex::new(Vec::with_capacity(listing.len()));
    let mut total = Subtotal::default();

    for file in &listing.files {
        if ctx.cancelled() {
            return Ok(None);
        }
        total += Subtotal {
            bytes: file.size_bytes,
            files: u64::from(file.is_regular_file()),
        };
        let item = SizeItem::file(file);
        items.lock().push(item.clone());
        emitter.partial(item);
    }

    let sizes = ctx.sizes.as_ref();
    let cancel = ctx.cancel.as_ref();
    let nested = ctx.pool.install(|| {
        listing
            .dirs
            .par_iter()
            .map(|dir| {
                let sub = ParallelAggregator::directory_total(&dir.path, sizes, cancel);
                if cancel.load(Ordering::Relaxed) {
                    return Subtotal::default();
                }
                let item = SizeItem::directory(dir, sub.bytes);
                items.lock().push(item.clone());
                emitter.partial(item);
                sub
            })
            .reduce(Subtotal::default, |a, b| a + b)
    });
    total += nested;

    if ctx.cancelled() {
        return Ok(None);
    }

    if fs::symlink_metadata(&ctx.root).is_err() {
        return Err(ScanError::RootVanished {
            path: ctx.root.clone(),
        });
    }

    sizes.record(&ctx.root, total.bytes);

    let mut items = items.into_inner();
    sort_items(&mut items, SortMode::SizeDescending);

    Ok(Some(ScanSummary {
        root: ctx.root.clone(),
        items,
        total_bytes: total.bytes,
        file_count: total.files,
        duration: start.elapsed(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_str::CompactString;
    use crossbeam_channel::Receiver;

    fn item(name: &str) -> SizeItem {
        SizeItem {
            name: CompactString::new(name),
            bytes: Some(1),
            is_directory: false,
            path: PathBuf::from(name),
            modified: None,
        }
    }

    fn drain(rx: &Receiver<ScanMessage>) -> Vec<ScanMessage> {
        rx.try_iter().collect()
    }

    #[test]
    fn emitter_sends_one_terminal_and_nothing_after() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cancel = AtomicBool::new(false);
        let state = Mutex::new(ScanState::Scanning);
        let emitter = Emitter::new(Generation(3), &tx, &cancel, &state);

        assert!(emitter.partial(item("a")));
        emitter.finish(Err(ScanError::RootVanished {
            path: PathBuf::from("/x"),
        }));
        emitter.finish(Ok(None));
        assert!(!emitter.partial(item("late")));

        let msgs = drain(&rx);
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0].event, ScanEvent::Partial(_)));
        assert!(matches!(msgs[1].event, ScanEvent::Failed(_)));
        assert!(msgs.iter().all(|m| m.generation == Generation(3)));
        assert_eq!(*state.lock(), ScanState::Failed);
    }

    #[test]
    fn terminal_waits_for_a_blocked_partial() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let cancel = AtomicBool::new(false);
        let state = Mutex::new(ScanState::Scanning);
        let emitter = Emitter::new(Generation(2), &tx, &cancel, &state);

        let (sent, events) = std::thread::scope(|s| {
            let producer = s.spawn(|| {
                // The second send blocks until the consumer makes room.
                [item("first"), item("second")]
                    .into_iter()
                    .filter(|i| emitter.partial(i.clone()))
                    .count()
            });
            s.spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(50));
                emitter.finish(Ok(None));
            });

            let mut events = Vec::new();
            while let Ok(msg) = rx.recv_timeout(std::time::Duration::from_secs(5)) {
                let terminal = !matches!(msg.event, ScanEvent::Partial(_));
                events.push(msg.event);
                if terminal {
                    break;
                }
            }
            (producer.join().unwrap(), events)
        });

        // Every accepted partial arrives, and all of them before the terminal.
        assert_eq!(events.len(), sent + 1);
        assert!(events[..sent]
            .iter()
            .all(|e| matches!(e, ScanEvent::Partial(_))));
        assert!(matches!(events[sent], ScanEvent::Cancelled));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn cancellation_suppresses_partials_and_overrides_outcome() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cancel = AtomicBool::new(false);
        let state = Mutex::new(ScanState::Scanning);
        let emitter = Emitter::new(Generation(1), &tx, &cancel, &state);

        assert!(emitter.partial(item("before")));
        cancel.store(true, Ordering::Relaxed);
        assert!(!emitter.partial(item("after")));

        let summary = ScanSummary {
            root: PathBuf::from("/r"),
            items: Vec::new(),
            total_bytes: 0,
            file_count: 0,
            duration: std::time::Duration::ZERO,
        };
        emitter.finish(Ok(Some(summary)));

        let msgs = drain(&rx);
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[1].event, ScanEvent::Cancelled));
        assert_eq!(*state.lock(), ScanState::Cancelled);
    }

    #[test]
    fn pre_cancelled_scan_reports_only_cancelled() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.txt"), vec![0u8; 100]).unwrap();
        fs::write(tmp.path().join("sub/b.txt"), vec![0u8; 300]).unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let ctx = ScanContext {
            generation: Generation(7),
            root: tmp.path().to_path_buf(),
            cancel: Arc::new(AtomicBool::new(true)),
            state: Arc::new(Mutex::new(ScanState::Scanning)),
            sizes: Arc::new(AggregateSizeMap::new()),
            pool: Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()),
            tx,
        };
        let sizes = ctx.sizes.clone();
        run_scan(ctx);

        let msgs = drain(&rx);
        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0].event, ScanEvent::Cancelled));
        assert_eq!(msgs[0].generation, Generation(7));
        assert!(sizes.is_empty());
    }

    #[test]
    fn completed_scan_records_root_and_children() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.txt"), vec![0u8; 100]).unwrap();
        fs::write(tmp.path().join("sub/b.txt"), vec![0u8; 300]).unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let ctx = ScanContext {
            generation: Generation(1),
            root: tmp.path().to_path_buf(),
            cancel: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(ScanState::Scanning)),
            sizes: Arc::new(AggregateSizeMap::new()),
            pool: Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()),
            tx,
        };
        let sizes = ctx.sizes.clone();
        let state = ctx.state.clone();
        run_scan(ctx);

        let msgs = drain(&rx);
        assert_eq!(msgs.len(), 3);
        match &msgs[2].event {
            ScanEvent::Done(summary) => {
                assert_eq!(summary.total_bytes, 400);
                assert_eq!(summary.file_count, 2);
                let names: Vec<&str> = summary.items.iter().map(|i| i.name.as_str()).collect();
                assert_eq!(names, ["sub", "a.txt"]);
            }
            other => panic!("expected Done, got {other:?}"),
        }
        assert_eq!(sizes.get(tmp.path()), Some(400));
        assert_eq!(sizes.get(&tmp.path().join("sub")), Some(300));
        assert_eq!(*state.lock(), ScanState::Completed);
    }
}
