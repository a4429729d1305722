/// Scanner module: runs interactive folder scans in the background.
///
/// A [`ScanScheduler`] owns a rayon worker pool and one bounded channel of
/// [`ScanMessage`]s. Each [`ScanScheduler::start_scan`] call:
/// - cancels the scan still running, without waiting for it to unwind;
/// - allocates the next [`Generation`];
/// - spawns a scan thread that reports each immediate child of the root as
///   a partial result and finishes with exactly one terminal event.
///
/// The consumer never blocks on a scan. It drains [`ScanScheduler::receiver`]
/// on its own schedule and ignores messages whose generation is not the one
/// it most recently started ([`ScanView`] does exactly that).
///
/// State machine per scan: `Idle → Scanning → {Completed | Cancelled | Failed} → Idle`.
pub mod progress;
pub mod view;
mod worker;

use crate::error::ScanError;
use crate::model::AggregateSizeMap;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use rayon::ThreadPool;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

pub use progress::{ScanEvent, ScanMessage, ScanObserver, ScanSummary};
pub use view::ScanView;

/// Maximum number of scan messages that may queue up in the channel.
///
/// A scan emits one partial per immediate child of its root plus one
/// terminal event. If the consumer falls behind, the scan thread stalls
/// briefly rather than consuming unbounded heap.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Identifier of one scan request. Strictly increasing per scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// The raw counter value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScanState {
    Idle,
    Scanning,
    Completed,
    Cancelled,
    Failed,
}

impl ScanState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Worker threads for directory fan-out.
    pub threads: usize,
    /// Capacity of the message channel.
    pub channel_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            channel_capacity: PROGRESS_CHANNEL_CAPACITY,
        }
    }
}

/// Handle to one started scan. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    generation: Generation,
    root: PathBuf,
    /// Flag to request cancellation.
    cancel_flag: Arc<AtomicBool>,
    state: Arc<Mutex<ScanState>>,
    /// Directory totals recorded by this scan so far.
    sizes: Arc<AggregateSizeMap>,
}

impl ScanHandle {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Request the scan to stop as soon as possible. Does not block.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> ScanState {
        *self.state.lock()
    }

    /// Directory totals of this scan. Complete once the state is
    /// [`ScanState::Completed`]; can be handed to the export pipeline.
    pub fn sizes(&self) -> Arc<AggregateSizeMap> {
        self.sizes.clone()
    }
}

/// Starts scans and owns the channel their messages arrive on.
pub struct ScanScheduler {
    pool: Arc<ThreadPool>,
    tx: Sender<ScanMessage>,
    rx: Receiver<ScanMessage>,
    last_generation: Generation,
    active: Option<ScanHandle>,
    /// Join handle for the most recent scan thread.
    _thread: Option<thread::JoinHandle<()>>,
}

impl ScanScheduler {
    /// Scheduler with one worker per CPU.
    pub fn new() -> Result<Self, ScanError> {
        Self::with_config(ScanConfig::default())
    }

    pub fn with_config(config: ScanConfig) -> Result<Self, ScanError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("foldersize-worker-{i}"))
            .build()?;
        let (tx, rx) = crossbeam_channel::bounded(config.channel_capacity.max(1));
        debug!(
            "scan scheduler ready: {} workers, channel capacity {}",
            pool.current_num_threads(),
            config.channel_capacity
        );

        Ok(Self {
            pool: Arc::new(pool),
            tx,
            rx,
            last_generation: Generation(0),
            active: None,
            _thread: None,
        })
    }

    /// Start scanning `root`, superseding any scan still running.
    pub fn start_scan(&mut self, root: impl Into<PathBuf>) -> Result<ScanHandle, ScanError> {
        let root = root.into();

        if let Some(previous) = &self.active {
            if previous.state() == ScanState::Scanning {
                info!(
                    "scan {} superseded by a new request; cancelling",
                    previous.generation
                );
                previous.cancel();
            }
        }

        let generation = self.last_generation.next();
        self.last_generation = generation;

        let handle = ScanHandle {
            generation,
            root: root.clone(),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(ScanState::Scanning)),
            sizes: Arc::new(AggregateSizeMap::new()),
        };

        let ctx = worker::ScanContext {
            generation,
            root,
            cancel: handle.cancel_flag.clone(),
            state: handle.state.clone(),
            sizes: handle.sizes.clone(),
            pool: self.pool.clone(),
            tx: self.tx.clone(),
        };

        let thread = thread::Builder::new()
            .name(format!("foldersize-scan-{}", generation.get()))
            .spawn(move || worker::run_scan(ctx))
            .map_err(ScanError::Spawn)?;

        self._thread = Some(thread);
        self.active = Some(handle.clone());
        Ok(handle)
    }

    /// Cancel the active scan, if any.
    pub fn cancel(&self) {
        if let Some(active) = &self.active {
            active.cancel();
        }
    }

    /// Generation of the most recently started scan.
    pub fn current_generation(&self) -> Option<Generation> {
        self.active.as_ref().map(|h| h.generation)
    }

    pub fn active(&self) -> Option<&ScanHandle> {
        self.active.as_ref()
    }

    /// State of the most recent scan, `Idle` if none is tracked.
    pub fn state(&self) -> ScanState {
        self.active
            .as_ref()
            .map(ScanHandle::state)
            .unwrap_or(ScanState::Idle)
    }

    /// Return to `Idle` after the active scan reached a terminal state.
    ///
    /// Returns `false` (and changes nothing) while a scan is still running.
    pub fn reset(&mut self) -> bool {
        match &self.active {
            Some(active) if !active.state().is_terminal() => false,
            _ => {
                self.active = None;
                true
            }
        }
    }

    /// Receiver carrying messages of every generation.
    pub fn receiver(&self) -> &Receiver<ScanMessage> {
        &self.rx
    }
}

impl Drop for ScanScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
