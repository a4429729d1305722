/// Scan messages: sent from the scan thread to the consumer via a
/// crossbeam channel.
///
/// Every message carries the [`Generation`] of the scan that produced it.
/// Consumers compare it against the generation they most recently started
/// and drop anything else, so a new scan can begin without draining the
/// previous one's in-flight messages first.
use super::Generation;
use crate::error::ScanError;
use crate::model::SizeItem;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::trace;

/// Final result of a scan that ran to completion.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub root: PathBuf,
    /// One item per immediate child of the root, largest first.
    pub items: Vec<SizeItem>,
    pub total_bytes: u64,
    /// Regular files visited anywhere below the root.
    pub file_count: u64,
    pub duration: Duration,
}

/// What happened in a scan.
///
/// Zero or more `Partial` events are followed by exactly one terminal event
/// (`Done`, `Cancelled` or `Failed`). Nothing follows a terminal event.
#[derive(Debug)]
pub enum ScanEvent {
    /// One immediate child finished: a file as soon as it is stat'ed, a
    /// subdirectory as soon as its recursive total is known.
    Partial(SizeItem),
    Done(ScanSummary),
    Cancelled,
    Failed(ScanError),
}

impl ScanEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanEvent::Partial(_))
    }
}

/// A [`ScanEvent`] tagged with the generation that emitted it.
#[derive(Debug)]
pub struct ScanMessage {
    pub generation: Generation,
    pub event: ScanEvent,
}

impl ScanMessage {
    pub fn is_terminal(&self) -> bool {
        self.event.is_terminal()
    }

    /// Hand the event to `observer` if it belongs to `current`.
    ///
    /// Returns `false` (and drops the message) for any other generation.
    pub fn deliver<O>(self, current: Generation, observer: &mut O) -> bool
    where
        O: ScanObserver + ?Sized,
    {
        if self.generation != current {
            trace!(
                "dropping message from superseded scan {} (current {})",
                self.generation,
                current
            );
            return false;
        }
        match self.event {
            ScanEvent::Partial(item) => observer.on_partial(item),
            ScanEvent::Done(summary) => observer.on_done(summary),
            ScanEvent::Cancelled => observer.on_cancelled(),
            ScanEvent::Failed(err) => observer.on_error(err),
        }
        true
    }
}

/// Callback-style view of the message stream.
pub trait ScanObserver {
    fn on_partial(&mut self, item: SizeItem);
    fn on_done(&mut self, summary: ScanSummary);
    fn on_cancelled(&mut self);
    fn on_error(&mut self, error: ScanError);
}
