/// Consumer-side state for one scan stream.
///
/// A frontend owns a [`ScanView`], calls [`ScanView::begin`] with the
/// generation returned by `start_scan`, then feeds it every message drained
/// from the scheduler's receiver. Messages of any other generation are
/// dropped, so the view only ever reflects the most recent request.
use super::progress::{ScanMessage, ScanObserver, ScanSummary};
use super::{Generation, ScanState};
use crate::error::ScanError;
use crate::model::SizeItem;
use crate::sort::{sort_items, SortMode};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ScanView {
    generation: Option<Generation>,
    phase: Option<ScanState>,
    items: Vec<SizeItem>,
    sort: SortMode,
    total_bytes: u64,
    file_count: u64,
    duration: Option<Duration>,
    error: Option<ScanError>,
}

impl ScanView {
    pub fn new(sort: SortMode) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    /// Track `generation` from now on, discarding everything shown so far.
    pub fn begin(&mut self, generation: Generation) {
        self.reset();
        self.generation = Some(generation);
        self.phase = Some(ScanState::Scanning);
    }

    /// Apply one message. Returns `false` if it was stale and ignored.
    pub fn apply(&mut self, msg: ScanMessage) -> bool {
        match self.generation {
            Some(current) => msg.deliver(current, self),
            None => false,
        }
    }

    /// Re-sort the current items under a new mode.
    pub fn set_sort(&mut self, sort: SortMode) {
        self.sort = sort;
        sort_items(&mut self.items, sort);
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    pub fn state(&self) -> ScanState {
        self.phase.unwrap_or(ScanState::Idle)
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn items(&self) -> &[SizeItem] {
        &self.items
    }

    /// Sum of the known sizes shown so far; the grand total once done.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Regular files below the root. Only known once the scan completed.
    pub fn file_count(&self) -> u64 {
        self.file_count
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn error(&self) -> Option<&ScanError> {
        self.error.as_ref()
    }

    /// Forget the current scan and return to `Idle`.
    pub fn reset(&mut self) {
        let sort = self.sort;
        *self = Self::new(sort);
    }

    fn recompute_total(&mut self) {
        self.total_bytes = self.items.iter().map(SizeItem::size_or_zero).sum();
    }
}

impl ScanObserver for ScanView {
    fn on_partial(&mut self, item: SizeItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.same_child(&item)) {
            debug!("replacing duplicate result for {}", item.name);
            *existing = item;
        } else {
            self.items.push(item);
        }
        sort_items(&mut self.items, self.sort);
        self.recompute_total();
    }

    fn on_done(&mut self, summary: ScanSummary) {
        self.items = summary.items;
        sort_items(&mut self.items, self.sort);
        self.total_bytes = summary.total_bytes;
        self.file_count = summary.file_count;
        self.duration = Some(summary.duration);
        self.phase = Some(ScanState::Completed);
    }

    fn on_cancelled(&mut self) {
        self.phase = Some(ScanState::Cancelled);
    }

    fn on_error(&mut self, error: ScanError) {
        self.items.clear();
        self.total_bytes = 0;
        self.error = Some(error);
        self.phase = Some(ScanState::Failed);
    }
}
