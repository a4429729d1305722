/// Row-count based progress for the write pass.
///
/// Percentages are `floor(written * 100 / total)`, clamped to `0..=100`,
/// and never go backwards. If fewer rows than counted get written (entries
/// removed between the passes), [`ProgressTracker::finish`] still reports
/// the closing 100.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    written: u64,
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            written: 0,
            last: None,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Count one written row and return the percentage to report.
    pub fn advance(&mut self) -> u8 {
        self.written += 1;
        let pct = if self.total == 0 {
            100
        } else {
            (self.written.saturating_mul(100) / self.total).min(100) as u8
        };
        let pct = self.last.map_or(pct, |last| pct.max(last));
        self.last = Some(pct);
        pct
    }

    /// The closing 100, unless it was already reported.
    pub fn finish(&mut self) -> Option<u8> {
        if self.last == Some(100) {
            return None;
        }
        self.last = Some(100);
        Some(100)
    }
}
