/// Turns acknowledged offsets into percentages for one upload.
///
/// Values never decrease: an offset below the running maximum reports the
/// maximum again.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    total: u64,
    last_offset: u64,
    reports: u32,
}

impl ProgressReporter {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            last_offset: 0,
            reports: 0,
        }
    }

    /// Starts from an offset the server already holds (resume).
    pub fn starting_at(total: u64, offset: u64) -> Self {
        Self {
            total,
            last_offset: offset.min(total),
            reports: 0,
        }
    }

    /// `offset / total * 100`; 0 for an empty file.
    pub fn percentage(offset: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        offset.min(total) as f64 / total as f64 * 100.0
    }

    /// Records an acknowledged offset and returns the percentage to publish.
    pub fn report(&mut self, offset: u64) -> f64 {
        self.last_offset = self.last_offset.max(offset.min(self.total));
        self.reports += 1;
        Self::percentage(self.last_offset, self.total)
    }

    /// Highest offset reported so far.
    pub fn offset(&self) -> u64 {
        self.last_offset
    }

    /// Number of `report` calls.
    pub fn reports(&self) -> u32 {
        self.reports
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.last_offset == self.total
    }
}
