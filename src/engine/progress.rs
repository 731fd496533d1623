//! Progress counters for the discovery phase and the conversion run.

/// A `completed / total` pair. Percent is clamped to `[0, 1]`; a zero total reads as 0%.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counter {
    pub completed: usize,
    pub total: usize,
}

impl Counter {
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    pub fn incr(&mut self) {
        self.completed += 1;
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
    }

    pub fn is_done(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

/// Discovery-phase counters. Each counts files that reached (or failed) a stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub files_discovered: Counter,
    pub tag_headers: Counter,
    pub tags_validated: Counter,
    pub float_headers: Counter,
}

impl ScanProgress {
    /// Reset all four counters to a new file total.
    pub fn start(&mut self, total: usize) {
        *self = Self {
            files_discovered: Counter::new(total),
            tag_headers: Counter::new(total),
            tags_validated: Counter::new(total),
            float_headers: Counter::new(total),
        };
    }

    /// A file dropped out of discovery at some stage: count it as settled in every later one.
    pub fn settle_failed(&mut self, reached_tag_headers: bool, reached_validation: bool) {
        if !reached_tag_headers {
            self.tag_headers.incr();
        }
        if !reached_validation {
            self.tags_validated.incr();
        }
        self.float_headers.incr();
    }

    /// Every discovered file has its float header read (or failed before it).
    pub fn is_complete(&self) -> bool {
        self.float_headers.is_done()
    }
}

/// Counters for one conversion run. Never decrease within the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunProgress {
    pub total_to_process: usize,
    pub loads_completed: usize,
    pub inserts_completed: usize,
    pub failed: usize,
}

impl RunProgress {
    pub fn new(total_to_process: usize) -> Self {
        Self {
            total_to_process,
            ..Self::default()
        }
    }

    pub fn loads(&self) -> Counter {
        Counter {
            completed: self.loads_completed,
            total: self.total_to_process,
        }
    }

    pub fn inserts(&self) -> Counter {
        Counter {
            completed: self.inserts_completed,
            total: self.total_to_process,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_zero_total() {
        let c = Counter::new(0);
        assert_eq!(c.percent(), 0.0);
        assert!(!c.is_done());
    }

    #[test]
    fn test_percent_clamped() {
        let c = Counter {
            completed: 5,
            total: 4,
        };
        assert_eq!(c.percent(), 1.0);
        let half = Counter {
            completed: 1,
            total: 2,
        };
        assert_eq!(half.percent(), 0.5);
    }

    #[test]
    fn test_scan_settle_failed_counts_remaining_stages() {
        let mut scan = ScanProgress::default();
        scan.start(2);
        scan.files_discovered.completed = 2;
        scan.settle_failed(false, false);
        assert_eq!(scan.tag_headers.completed, 1);
        assert_eq!(scan.tags_validated.completed, 1);
        assert_eq!(scan.float_headers.completed, 1);
        assert!(!scan.is_complete());
    }
}
