//! Per-batch outcome counters

use std::fmt;

/// What happened to one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Mutation applied
    Succeeded,
    /// Target user absent
    NotFound,
    /// Lookup or mutation failed
    Failed,
}

/// Counters for one processor run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Rows read from the file
    pub attempted: usize,
    /// Rows whose mutation was applied
    pub succeeded: usize,
    /// Rows whose target does not exist
    pub not_found: usize,
    /// Rows skipped after an error
    pub failed: usize,
}

impl BatchReport {
    /// Empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempted row
    pub fn record(&mut self, outcome: RowOutcome) {
        self.attempted += 1;
        match outcome {
            RowOutcome::Succeeded => self.succeeded += 1,
            RowOutcome::NotFound => self.not_found += 1,
            RowOutcome::Failed => self.failed += 1,
        }
    }

    /// Every attempted row succeeded
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.succeeded == self.attempted
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows: {} succeeded, {} not found, {} failed",
            self.attempted, self.succeeded, self.not_found, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_each_outcome() {
        let mut report = BatchReport::new();
        report.record(RowOutcome::Succeeded);
        report.record(RowOutcome::NotFound);
        report.record(RowOutcome::Failed);
        report.record(RowOutcome::Succeeded);

        assert_eq!(
            report,
            BatchReport {
                attempted: 4,
                succeeded: 2,
                not_found: 1,
                failed: 1,
            }
        );
        assert!(!report.is_clean());
        assert_eq!(
            report.to_string(),
            "4 rows: 2 succeeded, 1 not found, 1 failed"
        );
    }

    #[test]
    fn empty_report_is_clean() {
        assert!(BatchReport::new().is_clean());
    }
}
