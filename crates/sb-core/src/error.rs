//! Batch-level errors
//!
//! Row failures never surface here; they are logged and counted in the
//! [`BatchReport`](crate::BatchReport). Only problems that make the rest of
//! the batch unreadable stop a processor.

use sb_instructions::InstructionError;

/// Error that aborts a batch
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Instruction file could not be opened or a row was malformed
    #[error("instruction error: {0}")]
    Instructions(#[from] InstructionError),
}

impl ProcessError {
    /// Whether the batch stopped on a malformed row
    #[inline]
    #[must_use]
    pub fn is_malformed_row(&self) -> bool {
        matches!(self, Self::Instructions(InstructionError::Row { .. }))
    }
}
