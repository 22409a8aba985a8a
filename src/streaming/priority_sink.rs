//! Seam between the scheduler and the transfer engine's priority table.

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::torrent::PieceIndex;

/// Errors a priority sink can report when applying a command.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The transfer engine rejected the priority command.
    ///
    /// The scheduler never retries; retry and backoff policy belongs to
    /// the sink or its caller.
    #[error("priority command rejected: {reason}")]
    CommandRejected { reason: String },
}

/// Applies "download only these pieces" commands to the transfer engine.
///
/// Implementations reconcile the given index set against the engine's real
/// priority table: exactly the listed pieces receive elevated priority,
/// everything else is neutral or ignored. `possible_footer` is a hint only,
/// e.g. to avoid demoting footer pieces that are not in the explicit list.
///
/// Called while the scheduler's lock is held, so implementations must be
/// fast and non-blocking: mutate an in-memory table, never touch the
/// network.
pub trait PrioritySink: Send + Sync {
    /// Sets the engine's elevated-priority set to exactly `pieces`.
    ///
    /// `pieces` is ordered by the scheduler's urgency (footer insertions
    /// may appear at the front); the sink decides how ordering maps onto
    /// numeric priority levels.
    ///
    /// # Errors
    ///
    /// - `SinkError::CommandRejected` - Engine could not apply the command
    fn download_only(
        &self,
        pieces: &[PieceIndex],
        possible_footer: RangeInclusive<u32>,
    ) -> Result<(), SinkError>;
}
