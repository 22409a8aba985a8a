//! Moving-window piece scheduler for sequential streaming playback.
//!
//! Translates playback events (seek, resume, piece completion) into a
//! bounded active set of piece indices and pushes that set to the priority
//! sink. Handing the transfer engine the full remaining piece list would
//! make it optimize for aggregate throughput; a small window keeps it
//! optimizing for playback continuity instead.
//!
//! Header-zone prioritization (the metadata phase at the start of the file)
//! is a separate mechanism that runs before or alongside this scheduler;
//! only the post-metadata sequential phase lives here.

use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::streaming::priority_sink::{PrioritySink, SinkError};
use crate::torrent::{Piece, PieceCatalog, PieceIndex, PieceState};

/// Errors that can occur during scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Index outside the catalog was passed to an operation. This is a
    /// caller contract violation, never clamped or recovered.
    #[error("piece {index} outside catalog range 0..={last}")]
    PieceOutOfRange { index: PieceIndex, last: PieceIndex },

    /// The priority sink failed to apply a command.
    #[error("priority sink failed: {0}")]
    Sink(#[from] SinkError),
}

/// Mutable scheduler state, present only when the catalog is non-empty.
#[derive(Debug)]
struct WindowState {
    /// Inclusive lower bound of the logical window, in piece indices.
    window_start: u32,
    /// Inclusive upper bound of the logical window.
    window_end: u32,
    /// Pieces currently requested from the sink. Ordered and deduplicated;
    /// footer seeks prepend, so the order is not necessarily index order.
    active: VecDeque<PieceIndex>,
    /// Pieces covering the trailing footer bytes, fixed at construction.
    footer_pieces: Vec<PieceIndex>,
    /// Index range treated as "near the footer" on seek, fixed at
    /// construction.
    possible_footer: RangeInclusive<u32>,
}

/// Sequential window scheduler over a piece catalog.
///
/// All operations run inside one mutex region per scheduler: the priority
/// sink observes commands in the same order events were serialized by the
/// lock, and nothing blocks or suspends while it is held. The scheduler is
/// driven from at least two call sources (player thread and transfer-engine
/// event thread) and is `Send + Sync`.
pub struct WindowScheduler {
    catalog: Arc<PieceCatalog>,
    sink: Arc<dyn PrioritySink>,
    config: SchedulerConfig,
    state: Mutex<Option<WindowState>>,
}

impl WindowScheduler {
    /// Creates a scheduler over the given catalog.
    ///
    /// Seeds the window at the catalog's initial piece, spanning at most
    /// `window_size` pieces, and precomputes the footer zones from the
    /// catalog's byte layout. No sink command is issued until the first
    /// event arrives. An empty catalog produces an inert scheduler whose
    /// operations are all no-ops.
    pub fn new(
        catalog: Arc<PieceCatalog>,
        sink: Arc<dyn PrioritySink>,
        config: SchedulerConfig,
    ) -> Self {
        let state = match (catalog.initial_index(), catalog.last_index()) {
            (Some(initial), Some(last)) => {
                let window_start = initial.as_u32();
                let span = config.window_size.saturating_sub(1) as u32;
                let window_end = window_start.saturating_add(span).min(last.as_u32());
                let active = (window_start..=window_end).map(PieceIndex::new).collect();

                let file_end = catalog.end_offset();
                let footer_start = file_end.saturating_sub(config.footer_size);
                let footer_pieces = catalog
                    .pieces()
                    .iter()
                    .filter(|piece| piece.bytes_end() > footer_start)
                    .map(Piece::index)
                    .collect();

                // The possible-footer zone must cover at least the footer
                // zone itself.
                let possible_size = config.possible_footer_size.max(config.footer_size);
                let possible_start = file_end.saturating_sub(possible_size);
                let possible_first = catalog
                    .pieces()
                    .iter()
                    .find(|piece| piece.bytes_end() > possible_start)
                    .map_or(last.as_u32(), |piece| piece.index().as_u32());

                Some(WindowState {
                    window_start,
                    window_end,
                    active,
                    footer_pieces,
                    possible_footer: possible_first..=last.as_u32(),
                })
            }
            _ => None,
        };

        Self {
            catalog,
            sink,
            config,
            state: Mutex::new(state),
        }
    }

    /// Whether `index` is currently in the active set. Pure query.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::PieceOutOfRange` - Index outside the catalog
    pub fn is_downloading(&self, index: PieceIndex) -> Result<bool, SchedulerError> {
        let guard = self.state.lock();
        let Some(state) = guard.as_ref() else {
            return Ok(false);
        };
        self.check_index(index)?;
        Ok(state.active.contains(&index))
    }

    /// Handles playback resuming: seeks to the catalog's initial piece.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::Sink` - Priority sink rejected the command
    pub fn on_resumed(&self) -> Result<(), SchedulerError> {
        let mut guard = self.state.lock();
        let Some(state) = guard.as_mut() else {
            return Ok(());
        };
        let Some(initial) = self.catalog.initial_index() else {
            return Ok(());
        };
        debug!("playback resumed, seeking to initial piece {initial}");
        self.seek_to(state, initial)
    }

    /// Handles a player seek to `target`.
    ///
    /// Seeks landing inside the possible-footer zone are treated as footer
    /// accesses: the target joins the front of the active set and the
    /// window earned so far is kept intact. Any other seek discards the
    /// active set and rebuilds the window at the target.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::PieceOutOfRange` - Target outside the catalog
    /// - `SchedulerError::Sink` - Priority sink rejected the command
    pub fn on_seek(&self, target: PieceIndex) -> Result<(), SchedulerError> {
        let mut guard = self.state.lock();
        let Some(state) = guard.as_mut() else {
            return Ok(());
        };
        self.check_index(target)?;
        self.seek_to(state, target)
    }

    /// Handles a piece-completed event from the transfer engine.
    ///
    /// Completions outside the active set are irrelevant to the current
    /// window and ignored. A completion inside it frees a slot: the piece
    /// is dropped and the window extends to the next unfinished piece past
    /// `window_end`, keeping the active set's cardinality roughly constant.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::PieceOutOfRange` - Index outside the catalog
    /// - `SchedulerError::Sink` - Priority sink rejected the command
    pub fn on_piece_downloaded(&self, index: PieceIndex) -> Result<(), SchedulerError> {
        let mut guard = self.state.lock();
        let Some(state) = guard.as_mut() else {
            return Ok(());
        };
        self.check_index(index)?;

        let Some(position) = state.active.iter().position(|&piece| piece == index) else {
            return Ok(());
        };
        state.active.remove(position);

        if let Some(next) = self.next_pending(state.window_end.saturating_add(1))
            && next.as_u32() != state.window_end
        {
            // The active set can already hold pieces past the window end
            // (footer additions); never append a duplicate.
            if !state.active.contains(&next) {
                state.active.push_back(next);
            }
            state.window_end = next.as_u32();
            debug!(
                "piece {index} completed, window extended to [{}, {}]",
                state.window_start, state.window_end
            );
        }

        self.issue(state)
    }

    fn check_index(&self, index: PieceIndex) -> Result<(), SchedulerError> {
        match self.catalog.last_index() {
            Some(last) if index.as_u32() <= last.as_u32() => Ok(()),
            Some(last) => Err(SchedulerError::PieceOutOfRange { index, last }),
            // Empty catalogs never reach validation: every operation
            // no-ops on the absent window state first.
            None => Ok(()),
        }
    }

    fn seek_to(&self, state: &mut WindowState, target: PieceIndex) -> Result<(), SchedulerError> {
        if state.possible_footer.contains(&target.as_u32()) {
            if state.active.contains(&target) {
                return Ok(());
            }
            state.active.push_front(target);
            debug!("seek to {target} lands near the footer, keeping current window");
            return self.issue(state);
        }

        state.active.clear();
        self.fill_window(state, target.as_u32());
        debug!(
            "seek to {target}: window rebuilt to [{}, {}] with {} active pieces",
            state.window_start,
            state.window_end,
            state.active.len()
        );
        self.issue(state)
    }

    /// Rebuilds the window from `start`, skipping finished pieces, then
    /// appends every unfinished footer piece so the footer stays reachable
    /// regardless of the playback position.
    fn fill_window(&self, state: &mut WindowState, start: u32) {
        let Some(first) = self.next_pending(start) else {
            // Everything from start to the end is already complete.
            state.window_start = start;
            state.window_end = start;
            return;
        };

        state.window_start = first.as_u32();
        state.window_end = first.as_u32();
        state.active.push_back(first);

        for _ in 1..self.config.window_size {
            match self.next_pending(state.window_end.saturating_add(1)) {
                Some(next) => {
                    state.active.push_back(next);
                    state.window_end = next.as_u32();
                }
                None => break,
            }
        }

        for &footer in &state.footer_pieces {
            let pending = self
                .catalog
                .piece(footer)
                .is_some_and(|piece| piece.state() != PieceState::Finished);
            if pending && !state.active.contains(&footer) {
                state.active.push_back(footer);
            }
        }
    }

    /// First piece at or after `from` whose state is not `Finished`.
    fn next_pending(&self, from: u32) -> Option<PieceIndex> {
        let last = self.catalog.last_index()?.as_u32();
        (from..=last).map(PieceIndex::new).find(|&index| {
            self.catalog
                .piece(index)
                .is_some_and(|piece| piece.state() != PieceState::Finished)
        })
    }

    /// Pushes the current active set to the sink. Runs inside the critical
    /// section, so the sink observes commands in event order.
    fn issue(&self, state: &mut WindowState) -> Result<(), SchedulerError> {
        let pieces = state.active.make_contiguous();
        debug!("issuing download-only command for {} pieces", pieces.len());
        self.sink
            .download_only(pieces, state.possible_footer.clone())?;
        Ok(())
    }
}
