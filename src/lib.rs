//! Spindrift - sequential piece scheduling for streaming swarm playback
//!
//! Converts a player's playback position into a small, stable set of
//! "currently wanted" pieces and keeps the transfer engine's priority
//! table pointed at it while pieces complete out of order and the player
//! seeks, including into the footer metadata zone near the end of the
//! file. Network I/O, peer selection and piece verification stay in the
//! transfer engine; this crate is the in-process scheduling library
//! between it and the player.

pub mod config;
pub mod streaming;
pub mod torrent;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::SchedulerConfig;
pub use streaming::{PrioritySink, SchedulerError, SinkError, WindowScheduler};
pub use torrent::{CatalogError, Piece, PieceCatalog, PieceIndex, PieceState};

/// Errors that can bubble up from any spindrift component.
#[derive(Debug, thiserror::Error)]
pub enum SpindriftError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Priority sink error: {0}")]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, SpindriftError>;
