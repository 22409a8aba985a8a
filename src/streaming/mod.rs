//! Streaming-side scheduling: the moving piece window and its seam to the
//! transfer engine's priority table.
//!
//! The scheduler decides *which* pieces matter for playback right now; the
//! priority sink owns *how* that set maps onto transfer-engine priorities.

pub mod priority_sink;
pub mod window_scheduler;

pub use priority_sink::{PrioritySink, SinkError};
pub use window_scheduler::{SchedulerError, WindowScheduler};
