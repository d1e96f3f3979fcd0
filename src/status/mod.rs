//! Out-of-band completion tracking for cloud jobs.

/// Marker-object poller.
pub mod tracker;

pub use tracker::{JobStatusTracker, RenderJob};
