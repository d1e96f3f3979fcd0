//! Request validation, environment branching and the local/cloud render paths.

/// The orchestrator.
pub mod dispatcher;
/// Request and outcome types.
pub mod request;
pub(crate) mod temp;

pub use dispatcher::{CloudBackend, RenderDispatcher};
pub use request::{RenderOutcome, RenderRequest};
