//! Local renderer execution.

/// Child-process executor and its output stream.
pub mod executor;

#[cfg(all(test, unix))]
#[path = "../../tests/unit/local/executor.rs"]
mod tests;
