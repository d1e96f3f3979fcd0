//! Renderer invocation contracts.

/// Contract construction from configuration and paths.
pub mod builder;
/// The resolved invocation and its process/shell renderings.
pub mod contract;

#[cfg(test)]
#[path = "../../tests/unit/command/mod.rs"]
mod tests;
