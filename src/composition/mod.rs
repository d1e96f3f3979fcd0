//! Composition payloads: the opaque document handed to the renderer, plus helpers that build
//! the standard shot document from generator output.

/// Color normalization for the environment background.
pub mod color;
/// Shot parameters and the standard composition document.
pub mod shot;
/// The opaque composition payload.
pub mod spec;
