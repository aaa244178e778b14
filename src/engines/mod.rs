//! Speech synthesis engines.
//!
//! This module contains implementations of [`crate::SynthesisEngine`].
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `supertonic` - Supertonic TTS (ONNX format, CPU execution)

#[cfg(feature = "supertonic")]
pub mod supertonic;
