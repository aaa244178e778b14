//! Supertonic text-to-speech engine implementation.
//!
//! Supertonic is a diffusion TTS model split into four ONNX graphs: a
//! duration predictor, a text encoder, a vector estimator run once per
//! denoising step, and a vocoder. Text is fed to the model as unicode
//! indices, so no phonemizer is needed.
//!
//! # Model Directory Layout
//!
//! ```text
//! assets/onnx/
//! ├── tts.json                 # sample rate and latent geometry
//! ├── unicode_indexer.json     # codepoint -> token id table
//! ├── duration_predictor.onnx
//! ├── text_encoder.onnx
//! ├── vector_estimator.onnx
//! └── vocoder.onnx
//! ```
//!
//! Voice styles live in a separate directory as JSON files (`F1.json`,
//! `M1.json`, ...), each holding a `style_ttl` and a `style_dp` tensor.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use supertonic_tts::{engines::supertonic::SupertonicEngine, LoadOptions, SynthesisEngine};
//!
//! let engine = SupertonicEngine::load(Path::new("assets/onnx"), &LoadOptions::default())?;
//! let style = SupertonicEngine::load_voice_style(&[PathBuf::from("assets/voice_styles/F1.json")])?;
//!
//! let output = engine.synthesize("Hello, world!", &style, 5, 1.05)?;
//! println!("{} samples at {}Hz", output.wav.len(), engine.sample_rate());
//! # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
//! ```

pub mod engine;
pub mod model;
pub mod style;
pub mod text;

pub use engine::SupertonicEngine;
pub use model::{ModelConfig, SupertonicError};
pub use style::VoiceStyle;
