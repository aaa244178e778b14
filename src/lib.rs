//! # supertonic-tts
//!
//! A Rust library that turns interactive text-to-speech requests into
//! playable audio using the Supertonic engine.
//!
//! ## Features
//!
//! - **Request pipeline**: validation, voice style resolution and typed
//!   success/failure outcomes
//! - **Lazy model loading**: the engine is built once, on first use, and
//!   shared by every request after that
//! - **Supertonic TTS**: ONNX-based diffusion TTS engine (feature `supertonic`)
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! supertonic-tts = { version = "2026.2", features = ["supertonic"] }
//! ```
//!
//! ```ignore
//! use supertonic_tts::{engines::supertonic::SupertonicEngine, PipelineConfig, SynthesisRequest, Synthesizer};
//!
//! let synthesizer = Synthesizer::<SupertonicEngine>::new(PipelineConfig::default());
//! let style = synthesizer.default_style().unwrap_or_default();
//!
//! let outcome = synthesizer.generate(&SynthesisRequest::new("Hello, world!", style));
//! println!("{}", outcome.status_message());
//! ```

pub mod assets;
pub mod audio;
pub mod config;
pub mod engines;
pub mod lifecycle;
pub mod pipeline;

use std::path::{Path, PathBuf};

use ndarray::ArrayD;

pub use assets::{default_style, list_style_assets};
pub use audio::{adapt, format_duration_summary, AdaptedAudio, SynthesizedAudio};
pub use config::{ConfigError, PipelineConfig, PipelineConfigBuilder};
pub use lifecycle::{LifecycleError, ModelManager};
pub use pipeline::{
    ErrorKind, SynthesisError, SynthesisOutcome, SynthesisRequest, SynthesisRequestBuilder,
    Synthesizer,
};

/// Boxed error returned across the engine boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Options passed to an engine when it is constructed.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Request hardware acceleration. The pipeline always loads with `false`.
    pub use_gpu: bool,
    /// Number of CPU threads to use for inference.
    /// `None` uses the runtime default.
    pub num_threads: Option<usize>,
}

/// Raw output of a single engine call.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Waveform samples in whatever shape the engine produces (usually `[1, T]`).
    pub wav: ArrayD<f32>,
    /// Duration in seconds of each synthesized segment.
    pub duration: Vec<f32>,
}

/// Common interface for text-to-speech synthesis engines.
///
/// An engine is constructed once per process and then shared read-only by
/// every request, so inference takes `&self`. Engines whose runtime needs
/// exclusive access while running must guard that internally.
pub trait SynthesisEngine: Send + Sync + Sized + 'static {
    /// Decoded voice style conditioning the synthesized timbre and prosody.
    type VoiceStyle;

    /// Construct the engine from the assets in `model_dir`.
    fn load(model_dir: &Path, options: &LoadOptions) -> Result<Self, BoxError>;

    /// Sample rate of the audio produced by [`SynthesisEngine::synthesize`].
    fn sample_rate(&self) -> u32;

    /// Decode one or more voice style files into a single style.
    fn load_voice_style(paths: &[PathBuf]) -> Result<Self::VoiceStyle, BoxError>;

    /// Synthesize speech for `text`.
    ///
    /// `steps` is the number of denoising steps and `speed` the speech rate
    /// multiplier; both are passed to the engine as given.
    fn synthesize(
        &self,
        text: &str,
        style: &Self::VoiceStyle,
        steps: u32,
        speed: f32,
    ) -> Result<EngineOutput, BoxError>;
}
