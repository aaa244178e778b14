//! Synthesis request handling.
//!
//! [`Synthesizer::synthesize`] checks a request, resolves its voice style,
//! runs the engine and adapts the result, reporting each failure site as its
//! own [`SynthesisError`] variant. [`Synthesizer::generate`] is the
//! presentation boundary: it collapses that result into a
//! [`SynthesisOutcome`] carrying either audio or a user-facing message.

use std::error::Error as _;
use std::ops::RangeInclusive;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use derive_builder::Builder;

use crate::audio::{adapt, SynthesizedAudio};
use crate::config::PipelineConfig;
use crate::lifecycle::{LifecycleError, ModelManager};
use crate::{assets, BoxError, SynthesisEngine};

/// Default speech speed multiplier.
pub const DEFAULT_SPEED: f32 = 1.05;

/// Default number of denoising steps.
pub const DEFAULT_STEPS: u32 = 5;

/// Accepted speech speed multipliers.
pub const SPEED_RANGE: RangeInclusive<f32> = 0.5..=2.0;

/// Accepted denoising step counts.
pub const STEPS_RANGE: RangeInclusive<u32> = 1..=20;

/// Text prefilled in a fresh session.
pub const DEFAULT_TEXT: &str = "This morning, I took a walk in the park, and the sound of the \
birds and the breeze was so pleasant that I stopped for a long time just to listen.";

/// A single "generate" action.
///
/// The builder rejects `speed` and `steps` outside [`SPEED_RANGE`] and
/// [`STEPS_RANGE`]; [`Synthesizer::synthesize`] itself forwards whatever
/// values the request carries.
///
/// ```rust
/// use supertonic_tts::SynthesisRequestBuilder;
///
/// let request = SynthesisRequestBuilder::default()
///     .text("Hello there.")
///     .style("F1.json")
///     .build()
///     .unwrap();
/// assert_eq!(request.steps, 5);
///
/// assert!(SynthesisRequestBuilder::default().text("Hi").speed(3.0).build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SynthesisRequest {
    /// Text to speak.
    #[builder(setter(into))]
    pub text: String,
    /// File name of the voice style, relative to the style directory.
    /// Empty means no style was selected.
    #[builder(setter(into), default)]
    pub style: String,
    /// Speech speed multiplier.
    #[builder(default = "DEFAULT_SPEED")]
    pub speed: f32,
    /// Number of denoising steps.
    #[builder(default = "DEFAULT_STEPS")]
    pub steps: u32,
}

impl SynthesisRequestBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(speed) = self.speed {
            if !SPEED_RANGE.contains(&speed) {
                return Err(format!(
                    "speed {speed} outside {}..={}",
                    SPEED_RANGE.start(),
                    SPEED_RANGE.end()
                ));
            }
        }
        if let Some(steps) = self.steps {
            if !STEPS_RANGE.contains(&steps) {
                return Err(format!(
                    "steps {steps} outside {}..={}",
                    STEPS_RANGE.start(),
                    STEPS_RANGE.end()
                ));
            }
        }
        Ok(())
    }
}

impl SynthesisRequest {
    /// A request with the default speed and step count.
    pub fn new(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: style.into(),
            speed: DEFAULT_SPEED,
            steps: DEFAULT_STEPS,
        }
    }
}

/// Broad failure classes, for callers that react to the cause rather than
/// the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Engine assets are not deployed. Nothing can succeed until they are.
    MissingAssets,
    /// The request itself is incomplete; the user can correct it.
    Validation,
    /// The selected style file is gone; the user can pick another.
    AssetNotFound,
    /// Engine construction, style decoding or inference failed.
    EngineFailure,
}

#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("Please enter some text.")]
    EmptyText,
    #[error("Please select a voice style.")]
    NoStyleSelected,
    #[error("Voice style file not found: {}", path.display())]
    StyleNotFound { path: PathBuf },
    #[error(transparent)]
    Engine(#[from] LifecycleError),
    #[error("Failed to load voice style {}: {source}", path.display())]
    StyleDecode {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("{0}")]
    Inference(#[source] BoxError),
}

impl SynthesisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyText | Self::NoStyleSelected => ErrorKind::Validation,
            Self::StyleNotFound { .. } => ErrorKind::AssetNotFound,
            Self::Engine(LifecycleError::MissingAssets { .. }) => ErrorKind::MissingAssets,
            Self::Engine(_) | Self::StyleDecode { .. } | Self::Inference(_) => {
                ErrorKind::EngineFailure
            }
        }
    }

    /// The message shown to the user.
    ///
    /// Input problems are reported verbatim; anything that went wrong inside
    /// the engine is prefixed with `Error:`.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::AssetNotFound => self.to_string(),
            ErrorKind::MissingAssets | ErrorKind::EngineFailure => format!("Error: {self}"),
        }
    }
}

/// Result of a "generate" action as presented to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    Success {
        sample_rate: u32,
        samples: Vec<f32>,
        duration_summary: String,
    },
    Failure {
        message: String,
    },
}

impl SynthesisOutcome {
    /// Text for the status line.
    pub fn status_message(&self) -> String {
        match self {
            Self::Success {
                duration_summary, ..
            } => format!("Generated successfully. {duration_summary}"),
            Self::Failure { message } => message.clone(),
        }
    }

    /// Sample rate and samples, if synthesis succeeded.
    pub fn audio(&self) -> Option<(u32, &[f32])> {
        match self {
            Self::Success {
                sample_rate,
                samples,
                ..
            } => Some((*sample_rate, samples.as_slice())),
            Self::Failure { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<Result<SynthesizedAudio, SynthesisError>> for SynthesisOutcome {
    fn from(result: Result<SynthesizedAudio, SynthesisError>) -> Self {
        match result {
            Ok(audio) => Self::Success {
                sample_rate: audio.sample_rate,
                samples: audio.samples,
                duration_summary: audio.duration_summary,
            },
            Err(err) => Self::Failure {
                message: err.user_message(),
            },
        }
    }
}

/// Orchestrates synthesis requests against a lazily-loaded engine.
pub struct Synthesizer<E> {
    config: PipelineConfig,
    models: ModelManager<E>,
}

impl<E: SynthesisEngine> Synthesizer<E> {
    /// Create a synthesizer that loads `E` from `config.engine_dir` on first use.
    pub fn new(config: PipelineConfig) -> Self {
        let models = ModelManager::new(config.engine_dir.clone(), config.num_threads);
        Self { config, models }
    }

    /// Create a synthesizer around an existing model manager.
    pub fn with_models(config: PipelineConfig, models: ModelManager<E>) -> Self {
        Self { config, models }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn models(&self) -> &ModelManager<E> {
        &self.models
    }

    /// Voice styles currently available for selection.
    pub fn list_styles(&self) -> Vec<String> {
        assets::list_style_assets(&self.config.style_dir, &self.config.style_extension)
    }

    /// The style preselected for a new session, if any exist.
    pub fn default_style(&self) -> Option<String> {
        assets::default_style(&self.config.style_dir, &self.config.style_extension)
    }

    /// Run one synthesis request.
    pub fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        if request.text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }
        if request.style.is_empty() {
            return Err(SynthesisError::NoStyleSelected);
        }

        let style_path = self.resolve_style(&request.style)?;

        let engine: Arc<E> = self.models.acquire()?;

        let style = E::load_voice_style(std::slice::from_ref(&style_path)).map_err(|source| {
            SynthesisError::StyleDecode {
                path: style_path.clone(),
                source,
            }
        })?;

        log::debug!(
            "Synthesizing {} chars with style {}, steps={}, speed={}",
            request.text.chars().count(),
            request.style,
            request.steps,
            request.speed
        );
        let output = engine
            .synthesize(&request.text, &style, request.steps, request.speed)
            .map_err(SynthesisError::Inference)?;

        let adapted = adapt(output.wav.view(), &output.duration);
        Ok(SynthesizedAudio {
            sample_rate: engine.sample_rate(),
            samples: adapted.samples,
            duration_secs: adapted.duration_secs,
            duration_summary: adapted.duration_summary,
        })
    }

    /// Run one request and convert the result for display.
    ///
    /// Failures are logged with their full cause chain; the outcome only
    /// carries the summarized message.
    pub fn generate(&self, request: &SynthesisRequest) -> SynthesisOutcome {
        let result = self.synthesize(request);
        if let Err(err) = &result {
            match err.kind() {
                ErrorKind::Validation | ErrorKind::AssetNotFound => {
                    log::warn!("Rejected synthesis request: {err}")
                }
                ErrorKind::MissingAssets | ErrorKind::EngineFailure => {
                    log::error!("Synthesis failed: {}", error_chain(err))
                }
            }
        }
        SynthesisOutcome::from(result)
    }

    /// Absolute path of the style file `name` inside the style directory.
    ///
    /// `name` must be a bare file name; anything else cannot be one of the
    /// listed styles and is reported as not found.
    fn resolve_style(&self, name: &str) -> Result<PathBuf, SynthesisError> {
        let path = self.config.style_dir.join(name);
        let path = std::path::absolute(&path).unwrap_or(path);

        let mut components = Path::new(name).components();
        let is_file_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !is_file_name || !path.is_file() {
            return Err(SynthesisError::StyleNotFound { path });
        }
        Ok(path)
    }
}

fn error_chain(err: &SynthesisError) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // Variants that print their source inline would repeat it.
        if !chain.ends_with(&text) {
            chain.push_str(": caused by: ");
            chain.push_str(&text);
        }
        source = cause.source();
    }
    chain
}
