use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use rand_distr::{Distribution, StandardNormal};
use serde::Deserialize;

use super::style::VoiceStyle;
use super::text::{preprocess, UnicodeIndexer};

#[derive(thiserror::Error, Debug)]
pub enum SupertonicError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: ort::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Model file not found: {}", .0.display())]
    ModelFileMissing(PathBuf),
    #[error("GPU execution is not supported; load the model with use_gpu = false")]
    GpuUnsupported,
    #[error("Invalid model config: {0}")]
    Config(String),
    #[error("Failed to parse voice style: {0}")]
    VoiceParse(String),
    #[error("{0} produced no output")]
    MissingOutput(&'static str),
    #[error("Text has no characters the model can pronounce: {0:?}")]
    NoTokens(String),
    #[error("Invalid predicted duration {0}")]
    InvalidDuration(f32),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AeConfig {
    pub sample_rate: u32,
    pub base_chunk_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtlConfig {
    pub chunk_compress_factor: usize,
    pub latent_dim: usize,
}

/// Geometry read from `tts.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub ae: AeConfig,
    pub ttl: TtlConfig,
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self, SupertonicError> {
        if !path.exists() {
            return Err(SupertonicError::ModelFileMissing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SupertonicError::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Audio samples covered by one latent frame.
    pub fn chunk_size(&self) -> usize {
        self.ae.base_chunk_size * self.ttl.chunk_compress_factor
    }

    /// Channel count of the latent fed to the vector estimator and vocoder.
    pub fn latent_channels(&self) -> usize {
        self.ttl.latent_dim * self.ttl.chunk_compress_factor
    }

    /// Number of latent frames needed for `wav_len` samples (at least one).
    pub fn latent_len(&self, wav_len: usize) -> usize {
        wav_len.div_ceil(self.chunk_size()).max(1)
    }
}

struct Sessions {
    duration_predictor: Session,
    text_encoder: Session,
    vector_estimator: Session,
    vocoder: Session,
}

/// Internal Supertonic ONNX model state.
pub struct SupertonicModel {
    config: ModelConfig,
    indexer: UnicodeIndexer,
    // ORT sessions need exclusive access to run.
    sessions: Mutex<Sessions>,
}

/// Run one session and copy out its first output as `(shape, values)`.
macro_rules! run_stage {
    ($session:expr, $stage:literal, [$($name:literal => $value:expr),* $(,)?]) => {{
        let outputs = $session
            .run(inputs![$($name => $value),*])
            .map_err(|source| SupertonicError::Stage { stage: $stage, source })?;
        let first = outputs
            .iter()
            .next()
            .ok_or(SupertonicError::MissingOutput($stage))?;
        let (shape, data) = first.1.try_extract_tensor::<f32>()?;
        let shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        (shape, data.to_vec())
    }};
}

impl SupertonicModel {
    /// Load the Supertonic model from a directory.
    ///
    /// The directory must contain `tts.json`, `unicode_indexer.json` and the
    /// four ONNX graphs.
    pub fn load(model_dir: &Path, num_threads: Option<usize>) -> Result<Self, SupertonicError> {
        let config = ModelConfig::load(&model_dir.join("tts.json"))?;
        log::info!(
            "Loading Supertonic model from {} ({} Hz)",
            model_dir.display(),
            config.ae.sample_rate
        );

        let indexer_path = model_dir.join("unicode_indexer.json");
        if !indexer_path.exists() {
            return Err(SupertonicError::ModelFileMissing(indexer_path));
        }
        let indexer = UnicodeIndexer::load(&indexer_path)?;

        let sessions = Sessions {
            duration_predictor: init_session(&model_dir.join("duration_predictor.onnx"), num_threads)?,
            text_encoder: init_session(&model_dir.join("text_encoder.onnx"), num_threads)?,
            vector_estimator: init_session(&model_dir.join("vector_estimator.onnx"), num_threads)?,
            vocoder: init_session(&model_dir.join("vocoder.onnx"), num_threads)?,
        };

        Ok(Self {
            config,
            indexer,
            sessions: Mutex::new(sessions),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.ae.sample_rate
    }

    /// Synthesize one chunk of text.
    ///
    /// Returns the waveform trimmed to the predicted length together with
    /// that length in seconds. `speed` divides the predicted duration.
    pub fn infer(
        &self,
        text: &str,
        style: &VoiceStyle,
        steps: u32,
        speed: f32,
    ) -> Result<(Vec<f32>, f32), SupertonicError> {
        let ids = tokenize(&self.indexer, text)?;
        if style.batch_size() != 1 {
            return Err(SupertonicError::VoiceParse(format!(
                "expected a single voice style, got a batch of {}",
                style.batch_size()
            )));
        }

        let seq_len = ids.len();
        let text_mask = vec![1.0f32; seq_len];
        let ttl_shape = dims3(style.ttl.shape());
        let dp_shape = dims3(style.dp.shape());
        let style_ttl: Vec<f32> = style.ttl.iter().copied().collect();
        let style_dp: Vec<f32> = style.dp.iter().copied().collect();

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        let (_, durations) = run_stage!(sessions.duration_predictor, "Duration predictor", [
            "text_ids" => Tensor::from_array(([1, seq_len], ids.clone()))?,
            "style_dp" => Tensor::from_array((dp_shape, style_dp))?,
            "text_mask" => Tensor::from_array(([1, 1, seq_len], text_mask.clone()))?,
        ]);
        let duration = durations.iter().sum::<f32>() / speed;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(SupertonicError::InvalidDuration(duration));
        }

        let (emb_shape, text_emb) = run_stage!(sessions.text_encoder, "Text encoder", [
            "text_ids" => Tensor::from_array(([1, seq_len], ids))?,
            "style_ttl" => Tensor::from_array((ttl_shape, style_ttl.clone()))?,
            "text_mask" => Tensor::from_array(([1, 1, seq_len], text_mask.clone()))?,
        ]);
        let emb_shape = dims3(&emb_shape);

        let sample_rate = self.sample_rate() as f32;
        let wav_len = (duration * sample_rate) as usize;
        let latent_len = self.config.latent_len(wav_len);
        let channels = self.config.latent_channels();
        log::debug!("Duration {duration:.2}s -> {latent_len} latent frames");

        let mut rng = rand::rng();
        let mut latent: Vec<f32> = (0..channels * latent_len)
            .map(|_| StandardNormal.sample(&mut rng))
            .collect();
        let latent_mask = vec![1.0f32; latent_len];

        for step in 0..steps {
            let (_, next) = run_stage!(sessions.vector_estimator, "Vector estimator", [
                "noisy_latent" => Tensor::from_array(([1, channels, latent_len], latent))?,
                "text_emb" => Tensor::from_array((emb_shape, text_emb.clone()))?,
                "style_ttl" => Tensor::from_array((ttl_shape, style_ttl.clone()))?,
                "latent_mask" => Tensor::from_array(([1, 1, latent_len], latent_mask.clone()))?,
                "text_mask" => Tensor::from_array(([1, 1, seq_len], text_mask.clone()))?,
                "current_step" => Tensor::from_array(([1], vec![step as f32]))?,
                "total_step" => Tensor::from_array(([1], vec![steps as f32]))?,
            ]);
            latent = next;
            log::debug!("Denoising step {}/{} complete", step + 1, steps);
        }

        let (_, mut wav) = run_stage!(sessions.vocoder, "Vocoder", [
            "latent" => Tensor::from_array(([1, channels, latent_len], latent))?,
        ]);
        wav.truncate(wav_len);

        Ok((wav, duration))
    }
}

/// Preprocess and encode `text`, failing when nothing is left to speak.
fn tokenize(indexer: &UnicodeIndexer, text: &str) -> Result<Vec<i64>, SupertonicError> {
    let ids = indexer.encode(&preprocess(text));
    if ids.is_empty() {
        return Err(SupertonicError::NoTokens(text.to_string()));
    }
    Ok(ids)
}

fn dims3(shape: &[usize]) -> [usize; 3] {
    let mut dims = [1; 3];
    for (dst, &src) in dims.iter_mut().rev().zip(shape.iter().rev()) {
        *dst = src;
    }
    dims
}

/// Initialize a CPU-only ONNX session.
fn init_session(onnx_path: &Path, num_threads: Option<usize>) -> Result<Session, SupertonicError> {
    if !onnx_path.exists() {
        return Err(SupertonicError::ModelFileMissing(onnx_path.to_path_buf()));
    }
    log::debug!("Loading ONNX graph {}", onnx_path.display());

    let providers = vec![CPUExecutionProvider::default().build()];
    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_execution_providers(providers)?;

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(onnx_path)?)
}
