use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::{BoxError, EngineOutput, LoadOptions, SynthesisEngine};

use super::model::{SupertonicError, SupertonicModel};
use super::style::VoiceStyle;
use super::text::{chunk_text, MAX_CHUNK_CHARS};

/// Silence inserted between synthesized chunks, in seconds.
pub const CHUNK_SILENCE_SECS: f32 = 0.3;

/// Supertonic text-to-speech engine.
///
/// Long input is split into sentence-aligned chunks that are synthesized
/// separately and joined with [`CHUNK_SILENCE_SECS`] of silence. The
/// returned durations list every chunk and every gap, so their sum is the
/// length of the whole waveform.
pub struct SupertonicEngine {
    model: SupertonicModel,
}

impl SupertonicEngine {
    /// Run the model over `text`, chunk by chunk.
    fn synthesize_chunks(
        &self,
        text: &str,
        style: &VoiceStyle,
        steps: u32,
        speed: f32,
    ) -> Result<EngineOutput, SupertonicError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.len() > 1 {
            log::info!("Splitting text into {} chunks", chunks.len());
        }

        let silence_len = (CHUNK_SILENCE_SECS * self.model.sample_rate() as f32) as usize;
        let mut samples = Vec::new();
        let mut durations = Vec::with_capacity(chunks.len() * 2);

        for (i, chunk) in chunks.iter().enumerate() {
            let (wav, duration) = self.model.infer(chunk, style, steps, speed)?;
            if i > 0 {
                samples.resize(samples.len() + silence_len, 0.0);
                durations.push(CHUNK_SILENCE_SECS);
            }
            samples.extend_from_slice(&wav);
            durations.push(duration);
        }

        let len = samples.len();
        Ok(EngineOutput {
            wav: Array2::from_shape_vec((1, len), samples)?.into_dyn(),
            duration: durations,
        })
    }
}

impl SynthesisEngine for SupertonicEngine {
    type VoiceStyle = VoiceStyle;

    fn load(model_dir: &Path, options: &LoadOptions) -> Result<Self, BoxError> {
        if options.use_gpu {
            return Err(SupertonicError::GpuUnsupported.into());
        }
        let model = SupertonicModel::load(model_dir, options.num_threads)?;
        Ok(Self { model })
    }

    fn sample_rate(&self) -> u32 {
        self.model.sample_rate()
    }

    fn load_voice_style(paths: &[PathBuf]) -> Result<Self::VoiceStyle, BoxError> {
        Ok(VoiceStyle::load(paths)?)
    }

    fn synthesize(
        &self,
        text: &str,
        style: &Self::VoiceStyle,
        steps: u32,
        speed: f32,
    ) -> Result<EngineOutput, BoxError> {
        Ok(self.synthesize_chunks(text, style, steps, speed)?)
    }
}
