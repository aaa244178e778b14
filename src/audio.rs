//! Conversion of raw engine output into playable audio.

use std::path::Path;

use ndarray::ArrayViewD;

/// Engine output flattened into a playable buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedAudio {
    /// Mono samples in playback order.
    pub samples: Vec<f32>,
    /// Sum of all segment durations, in seconds.
    pub duration_secs: f32,
    /// Human-readable duration, e.g. `"Duration: 3.42s"`.
    pub duration_summary: String,
}

/// Flatten `wav` into one dimension and summarize the segment durations.
///
/// Samples keep their logical (row-major) order regardless of the array's
/// shape or memory layout. Neither input is modified.
pub fn adapt(wav: ArrayViewD<'_, f32>, durations: &[f32]) -> AdaptedAudio {
    let samples: Vec<f32> = wav.iter().copied().collect();
    let total: f64 = durations.iter().map(|&d| f64::from(d)).sum();

    AdaptedAudio {
        samples,
        duration_secs: total as f32,
        duration_summary: format_duration_summary(total),
    }
}

/// Render a total duration as `"Duration: <seconds>s"` with two decimals.
pub fn format_duration_summary(seconds: f64) -> String {
    format!("Duration: {seconds:.2}s")
}

/// Audio produced by a successful synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    /// Sample rate reported by the engine.
    pub sample_rate: u32,
    /// Raw mono f32 samples.
    pub samples: Vec<f32>,
    /// Duration predicted by the engine, in seconds.
    pub duration_secs: f32,
    /// `duration_secs` formatted by [`format_duration_summary`].
    pub duration_summary: String,
}

impl SynthesizedAudio {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array, IxDyn};

    #[test]
    fn single_row_batch_flattens_in_order() {
        let wav = arr2(&[[0.1f32, -0.2, 0.3, 0.0]]).into_dyn();
        let adapted = adapt(wav.view(), &[0.5]);

        assert_eq!(adapted.samples, vec![0.1, -0.2, 0.3, 0.0]);
        assert_eq!(wav.shape(), &[1, 4]);
    }

    #[test]
    fn non_contiguous_view_keeps_logical_order() {
        let wav = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]);
        let transposed = wav.t().into_dyn();
        let adapted = adapt(transposed, &[]);

        assert_eq!(adapted.samples, vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn summary_sums_segments() {
        let wav = Array::<f32, _>::zeros(IxDyn(&[1, 8]));
        let adapted = adapt(wav.view(), &[1.234, 2.184]);

        assert_eq!(adapted.duration_summary, "Duration: 3.42s");
        assert!((adapted.duration_secs - 3.418).abs() < 1e-4);
    }

    #[test]
    fn empty_durations_report_zero() {
        assert_eq!(format_duration_summary(0.0), "Duration: 0.00s");
    }

    #[test]
    fn wav_round_trip_preserves_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let audio = SynthesizedAudio {
            sample_rate: 44100,
            samples: vec![0.0, 0.25, -0.5],
            duration_secs: 3.0 / 44100.0,
            duration_summary: format_duration_summary(0.0),
        };
        audio.write_wav(&path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        let read: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
        assert_eq!(read, audio.samples);
    }
}
