use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ndarray::Array2;
use supertonic_tts::{
    BoxError, EngineOutput, ErrorKind, LoadOptions, ModelManager, PipelineConfig,
    PipelineConfigBuilder, SynthesisEngine, SynthesisError, SynthesisOutcome, SynthesisRequest,
    Synthesizer,
};
use tempfile::TempDir;

const FAKE_RATE: u32 = 24000;

/// Records every call it receives and returns a fixed waveform.
#[derive(Default)]
struct Calls {
    loads: AtomicUsize,
    synth: Mutex<Vec<(String, u32, f32)>>,
}

struct FakeEngine {
    calls: Arc<Calls>,
    fail_with: Option<&'static str>,
}

struct FakeStyle {
    paths: Vec<PathBuf>,
}

impl SynthesisEngine for FakeEngine {
    type VoiceStyle = FakeStyle;

    fn load(_model_dir: &Path, _options: &LoadOptions) -> Result<Self, BoxError> {
        Err("FakeEngine is built through ModelManager::with_loader".into())
    }

    fn sample_rate(&self) -> u32 {
        FAKE_RATE
    }

    fn load_voice_style(paths: &[PathBuf]) -> Result<Self::VoiceStyle, BoxError> {
        let content = std::fs::read_to_string(&paths[0])?;
        if !content.contains("style_ttl") {
            return Err(format!("{} is missing style_ttl", paths[0].display()).into());
        }
        Ok(FakeStyle {
            paths: paths.to_vec(),
        })
    }

    fn synthesize(
        &self,
        text: &str,
        style: &Self::VoiceStyle,
        steps: u32,
        speed: f32,
    ) -> Result<EngineOutput, BoxError> {
        assert_eq!(style.paths.len(), 1);
        self.calls
            .synth
            .lock()
            .unwrap()
            .push((text.to_string(), steps, speed));
        if let Some(msg) = self.fail_with {
            return Err(msg.into());
        }
        Ok(EngineOutput {
            wav: Array2::from_shape_vec((1, 5), vec![0.0, 0.1, 0.2, 0.3, 0.4])
                .unwrap()
                .into_dyn(),
            duration: vec![1.234, 2.184],
        })
    }
}

struct Fixture {
    _dir: TempDir,
    config: PipelineConfig,
    calls: Arc<Calls>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let engine_dir = dir.path().join("onnx");
        let style_dir = dir.path().join("voice_styles");
        std::fs::create_dir(&engine_dir).unwrap();
        std::fs::create_dir(&style_dir).unwrap();
        std::fs::write(style_dir.join("F1.json"), r#"{"style_ttl": {}, "style_dp": {}}"#).unwrap();
        std::fs::write(style_dir.join("broken.json"), "{}").unwrap();

        let config = PipelineConfigBuilder::default()
            .engine_dir(engine_dir)
            .style_dir(style_dir)
            .build()
            .unwrap();
        Self {
            _dir: dir,
            config,
            calls: Arc::new(Calls::default()),
        }
    }

    fn synthesizer(&self, fail_with: Option<&'static str>) -> Synthesizer<FakeEngine> {
        let calls = Arc::clone(&self.calls);
        let models = ModelManager::with_loader(&self.config.engine_dir, None, move |_, options| {
            assert!(!options.use_gpu);
            calls.loads.fetch_add(1, Ordering::SeqCst);
            Ok(FakeEngine {
                calls: Arc::clone(&calls),
                fail_with,
            })
        });
        Synthesizer::with_models(self.config.clone(), models)
    }

    fn loads(&self) -> usize {
        self.calls.loads.load(Ordering::SeqCst)
    }

    fn synth_calls(&self) -> usize {
        self.calls.synth.lock().unwrap().len()
    }
}

#[test]
fn blank_text_never_reaches_engine() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);

    for text in ["", "   ", "\n\t "] {
        let outcome = synthesizer.generate(&SynthesisRequest::new(text, "F1.json"));
        assert_eq!(
            outcome,
            SynthesisOutcome::Failure {
                message: "Please enter some text.".to_string()
            }
        );
    }
    assert_eq!(fixture.loads(), 0);
    assert_eq!(fixture.synth_calls(), 0);
}

#[test]
fn missing_selection_is_rejected() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);

    let outcome = synthesizer.generate(&SynthesisRequest::new("Hello.", ""));
    assert_eq!(outcome.status_message(), "Please select a voice style.");
    assert_eq!(fixture.loads(), 0);
}

#[test]
fn unknown_style_reports_resolved_path() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);

    assert!(!synthesizer.list_styles().contains(&"M9.json".to_string()));
    let err = synthesizer
        .synthesize(&SynthesisRequest::new("Hello.", "M9.json"))
        .unwrap_err();
    let expected = fixture.config.style_dir.join("M9.json");
    match &err {
        SynthesisError::StyleNotFound { path } => assert_eq!(path, &expected),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::AssetNotFound);
    assert_eq!(
        SynthesisOutcome::from(Err(err)).status_message(),
        format!("Voice style file not found: {}", expected.display())
    );
    assert_eq!(fixture.synth_calls(), 0);
}

#[test]
fn style_names_cannot_leave_style_directory() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);
    let outside = fixture.config.style_dir.parent().unwrap().join("outside.json");
    std::fs::write(&outside, r#"{"style_ttl": {}, "style_dp": {}}"#).unwrap();

    let absolute = outside.display().to_string();
    for name in ["../outside.json", absolute.as_str(), "./F1.json", "sub/F1.json"] {
        let err = synthesizer
            .synthesize(&SynthesisRequest::new("Hello.", name))
            .unwrap_err();
        assert!(
            matches!(err, SynthesisError::StyleNotFound { .. }),
            "{name}: {err}"
        );
        assert_eq!(err.kind(), ErrorKind::AssetNotFound);
    }
    assert_eq!(fixture.loads(), 0);
    assert_eq!(fixture.synth_calls(), 0);
}

#[test]
fn successful_request_reports_engine_rate_and_duration() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);
    let request = SynthesisRequest::new("Hello there.", "F1.json");
    assert_eq!((request.speed, request.steps), (1.05, 5));

    let outcome = synthesizer.generate(&request);
    match &outcome {
        SynthesisOutcome::Success {
            sample_rate,
            samples,
            duration_summary,
        } => {
            assert_eq!(*sample_rate, FAKE_RATE);
            assert_eq!(samples, &vec![0.0, 0.1, 0.2, 0.3, 0.4]);
            assert_eq!(duration_summary, "Duration: 3.42s");
        }
        SynthesisOutcome::Failure { message } => panic!("synthesis failed: {message}"),
    }
    assert_eq!(
        outcome.status_message(),
        "Generated successfully. Duration: 3.42s"
    );

    let calls = fixture.calls.synth.lock().unwrap();
    assert_eq!(calls.as_slice(), &[("Hello there.".to_string(), 5, 1.05)]);
}

#[test]
fn written_wav_keeps_engine_rate_and_predicted_duration() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);

    let result = synthesizer.synthesize(&SynthesisRequest::new("Hello there.", "F1.json"));
    let audio = result.as_ref().unwrap();
    assert!((audio.duration_secs - 3.418).abs() < 1e-4);

    let path = fixture.config.engine_dir.join("output.wav");
    audio.write_wav(&path).unwrap();
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, FAKE_RATE);
    assert_eq!(reader.len(), 5);

    assert_eq!(
        SynthesisOutcome::from(result).status_message(),
        "Generated successfully. Duration: 3.42s"
    );
}

#[test]
fn engine_is_loaded_once_across_requests() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);

    for _ in 0..3 {
        assert!(synthesizer
            .generate(&SynthesisRequest::new("Again.", "F1.json"))
            .is_success());
    }
    assert_eq!(fixture.loads(), 1);
    assert_eq!(fixture.synth_calls(), 3);
    assert!(synthesizer.models().is_loaded());
}

#[test]
fn parameters_pass_through_unchanged() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);
    let request = SynthesisRequest {
        text: "Fast.".to_string(),
        style: "F1.json".to_string(),
        speed: 3.5,
        steps: 40,
    };

    assert!(synthesizer.synthesize(&request).is_ok());
    let calls = fixture.calls.synth.lock().unwrap();
    assert_eq!(calls[0].1, 40);
    assert_eq!(calls[0].2, 3.5);
}

#[test]
fn missing_engine_assets_surface_as_error_message() {
    let fixture = Fixture::new();
    std::fs::remove_dir(&fixture.config.engine_dir).unwrap();
    let synthesizer = fixture.synthesizer(None);

    let err = synthesizer
        .synthesize(&SynthesisRequest::new("Hello.", "F1.json"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingAssets);

    let outcome = synthesizer.generate(&SynthesisRequest::new("Hello.", "F1.json"));
    let message = outcome.status_message();
    assert!(message.starts_with("Error: "), "{message}");
    assert!(message.contains(&fixture.config.engine_dir.display().to_string()));

    std::fs::create_dir(&fixture.config.engine_dir).unwrap();
    assert!(!synthesizer
        .generate(&SynthesisRequest::new("Hello.", "F1.json"))
        .is_success());
    assert_eq!(fixture.loads(), 0);
}

#[test]
fn style_decode_failure_is_an_engine_failure() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);

    let err = synthesizer
        .synthesize(&SynthesisRequest::new("Hello.", "broken.json"))
        .unwrap_err();
    assert!(matches!(err, SynthesisError::StyleDecode { .. }));
    assert_eq!(err.kind(), ErrorKind::EngineFailure);
    assert!(err.user_message().starts_with("Error: "));
    assert_eq!(fixture.synth_calls(), 0);
}

#[test]
fn inference_failure_keeps_underlying_message() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(Some("vocoder exploded"));

    let outcome = synthesizer.generate(&SynthesisRequest::new("Hello.", "F1.json"));
    assert_eq!(
        outcome,
        SynthesisOutcome::Failure {
            message: "Error: vocoder exploded".to_string()
        }
    );
    assert!(outcome.audio().is_none());
}

#[test]
fn default_style_comes_from_listing() {
    let fixture = Fixture::new();
    let synthesizer = fixture.synthesizer(None);

    let styles = synthesizer.list_styles();
    assert_eq!(styles.len(), 2);
    assert_eq!(synthesizer.default_style(), styles.first().cloned());
}

#[test]
fn missing_style_directory_lists_nothing() {
    let config = PipelineConfigBuilder::default()
        .style_dir("/nonexistent/voice_styles")
        .build()
        .unwrap();
    let synthesizer = Synthesizer::<FakeEngine>::new(config);

    assert!(synthesizer.list_styles().is_empty());
    assert_eq!(synthesizer.default_style(), None);
}

#[test]
fn synthesizer_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Synthesizer<FakeEngine>>();
}
