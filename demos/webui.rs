use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use supertonic_tts::{
    engines::supertonic::SupertonicEngine,
    pipeline::{DEFAULT_SPEED, DEFAULT_STEPS, DEFAULT_TEXT},
    PipelineConfig, SynthesisOutcome, SynthesisRequest, Synthesizer,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::var_os("SUPERTONIC_CONFIG") {
        Some(path) => PipelineConfig::from_json_file(&PathBuf::from(path))?,
        None => PipelineConfig::default(),
    };
    let synthesizer = Synthesizer::<SupertonicEngine>::new(config);

    let styles = synthesizer.list_styles();
    println!("Supertonic TTS (models: {})", synthesizer.config().engine_dir.display());
    println!("Available voice styles: {styles:?}");
    let style = styles.first().cloned().unwrap_or_default();
    println!("Voice style: {style:?}, speed {DEFAULT_SPEED}, {DEFAULT_STEPS} denoising steps");
    println!("Enter text to speak (empty line = sample text, Ctrl-D to quit).");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let text = match line.trim() {
            "" => DEFAULT_TEXT,
            text => text,
        };
        let request = SynthesisRequest::new(text, style.as_str());

        let start = Instant::now();
        let result = synthesizer.synthesize(&request);
        let elapsed = start.elapsed();

        match &result {
            Ok(audio) => {
                audio.write_wav(&PathBuf::from("output.wav"))?;
                log::info!(
                    "Saved {:.2}s of audio ({} Hz) to output.wav",
                    audio.duration_secs,
                    audio.sample_rate
                );
            }
            Err(err) => log::error!("Synthesis failed: {err}"),
        }
        println!("{} ({elapsed:.2?})", SynthesisOutcome::from(result).status_message());
    }

    Ok(())
}
