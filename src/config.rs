use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default location of the engine's model files.
pub const DEFAULT_ENGINE_DIR: &str = "assets/onnx";

/// Default location of the voice style files.
pub const DEFAULT_STYLE_DIR: &str = "assets/voice_styles";

/// File extension of voice style assets.
pub const STYLE_EXTENSION: &str = "json";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid pipeline config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Filesystem layout used by the synthesis pipeline.
///
/// ```rust
/// use supertonic_tts::PipelineConfigBuilder;
///
/// let config = PipelineConfigBuilder::default()
///     .engine_dir("/opt/supertonic/onnx")
///     .build()
///     .unwrap();
/// assert_eq!(config.style_dir.to_str(), Some("assets/voice_styles"));
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the engine's model files.
    #[builder(setter(into))]
    pub engine_dir: PathBuf,
    /// Directory scanned for voice style files.
    #[builder(setter(into))]
    pub style_dir: PathBuf,
    /// Extension (without the dot) identifying voice style files.
    #[builder(setter(into))]
    pub style_extension: String,
    /// Inference thread count handed to the engine. `None` = runtime default.
    #[builder(setter(strip_option))]
    pub num_threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine_dir: PathBuf::from(DEFAULT_ENGINE_DIR),
            style_dir: PathBuf::from(DEFAULT_STYLE_DIR),
            style_extension: STYLE_EXTENSION.to_string(),
            num_threads: None,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
