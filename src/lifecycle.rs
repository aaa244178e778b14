//! Process-wide engine ownership.
//!
//! [`ModelManager`] builds the engine on the first [`ModelManager::acquire`]
//! call and hands out the same shared handle afterwards. Exactly one load is
//! attempted per manager: the outcome, success or failure, is remembered and
//! returned to every later caller. The check-and-set runs under a mutex, so
//! concurrent first calls wait for the single load instead of racing it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{BoxError, LoadOptions, SynthesisEngine};

type Loader<E> = Box<dyn Fn(&Path, &LoadOptions) -> Result<E, BoxError> + Send + Sync>;

#[derive(thiserror::Error, Debug, Clone)]
pub enum LifecycleError {
    #[error(
        "Engine asset directory not found at '{}'. Please ensure assets are correctly linked.",
        path.display()
    )]
    MissingAssets { path: PathBuf },
    #[error("Failed to load engine from '{}': {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

enum LoadState<E> {
    Unloaded,
    Ready(Arc<E>),
    Failed(LifecycleError),
}

/// Lazily-built, shared engine instance.
pub struct ModelManager<E> {
    model_dir: PathBuf,
    options: LoadOptions,
    loader: Loader<E>,
    state: Mutex<LoadState<E>>,
}

impl<E: SynthesisEngine> ModelManager<E> {
    /// Create a manager that builds the engine with [`SynthesisEngine::load`].
    ///
    /// Acceleration is always disabled: the engine runs on CPU.
    pub fn new(model_dir: impl Into<PathBuf>, num_threads: Option<usize>) -> Self {
        Self::with_loader(model_dir, num_threads, E::load)
    }
}

impl<E> ModelManager<E> {
    /// Create a manager with a custom construction function.
    pub fn with_loader<F>(
        model_dir: impl Into<PathBuf>,
        num_threads: Option<usize>,
        loader: F,
    ) -> Self
    where
        F: Fn(&Path, &LoadOptions) -> Result<E, BoxError> + Send + Sync + 'static,
    {
        Self {
            model_dir: model_dir.into(),
            options: LoadOptions {
                use_gpu: false,
                num_threads,
            },
            loader: Box::new(loader),
            state: Mutex::new(LoadState::Unloaded),
        }
    }

    /// Return the engine, loading it on the first call.
    pub fn acquire(&self) -> Result<Arc<E>, LifecycleError> {
        // The state is only ever replaced wholesale, so a poisoned lock still
        // holds a consistent value.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            LoadState::Ready(engine) => return Ok(Arc::clone(engine)),
            LoadState::Failed(err) => return Err(err.clone()),
            LoadState::Unloaded => {}
        }

        let result = self.load();
        *state = match &result {
            Ok(engine) => LoadState::Ready(Arc::clone(engine)),
            Err(err) => LoadState::Failed(err.clone()),
        };
        result
    }

    /// Whether a load has succeeded.
    pub fn is_loaded(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, LoadState::Ready(_))
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    fn load(&self) -> Result<Arc<E>, LifecycleError> {
        if !self.model_dir.exists() {
            log::error!("Engine asset directory {} is missing", self.model_dir.display());
            return Err(LifecycleError::MissingAssets {
                path: self.model_dir.clone(),
            });
        }

        log::info!("Loading TTS model from {}...", self.model_dir.display());
        let engine = (self.loader)(&self.model_dir, &self.options).map_err(|e| {
            LifecycleError::Load {
                path: self.model_dir.clone(),
                source: Arc::from(e),
            }
        })?;
        log::info!("Model loaded successfully.");
        Ok(Arc::new(engine))
    }
}
