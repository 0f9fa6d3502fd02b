// Process-wide, load-once model handle
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::model_cache::{ensure_model_files, ModelFiles};
use super::onnx_model::OnnxZeroShotModel;
use super::EntailmentModel;
use crate::config::ModelConfig;
use crate::types::{ModelLoadError, Stage, TopicError};

/// Produces a ready-to-run model. Called once per load attempt.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EntailmentModel>, ModelLoadError>;
}

type LoadAttempt = Shared<BoxFuture<'static, Result<Arc<dyn EntailmentModel>, TopicError>>>;

enum Slot {
    Empty,
    Loading(LoadAttempt),
    Ready(Arc<dyn EntailmentModel>),
}

/// Holds the single shared model handle.
///
/// Built once at wiring time and handed to every classifier that needs it.
/// Callers arriving while a load is in flight await that same attempt and
/// see its outcome, success or failure. A failed attempt is dropped once it
/// resolves, so only a later `get` tries again; nothing retries on its own.
pub struct ModelProvider {
    loader: Arc<dyn ModelLoader>,
    slot: Mutex<Slot>,
    load_timeout: Option<Duration>,
}

impl ModelProvider {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            slot: Mutex::new(Slot::Empty),
            load_timeout: None,
        }
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Provider backed by the ONNX model described in `config`.
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(Arc::new(HubModelLoader::new(config.clone())))
            .with_load_timeout(config.load_timeout())
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.lock_slot(), Slot::Ready(_))
    }

    pub async fn get(&self) -> Result<Arc<dyn EntailmentModel>, TopicError> {
        let attempt = {
            let mut slot = self.lock_slot();
            let in_flight = match &*slot {
                Slot::Ready(model) => return Ok(model.clone()),
                Slot::Loading(attempt) => Some(attempt.clone()),
                Slot::Empty => None,
            };
            match in_flight {
                Some(attempt) => attempt,
                None => {
                    let attempt = self.start_load();
                    *slot = Slot::Loading(attempt.clone());
                    attempt
                }
            }
        };

        let outcome = attempt.clone().await;

        // first caller back settles the slot, unless a newer attempt replaced it
        let mut slot = self.lock_slot();
        let settles = matches!(&*slot, Slot::Loading(current) if current.ptr_eq(&attempt));
        if settles {
            *slot = match &outcome {
                Ok(model) => Slot::Ready(model.clone()),
                Err(_) => Slot::Empty,
            };
        }
        outcome
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_load(&self) -> LoadAttempt {
        let loader = self.loader.clone();
        let load_timeout = self.load_timeout;
        async move {
            let started = Instant::now();
            tracing::info!("loading topic model");
            let loaded = match load_timeout {
                Some(limit) => match tokio::time::timeout(limit, loader.load()).await {
                    Ok(result) => result.map_err(TopicError::ModelLoad),
                    Err(_) => Err(TopicError::Timeout {
                        stage: Stage::ModelLoad,
                        after: limit,
                    }),
                },
                None => loader.load().await.map_err(TopicError::ModelLoad),
            };
            match &loaded {
                Ok(_) => tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "topic model ready"
                ),
                Err(e) => tracing::warn!(error = %e, "topic model failed to load"),
            }
            loaded
        }
        .boxed()
        .shared()
    }
}

/// Loads the zero-shot ONNX model from the local cache, downloading missing files first.
pub struct HubModelLoader {
    config: ModelConfig,
}

impl HubModelLoader {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Make sure every model file is on disk without building a session.
    pub async fn prefetch(&self) -> Result<ModelFiles, ModelLoadError> {
        ensure_model_files(&self.config).await
    }
}

#[async_trait]
impl ModelLoader for HubModelLoader {
    async fn load(&self) -> Result<Arc<dyn EntailmentModel>, ModelLoadError> {
        let files = ensure_model_files(&self.config).await?;
        let intra_threads = self.config.intra_threads;

        // session construction reads and optimises the whole graph
        let model = tokio::task::spawn_blocking(move || OnnxZeroShotModel::load(&files, intra_threads))
            .await
            .map_err(|e| ModelLoadError::Runtime(e.to_string()))??;
        Ok(Arc::new(model))
    }
}
