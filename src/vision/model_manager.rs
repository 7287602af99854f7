// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption model manager
//!
//! Resolves the BLIP model files (local directory first, Hugging Face Hub
//! otherwise) and loads the model exactly once per process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::caption::CaptionModel;
use crate::config::CaptionConfig;
use crate::vision::blip::model::{
    BlipFiles, BlipModel, BlipOptions, PREPROCESSOR_CONFIG_FILE, TEXT_DECODER_FILE,
    TOKENIZER_FILE, VISION_MODEL_FILE,
};

/// Where the model files came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Local,
    Hub,
    Custom,
}

/// Information about the loaded caption model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub source: ModelSource,
    pub max_length: usize,
    pub load_time_ms: u64,
    pub loaded_at: DateTime<Utc>,
}

/// A loaded model together with its description
#[derive(Clone)]
pub struct LoadedModel {
    pub model: Arc<dyn CaptionModel>,
    pub info: ModelInfo,
}

type Loader = Arc<dyn Fn() -> BoxFuture<'static, Result<LoadedModel>> + Send + Sync>;

/// Memoizing model loader shared by every front-end
pub struct ModelManager {
    loader: Loader,
    loaded: OnceCell<LoadedModel>,
}

impl ModelManager {
    /// Manager that loads BLIP according to `config`
    pub fn new(config: &CaptionConfig) -> Self {
        let config = config.clone();
        Self::with_loader(move || {
            let config = config.clone();
            Box::pin(async move { load_blip(&config).await })
        })
    }

    /// Manager with a custom loading routine
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<LoadedModel>> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(loader),
            loaded: OnceCell::new(),
        }
    }

    /// Manager around an already constructed model
    pub fn preloaded(model: Arc<dyn CaptionModel>, max_length: usize) -> Self {
        let info = ModelInfo {
            name: model.name().to_string(),
            source: ModelSource::Custom,
            max_length,
            load_time_ms: 0,
            loaded_at: Utc::now(),
        };
        Self {
            loader: Arc::new(|| -> BoxFuture<'static, Result<LoadedModel>> {
                Box::pin(async { Err::<LoadedModel, _>(anyhow::anyhow!("model already provided")) })
            }),
            loaded: OnceCell::new_with(Some(LoadedModel { model, info })),
        }
    }

    /// Return the model, loading it on first use
    ///
    /// Concurrent first callers wait on a single load. A failed load is not
    /// cached, so the next call retries.
    pub async fn get_or_load(&self) -> Result<Arc<dyn CaptionModel>> {
        let loaded = self
            .loaded
            .get_or_try_init(|| async {
                let loader = self.loader.clone();
                loader().await
            })
            .await?;
        Ok(loaded.model.clone())
    }

    /// Info about the model if it has been loaded
    pub fn info(&self) -> Option<ModelInfo> {
        self.loaded.get().map(|l| l.info.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }
}

async fn load_blip(config: &CaptionConfig) -> Result<LoadedModel> {
    let start = Instant::now();

    let (files, source) = match BlipFiles::locate(&config.model_dir) {
        Ok(files) => {
            info!("Using local model files in {}", config.model_dir.display());
            (files, ModelSource::Local)
        }
        Err(e) => {
            debug!("Local model files unavailable: {}", e);
            info!("Fetching {} from the Hugging Face Hub", config.model_repo);
            (fetch_from_hub(&config.model_repo).await?, ModelSource::Hub)
        }
    };

    let options = BlipOptions {
        max_length: config.max_length,
        intra_threads: config.intra_threads,
        name: config.model_repo.clone(),
    };

    let model = tokio::task::spawn_blocking(move || BlipModel::from_files(&files, &options))
        .await
        .context("Model loading task panicked")??;

    let info = ModelInfo {
        name: config.model_repo.clone(),
        source,
        max_length: model.max_length(),
        load_time_ms: start.elapsed().as_millis() as u64,
        loaded_at: Utc::now(),
    };
    info!("✅ Caption model loaded in {}ms", info.load_time_ms);

    Ok(LoadedModel {
        model: Arc::new(model),
        info,
    })
}

/// Hub path of each model file
fn hub_paths() -> [(String, bool); 4] {
    [
        (format!("onnx/{}", VISION_MODEL_FILE), true),
        (format!("onnx/{}", TEXT_DECODER_FILE), true),
        (TOKENIZER_FILE.to_string(), true),
        (PREPROCESSOR_CONFIG_FILE.to_string(), false),
    ]
}

/// Download the model files into the Hugging Face cache
pub async fn fetch_from_hub(repo: &str) -> Result<BlipFiles> {
    let api = hf_hub::api::tokio::Api::new().context("Failed to create Hugging Face Hub client")?;
    let api = api.model(repo.to_string());

    let mut resolved: Vec<Option<PathBuf>> = Vec::new();
    for (remote, required) in hub_paths() {
        match api.get(&remote).await {
            Ok(path) => {
                debug!("Fetched {} -> {}", remote, path.display());
                resolved.push(Some(path));
            }
            Err(e) if !required => {
                warn!("Optional file {} unavailable: {}", remote, e);
                resolved.push(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to download {} from {}", remote, repo))
            }
        }
    }

    let mut iter = resolved.into_iter();
    let mut required = || {
        iter.next()
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("Missing required model file from {}", repo))
    };
    let vision_model = required()?;
    let text_decoder = required()?;
    let tokenizer = required()?;
    let preprocessor_config = iter.next().flatten();

    Ok(BlipFiles {
        vision_model,
        text_decoder,
        tokenizer,
        preprocessor_config,
    })
}

/// Fetch the model and copy it into `model_dir` using the Hub layout
pub async fn download_to(repo: &str, model_dir: &Path) -> Result<BlipFiles> {
    let fetched = fetch_from_hub(repo).await?;
    let onnx_dir = model_dir.join("onnx");
    tokio::fs::create_dir_all(&onnx_dir)
        .await
        .with_context(|| format!("Failed to create {}", onnx_dir.display()))?;

    let vision_model = copy_into(&fetched.vision_model, &onnx_dir.join(VISION_MODEL_FILE)).await?;
    let text_decoder = copy_into(&fetched.text_decoder, &onnx_dir.join(TEXT_DECODER_FILE)).await?;
    let tokenizer = copy_into(&fetched.tokenizer, &model_dir.join(TOKENIZER_FILE)).await?;
    let preprocessor_config = match &fetched.preprocessor_config {
        Some(src) => Some(copy_into(src, &model_dir.join(PREPROCESSOR_CONFIG_FILE)).await?),
        None => None,
    };

    info!("Model files written to {}", model_dir.display());
    Ok(BlipFiles {
        vision_model,
        text_decoder,
        tokenizer,
        preprocessor_config,
    })
}

async fn copy_into(src: &Path, dest: &Path) -> Result<PathBuf> {
    tokio::fs::copy(src, dest)
        .await
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
    Ok(dest.to_path_buf())
}
