// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::caption::{is_failure, CaptionError, CaptionService, ImageFetcher, ImageInput};
use crate::config::CaptionConfig;
use crate::vision::model_manager::{download_to, ModelManager};

/// Model location flags shared by the subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Local model directory (checked before downloading)
    #[arg(long, env = "CAPTIONGEN_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Hugging Face Hub repository with the ONNX export
    #[arg(long, env = "CAPTIONGEN_MODEL_REPO")]
    pub model_repo: Option<String>,
}

impl ModelArgs {
    /// Apply the flags on top of the file / environment configuration
    pub fn apply(&self, mut config: CaptionConfig) -> CaptionConfig {
        if let Some(ref dir) = self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(ref repo) = self.model_repo {
            config.model_repo = repo.clone();
        }
        config
    }
}

/// Arguments for the caption command
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Image file path or http(s) URL
    pub source: String,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Maximum caption length in tokens
    #[arg(long)]
    pub max_length: Option<usize>,

    /// URL fetch timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print a JSON object instead of the bare caption
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the download command
#[derive(Args, Debug)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

/// Turn a command-line source into a service input
///
/// `http://` and `https://` sources are URLs; anything else is read as a file.
pub async fn input_from_source(source: &str) -> Result<Option<ImageInput>, CaptionError> {
    let source = source.trim();
    if source.is_empty() {
        return Ok(None);
    }
    if source.starts_with("http://") || source.starts_with("https://") {
        return Ok(ImageInput::from_url(source));
    }

    let bytes = tokio::fs::read(source)
        .await
        .map_err(|e| CaptionError::Decode(format!("{}: {}", source, e)))?;
    Ok(ImageInput::from_bytes(bytes))
}

/// Caption one image; returns the caption string (possibly a `❌` failure)
pub async fn run_caption(args: CaptionArgs) -> Result<String> {
    dotenv::dotenv().ok();

    let mut config = args.model.apply(CaptionConfig::load()?);
    if let Some(max_length) = args.max_length {
        config.max_length = max_length;
    }
    if let Some(timeout) = args.timeout {
        config.fetch_timeout_secs = Some(timeout);
    }

    let manager = ModelManager::new(&config);
    let model = manager.get_or_load().await?;
    let fetcher = ImageFetcher::new(config.fetch_timeout(), config.max_image_bytes)
        .context("Failed to create HTTP client")?;
    let service = CaptionService::new(model, fetcher).with_max_image_bytes(config.max_image_bytes);

    let result = match input_from_source(&args.source).await {
        Ok(input) => service.caption(input).await,
        Err(e) => Err(e),
    };

    let caption = match &result {
        Ok(caption) => caption.text.clone(),
        Err(e) => e.render(),
    };

    if args.json {
        let value = match result {
            Ok(caption) => serde_json::json!({
                "caption": caption.text,
                "success": true,
                "width": caption.width,
                "height": caption.height,
                "processingTimeMs": caption.processing_time_ms,
            }),
            Err(e) => serde_json::json!({
                "caption": e.render(),
                "success": false,
                "errorKind": e.kind(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", caption);
    }

    if is_failure(&caption) {
        info!("Caption failed for {}", args.source);
    }
    Ok(caption)
}

/// Fetch the model files into the local model directory
pub async fn run_download(args: DownloadArgs) -> Result<()> {
    dotenv::dotenv().ok();
    let config = args.model.apply(CaptionConfig::load()?);

    println!(
        "📥 Downloading {} into {}...",
        config.model_repo,
        config.model_dir.display()
    );
    let files = download_to(&config.model_repo, &config.model_dir).await?;

    println!("✅ Model files ready:");
    println!("  Vision model:  {}", files.vision_model.display());
    println!("  Text decoder:  {}", files.text_decoder.display());
    println!("  Tokenizer:     {}", files.tokenizer.display());
    match files.preprocessor_config {
        Some(path) => println!("  Preprocessor:  {}", path.display()),
        None => println!("  Preprocessor:  (defaults)"),
    }

    // Loading validates the files end to end
    ModelManager::new(&config).get_or_load().await?;
    println!("✅ Model loads successfully");
    Ok(())
}
