// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use captiongen::{
    api::{start_server, AppState},
    config::CaptionConfig,
    vision::ModelManager,
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🚀 Starting {}...\n", captiongen::version::get_version_string());

    let config = CaptionConfig::load()?;
    println!("📦 Model:       {}", config.model_repo);
    println!("📁 Model dir:   {}", config.model_dir.display());
    println!("🌐 Listen addr: {}", config.listen_addr);
    println!();

    // Load the model once, before accepting requests
    println!("🧠 Loading caption model...");
    let models = Arc::new(ModelManager::new(&config));
    let state = AppState::load(models, config).await?;
    println!("✅ Caption model ready ({})", state.service.model_name());

    start_server(state).await?;

    println!("👋 Caption server stopped");
    Ok(())
}
