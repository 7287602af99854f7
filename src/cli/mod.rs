// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod caption;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::caption::is_failure;

/// captiongen CLI
#[derive(Parser, Debug)]
#[command(name = "captiongen-cli")]
#[command(version)]
#[command(about = "Generate image captions with BLIP from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Caption an image file or URL
    Caption(caption::CaptionArgs),

    /// Download the model files into the local model directory
    Download(caption::DownloadArgs),
}

/// Execute CLI command
///
/// A caption that reports a failure maps to a failing exit code.
pub async fn execute(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Caption(args) => {
            let caption = caption::run_caption(args).await?;
            if is_failure(&caption) {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Commands::Download(args) => {
            caption::run_download(args).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
