use std::path::PathBuf;

mod backend_bridge;
mod ui;

use anyhow::Context;
use clap::Parser;
use client_core::config::{load_settings, load_settings_from, normalize_database_url};
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::{backend_bridge::BackendBridge, ui::BlogApp};

#[derive(Parser, Debug)]
#[command(about = "Desktop blog")]
struct Args {
    /// SQLite database url or file path.
    #[arg(long)]
    database_url: Option<String>,
    /// Username new posts are attributed to.
    #[arg(long)]
    author: Option<String>,
    /// Settings file to read instead of ./blog.toml.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    if let Some(database_url) = args.database_url {
        settings.database_url = database_url;
    }
    if let Some(author) = args.author {
        let author = author.trim().to_string();
        settings.author = (!author.is_empty()).then_some(author);
    }

    let database_url = normalize_database_url(&settings.database_url);
    let bridge = BackendBridge::start(&database_url, settings.author.as_deref())
        .context("failed to start blog backend")?;
    let app = BlogApp::new(bridge, settings.window_title.clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(settings.window_title.clone())
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        &settings.window_title,
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow::anyhow!("desktop ui exited with an error: {err}"))
}
