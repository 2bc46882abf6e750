use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use image::GenericImageView;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use viewer_core::{ComicSession, SessionEvent, SessionOptions, SystemClock, Timeline};

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Args {
    /// Path to the TOML settings file (defaults to ./viewer.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the configured strip site base URL.
    #[arg(long)]
    base_url: Option<String>,
    /// Start at this date key (YYYY-MM-DD) instead of today.
    #[arg(long)]
    date: Option<String>,
    /// Open on whatever strip the site currently serves as latest.
    #[arg(long)]
    latest: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref());
    if let Some(base_url) = args.base_url {
        settings.base_url = config::normalize_base_url(&base_url);
    }

    let mut timeline = Timeline::new(&settings.archive_start, Arc::new(SystemClock))?;
    if let Some(date) = &args.date {
        timeline = timeline.with_current(date)?;
    }

    let session = ComicSession::new(SessionOptions {
        base_url: settings.base_url.clone(),
        strip_name: settings.strip_name.clone(),
    });

    let mut events = session.subscribe_events();
    tokio::spawn(async move {
        while let Ok(SessionEvent::StripChanged(snapshot)) = events.recv().await {
            let (width, height) = snapshot.image.dimensions();
            println!(
                "{} {} | {} [{}x{}]",
                snapshot.strip_name, snapshot.id, snapshot.title, width, height
            );
        }
    });

    info!(base_url = %settings.base_url, "viewer: starting");
    if args.latest {
        session.refresh_latest().await;
    } else {
        session.refresh(&timeline.position()).await;
    }

    println!("commands: p = previous day, n = next day, q = quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "p" | "prev" => {
                timeline.previous();
                session.refresh(&timeline.position()).await;
            }
            "n" | "next" => {
                timeline.next();
                session.refresh(&timeline.position()).await;
            }
            "q" | "quit" => break,
            "" => {}
            other => info!(command = other, "viewer: unrecognized command"),
        }
    }

    Ok(())
}
