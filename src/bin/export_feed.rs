use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use animal_family::backend::{self, Backend, SortOrder};
use animal_family::bridge::ThemeVars;
use animal_family::config;
use animal_family::model::{Announcement, Status};
use animal_family::view;

#[derive(Debug, Parser)]
#[command(about = "Export the published announcement feed to a static HTML file. Images render via their public storage URLs.")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output file
    #[arg(long, default_value = "feed.html")]
    out: PathBuf,

    /// Only the newest N announcements
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let client: Arc<dyn Backend> = backend::shared(&cfg)?;

    let rows = client
        .list_announcements(Status::Published, SortOrder::Descending, args.limit)
        .await
        .context("failed to fetch published announcements")?;
    let html = render_feed(&rows);

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&args.out, html)
        .await
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(count = rows.len(), out = %args.out.display(), "feed exported");
    Ok(())
}

fn render_feed(rows: &[Announcement]) -> String {
    let published: Vec<Announcement> = rows
        .iter()
        .filter(|a| a.status == Status::Published)
        .cloned()
        .collect();
    let mut body = view::header();
    if published.is_empty() {
        body.push_str("<p>Объявления не найдены.</p>");
    } else {
        body.push_str(&view::map(None, &view::map_markers(&published)));
    }
    for a in &published {
        body.push_str(&view::announcement_card(a));
    }
    view::document(&ThemeVars::default(), &body)
}
