mod ai;
mod app;
mod config;
mod db;
mod domain;
mod host;
mod infrastructure;
mod keywords;
mod lists;
mod relevance;
mod tasks;
mod web_content;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config.logging, &paths)?;

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::FocusFilterApp::initialize(config, paths, shutdown.clone()).await?;
    app.run().await?;

    // the stdin reader sits on a blocking thread that a runtime drop would wait for
    std::process::exit(0);
}
