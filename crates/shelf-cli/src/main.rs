//! Shelf - browse a record collection from the terminal.
//!
//! Loads the records file, applies the configuration and reads commands
//! from stdin until `quit` or end of input.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;

use shelf_cli::Cli;
use shelf_view::CollectionView;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let store = cli.load_store()?;
    tracing::info!("Loaded {} record(s) from {}", store.len(), cli.records.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let view = CollectionView::new(&config, Arc::new(store.clone()), Arc::new(store));
        if let Err(e) = view.refresh().await {
            tracing::error!("Initial fetch failed: {}", e);
        }

        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let result = shelf_cli::run(&view, stdin, &mut stdout).await;
        view.dispose();
        result
    })
}
