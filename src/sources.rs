//! Source listing for the CLI.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::VectorStore;

pub async fn run_sources(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = VectorStore::new(pool.clone(), config.storage.collection.clone());

    let sources = store.list_sources().await?;
    if sources.is_empty() {
        println!("No sources ingested yet.");
        pool.close().await;
        return Ok(());
    }

    println!("{:<10} {:<19} ORIGIN", "KIND", "INGESTED");
    for source in &sources {
        println!(
            "{:<10} {:<19} {}",
            source.kind.as_str(),
            source.ingested_at.format("%Y-%m-%d %H:%M:%S"),
            source.origin
        );
        if let Some(ref title) = source.title {
            println!("{:<10} {:<19}   title: {}", "", "", title);
        }
    }
    println!();
    println!("{} source(s), {} chunk(s)", sources.len(), store.count_chunks().await?);

    pool.close().await;
    Ok(())
}
