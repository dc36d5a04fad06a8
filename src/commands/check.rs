use anyhow::{Context, Result};

use chargehub::config::Config;
use chargehub::storage::{DocumentStore, MongoStore};

/// Connect to the configured database and print a summary of its contents
pub async fn check(
    mut config: Config,
    mongo_uri: Option<String>,
    database: Option<String>,
) -> Result<()> {
    if let Some(uri) = mongo_uri {
        config.database.uri = uri;
    }
    if let Some(name) = database {
        config.database.name = name;
    }

    config.validate().context("Invalid configuration")?;

    println!("Checking document store");
    println!("=======================");
    println!("  Database: {}", config.database.name);
    println!();

    let store = MongoStore::connect(&config.database)
        .await
        .context("Failed to connect to MongoDB")?;
    println!("Connection: ok");

    let counts = store
        .collection_counts()
        .await
        .context("Failed to count documents")?;
    println!();
    println!("Collections:");
    for (name, count) in counts {
        println!("  {name:<10} {count} documents");
    }

    let stats = store.find_stats().await.context("Failed to read stats")?;
    println!();
    match stats {
        Some(stats) => println!(
            "Stats: {}",
            serde_json::to_string_pretty(&stats).context("Failed to render stats")?
        ),
        None => println!("Stats: none recorded yet"),
    }

    Ok(())
}
