use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use ledger::{MemoryStore, MongoStore, Store, redact_uri};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file with `menus` (each holding its `foods`) and `tables`
    fixture: PathBuf,

    /// Validate and insert into an in-memory store instead of MongoDB
    #[arg(long)]
    dry_run: bool,

    #[arg(
        long,
        env = "MONGO_URL",
        hide_env_values = true,
        default_value = "mongodb://localhost:27017"
    )]
    mongo_url: String,

    #[arg(long, env = "MONGO_DB", default_value = "restaurant")]
    mongo_db: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let fixture = seed::load_fixture(&args.fixture)?;

    let store: Arc<dyn Store> = if args.dry_run {
        info!("Dry run, nothing will reach MongoDB");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            MongoStore::connect(&args.mongo_url, &args.mongo_db)
                .await
                .with_context(|| format!("Failed to connect to {}", redact_uri(&args.mongo_url)))?,
        )
    };

    let summary = seed::seed(store.as_ref(), fixture, Utc::now()).await?;
    println!("{summary}");

    Ok(())
}
