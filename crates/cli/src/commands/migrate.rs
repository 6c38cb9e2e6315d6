//! `quranlens migrate`: apply the bundled schema to the configured database.

use quranlens_store::PostgresStore;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    let Some(url) = config.database.url.as_deref() else {
        return Err("No database configured. Set DATABASE_URL or [database].url.".into());
    };

    println!("🔄 Applying schema...");
    let store = PostgresStore::connect(url, config.database.max_connections).await?;
    store.migrate().await?;
    println!("   ✅ Schema is up to date");

    Ok(())
}
