//! `quranlens serve`: start the HTTP/SSE gateway.

use std::path::Path;

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("📖 QuranLens Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.provider.default_model);
    println!(
        "   Database:  {}",
        if config.database.url.is_some() { "postgres" } else { "in-memory (empty)" }
    );

    quranlens_gateway::start(config).await?;

    Ok(())
}
