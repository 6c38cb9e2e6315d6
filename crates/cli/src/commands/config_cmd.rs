//! `quranlens config`: print the effective configuration.

use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    if config.provider.api_key.is_none() {
        eprintln!("   ⚠️  No chat API key set (OPENROUTER_API_KEY)");
    }
    if config.embedding.api_key.is_none() {
        eprintln!("   ⚠️  No embedding API key set (OPENAI_API_KEY)");
    }

    println!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}
