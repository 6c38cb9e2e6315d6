//! `quranlens ask`: run the agent once, streaming the answer to stdout.

use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use quranlens_agent::{AgentEvent, RunInput};

pub async fn run(
    config_path: Option<&Path>,
    prompt: String,
    model: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    if config.provider.api_key.is_none() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set OPENROUTER_API_KEY, or add it to your config file:");
        eprintln!("    {}", quranlens_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let state = quranlens_gateway::build_state(&config).await?;

    let mut input = RunInput::new(prompt);
    if let Some(model) = model {
        input = input.with_model(model);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut events = state.agent.run_stream(input, cancel);
    let mut stdout = std::io::stdout();

    while let Some(event) = events.recv().await {
        match event {
            AgentEvent::Chunk { content } => {
                print!("{content}");
                stdout.flush()?;
            }
            AgentEvent::ToolCall { data } => {
                tracing::debug!(tool = %data.tool, arguments = %data.arguments, "Tool call");
            }
            AgentEvent::Done { usage, .. } => {
                println!();
                eprintln!(
                    "  [{} prompt + {} completion = {} tokens]",
                    usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                );
                return Ok(());
            }
            AgentEvent::Error { error } => {
                println!();
                return Err(error.into());
            }
        }
    }

    println!();
    eprintln!("  Cancelled.");
    Ok(())
}
