//! labextract — lab-report extraction server.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Variables already set in the process take precedence over .env
    let env = labextract_core::EnvSource::load();
    let config = labextract_core::LabExtractConfig::from_env(&env)?;
    let llm_config = labextract_chat::LLMConfig::from_env(&env);

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "--config" | "config" => {
                println!("{}", serde_json::to_string_pretty(&config)?);
                match llm_config.resolve_provider() {
                    Some(selection) => {
                        println!("LLM provider: {} ({})", selection.provider, selection.model)
                    }
                    None => println!("LLM provider: none configured"),
                }
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("labextract — extract lab results from PDF and image reports");
                println!();
                println!("Usage: labextract [command]");
                println!();
                println!("Commands:");
                println!("  (none)    Start the server");
                println!("  config    Print the resolved configuration");
                println!("  help      Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'labextract help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let port = config.port;
    info!(
        "Max upload {} MB, rate limit {}/min, prompts from {}",
        config.max_upload_mb,
        config.rate_limit_per_minute,
        config.prompts_dir.display()
    );

    // Build application state
    let state = Arc::new(AppState::from_config(config, llm_config)?);

    // Build router
    let app = routes::build_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("labextract server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
