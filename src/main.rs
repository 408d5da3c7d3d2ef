use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use marionette::api::{self, AppState};
use marionette::decision::LlmDecisionProvider;
use marionette::providers::{GeminiProvider, LLMProvider};
use marionette::tools::ToolRuntime;
use marionette::Config;

#[derive(Parser)]
#[command(name = "marionette")]
#[command(about = "Mission control for steering teams of LLM agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => serve(port).await?,
    }

    Ok(())
}

async fn serve(port_override: Option<u16>) -> Result<()> {
    let config = Config::from_env()?;
    let port = port_override.unwrap_or(config.port);

    let llm: Arc<dyn LLMProvider> = Arc::new(GeminiProvider::new(config.gemini_api_key));
    let state = AppState::new(
        Arc::new(LlmDecisionProvider::new(llm.clone())),
        llm,
        ToolRuntime::new(),
    );

    api::serve(state, port).await
}
