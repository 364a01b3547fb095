use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wallet_watcher::config::{SolscanConfig, env_lookup};
use wallet_watcher::http::HttpClient;
use wallet_watcher::lookup::commands::cmd_token;
use wallet_watcher::lookup::formatters::OutputFormat;
use wallet_watcher::solscan::SolscanClient;

#[derive(Parser)]
#[command(name = "lookup")]
#[command(about = "Inspect token metadata the watcher would report", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve metadata for a token mint
    Token { address: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    dotenv::dotenv().ok();
    let config = SolscanConfig::from_lookup(&env_lookup)?;
    let http = HttpClient::new(config.request_timeout, config.max_retries)?;
    let solscan = SolscanClient::new(http, &config);

    match cli.command {
        Commands::Token { address } => {
            cmd_token(&solscan, &address, &format).await?;
        }
    }

    Ok(())
}
