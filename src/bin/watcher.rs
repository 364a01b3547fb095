use anyhow::{Result, bail};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wallet_watcher::attachment::ImageDirectory;
use wallet_watcher::composer::MessageComposer;
use wallet_watcher::config::Config;
use wallet_watcher::cursor::CursorStore;
use wallet_watcher::delivery::{DeliveryChannel, StdoutChannel};
use wallet_watcher::enrich::{Enricher, ExclusionSet};
use wallet_watcher::http::HttpClient;
use wallet_watcher::metadata::MetadataResolver;
use wallet_watcher::poller::ActivityPoller;
use wallet_watcher::solscan::SolscanClient;
use wallet_watcher::telegram::TelegramChannel;
use wallet_watcher::watcher::{Pipeline, Watcher};

#[derive(Parser)]
#[command(name = "watcher")]
#[command(about = "Watch Solana wallets for token transfers and post them to Telegram", long_about = None)]
struct Cli {
    /// Print messages to stdout instead of sending them to Telegram
    #[arg(long)]
    dry_run: bool,

    /// Override POLL_INTERVAL_SECS
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    info!("Starting wallet watcher");

    let mut config = Config::from_env()?;
    if let Some(secs) = cli.interval_secs {
        if secs == 0 {
            bail!("--interval-secs must be greater than 0");
        }
        config.watch.poll_interval = Duration::from_secs(secs);
    }
    info!("Configuration loaded");
    let exclusions = ExclusionSet::new(&config.notify.excluded_symbols);
    if exclusions.is_empty() {
        info!("No excluded symbols, every transfer is notified");
    } else {
        info!("{} excluded symbol(s)", exclusions.len());
    }

    let http = HttpClient::new(config.solscan.request_timeout, config.solscan.max_retries)?;
    let solscan = Arc::new(SolscanClient::new(http.clone(), &config.solscan));

    let channel: Arc<dyn DeliveryChannel> = match (&config.telegram, cli.dry_run) {
        (_, true) => {
            info!("Dry run: messages will be printed, not sent");
            Arc::new(StdoutChannel)
        }
        (Some(telegram), false) => {
            info!("Delivering to Telegram chat {}", telegram.chat_id);
            Arc::new(TelegramChannel::new(http.clone(), telegram))
        }
        (None, false) => {
            bail!("TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set (or pass --dry-run)")
        }
    };

    let resolver = Arc::new(MetadataResolver::new(
        solscan.clone(),
        config.watch.metadata_cache_ttl,
    ));
    let enricher = Enricher::new(resolver, exclusions);
    let mut composer = MessageComposer::new(&config.notify.explorer_url);
    if let Some(dir) = &config.notify.image_dir {
        let images = ImageDirectory::load(dir.clone()).await;
        composer = composer.with_attachments(Arc::new(images));
    }

    let pipeline = Pipeline {
        poller: ActivityPoller::new(solscan, config.watch.page_size),
        enricher,
        composer,
        channel,
    };
    let mut watcher = Watcher::new(
        pipeline,
        CursorStore::new(config.watch.addresses.clone()),
        config.watch.poll_interval,
        config.watch.concurrency,
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, finishing current cycle before exit");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    watcher.run(shutdown).await;
    info!("Wallet watcher stopped");

    Ok(())
}
