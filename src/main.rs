use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use gmail_sorter::auth;
use gmail_sorter::classifier::GeminiClassifier;
use gmail_sorter::cli::{self, Cli, Commands};
use gmail_sorter::config::Config;
use gmail_sorter::error::SorterError;
use gmail_sorter::gateway::GmailApiGateway;
use gmail_sorter::lock::RunLock;
use gmail_sorter::notify::LogNotifier;
use gmail_sorter::pipeline::Processor;
use gmail_sorter::reset::ResetCoordinator;
use gmail_sorter::store::{FileStore, StateStore};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        eprintln!("\nFor help, run: gmail-sorter --help");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Install default crypto provider for rustls
    // Multiple dependencies pull in different providers, so pick one up front
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_sorter=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_sorter=info,warn,error"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::InitConfig { output } = &cli.command {
        Config::create_example(output).await?;
        println!("Wrote example configuration to {:?}", output);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;

    let hub = auth::initialize_gmail_hub(
        Path::new(&config.general.credentials_path),
        Path::new(&config.general.token_cache_path),
    )
    .await?;
    let gateway = GmailApiGateway::new(hub);

    let state = StateStore::new(FileStore::new(&config.storage.state_path));
    let lock = RunLock::new();

    match cli.command {
        Commands::Run | Commands::Watch => {
            let api_key = std::env::var(&config.classifier.api_key_env).map_err(|_| {
                SorterError::ConfigError(format!(
                    "classifier API key not set (expected in ${})",
                    config.classifier.api_key_env
                ))
            })?;
            let classifier = GeminiClassifier::new(
                config.classifier.model.clone(),
                api_key,
                Duration::from_secs(config.classifier.timeout_secs),
            );

            let processor = Processor::new(
                gateway,
                classifier,
                state,
                LogNotifier,
                config.clone(),
                lock,
            );

            match cli.command {
                Commands::Run => {
                    cli::run_once(&processor).await?;
                }
                Commands::Watch => {
                    cli::watch(&processor, &config).await?;
                }
                _ => unreachable!(),
            }
        }
        Commands::Reset => {
            let coordinator = ResetCoordinator::new(gateway, state, config, lock);
            cli::run_reset(&coordinator).await?;
        }
        Commands::InitConfig { .. } => unreachable!(),
    }

    Ok(())
}
