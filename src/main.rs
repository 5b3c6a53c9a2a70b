use std::{process::ExitCode, sync::Arc};

use alloy::providers::ProviderBuilder;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{Level, error, info};
use tracing_subscriber::{filter, prelude::*};
use v4swap::{
    chain::RpcChainClient,
    cli::{self, Cli},
    config::{Config, ProcessEnv},
    errors::SwapError,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Set up tracing
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = filter::Targets::new().with_target("v4swap", level);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("❌ Error: {}", e);
            if matches!(e, SwapError::Configuration(_)) {
                eprintln!("\nMake sure you have:");
                eprintln!("1. Set up your .env file with RPC_URL, PRIVATE_KEY, POOL_MANAGER_ADDRESS and TOKEN_ADDRESS");
                eprintln!("2. Have sufficient ETH for gas fees");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), SwapError> {
    if cli.dry_run {
        let config = Config::load(&ProcessEnv, cli.config.as_deref())?;
        let (Some(direction), Some(amount)) = (cli.direction, cli.amount.as_deref()) else {
            return Err(SwapError::Validation(
                "--dry-run needs a direction and an amount".to_string(),
            ));
        };
        return cli::dry_run(&config, direction, amount);
    }

    let executor = cli::bootstrap(&ProcessEnv, cli.config.as_deref(), |rpc_url| async move {
        let provider = ProviderBuilder::new().connect(&rpc_url).await?;
        Ok::<_, anyhow::Error>(RpcChainClient::new(Arc::new(provider)))
    })
    .await?;
    info!(account = %executor.sender(), "connected");

    match (cli.direction, cli.amount) {
        (Some(direction), Some(amount)) => cli::run_once(&executor, direction, &amount).await,
        _ => {
            println!("Connected to wallet: {}", executor.sender());
            cli::run_menu(
                &executor,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await
        }
    }
}
