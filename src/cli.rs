use std::{future::Future, path::PathBuf, sync::Arc};

use alloy::primitives::{U256, utils::parse_units};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

use crate::builder::SwapBuilder;
use crate::chain::ChainClient;
use crate::config::{Config, EnvSource};
use crate::errors::SwapError;
use crate::executors::pool_manager::PoolManagerExecutor;
use crate::types::{Executor, SwapDirection, SwapRequest};

#[derive(Parser, Debug)]
#[command(author, version, about = "Swap ETH and a token through a Uniswap V4 pool manager")]
pub struct Cli {
    /// eth-to-usdc or usdc-to-eth. Omit to start the interactive menu.
    #[arg(requires = "amount")]
    pub direction: Option<SwapDirection>,

    /// Amount of the asset being sold, in whole units (e.g. 0.1 ETH, 100 USDC).
    pub amount: Option<String>,

    /// TOML settings file.
    #[arg(short, long, env = "SWAPPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Build and print the swap call without connecting or sending.
    #[arg(long)]
    pub dry_run: bool,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Converts a decimal amount into the smallest unit of an asset with
/// `decimals` decimals. Rejects negative and zero amounts.
pub fn parse_amount(raw: &str, decimals: u8) -> Result<U256, SwapError> {
    let raw = raw.trim();
    if raw.starts_with('-') {
        return Err(SwapError::Validation(format!("amount {} must be positive", raw)));
    }
    let amount = parse_units(raw, decimals)
        .map_err(|e| SwapError::Validation(format!("invalid amount '{}': {}", raw, e)))?
        .get_absolute();
    if amount.is_zero() {
        return Err(SwapError::Validation(format!("amount {} must be positive", raw)));
    }
    Ok(amount)
}

/// Loads configuration, then connects. Nothing reaches the network unless the
/// configuration is complete. The token's decimals are read from the chain
/// once here and used for both amount parsing and balance display.
pub async fn bootstrap<C, F, Fut>(
    env: &impl EnvSource,
    settings_path: Option<&std::path::Path>,
    connect: F,
) -> Result<PoolManagerExecutor<C>, SwapError>
where
    C: ChainClient,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = anyhow::Result<C>>,
{
    let config = Config::load(env, settings_path)?;
    info!(pool_manager = %config.pool_manager, token = %config.token, "configuration loaded");
    let client = connect(config.rpc_url.to_string())
        .await
        .map_err(|e| SwapError::Chain(e.context("failed to connect to RPC endpoint")))?;
    PoolManagerExecutor::connect(&config, Arc::new(client)).await
}

/// Prints the encoded call for a request without any network access.
pub fn dry_run(config: &Config, direction: SwapDirection, amount: &str) -> Result<(), SwapError> {
    let amount = parse_amount(amount, direction.source_decimals(config.settings.token.decimals))?;
    let builder = SwapBuilder::from_config(config);
    let call = builder.build(&SwapRequest {
        direction,
        amount,
        sender: alloy::primitives::Address::ZERO,
    })?;
    println!("to:    {}", call.to);
    println!("value: {}", call.value);
    println!("data:  {}", call.data);
    Ok(())
}

/// One swap from the two-argument form.
pub async fn run_once<C: ChainClient + 'static>(
    executor: &PoolManagerExecutor<C>,
    direction: SwapDirection,
    amount: &str,
) -> Result<(), SwapError> {
    let token_decimals = executor.reporter().token_settings().decimals;
    let amount = parse_amount(amount, direction.source_decimals(token_decimals))?;
    executor.execute(executor.request(direction, amount)).await?;
    Ok(())
}

/// Interactive menu. Returns when the user exits or input ends; per-action
/// errors are printed and the menu continues.
pub async fn run_menu<C, R, W>(
    executor: &PoolManagerExecutor<C>,
    input: R,
    mut output: W,
) -> Result<(), SwapError>
where
    C: ChainClient + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let token_symbol = executor.reporter().token_settings().symbol.as_str();
    let mut lines = input.lines();
    let rule = "=".repeat(50);

    loop {
        let menu = format!(
            "\n{rule}\nV4 POOL MANAGER SWAPPER\n{rule}\n1. Display Balances\n2. Swap ETH to {token_symbol}\n3. Swap {token_symbol} to ETH\n4. Exit\n{rule}\nSelect option (1-4): "
        );
        output.write_all(menu.as_bytes()).await?;
        output.flush().await?;

        let Some(choice) = lines.next_line().await? else {
            output.write_all("\n👋 Goodbye!\n".as_bytes()).await?;
            break;
        };

        let direction = match choice.trim() {
            "1" => {
                match executor.reporter().balances().await {
                    Ok(report) => output.write_all(format!("{}\n", report).as_bytes()).await?,
                    Err(e) => output.write_all(format!("❌ Error: {}\n", e).as_bytes()).await?,
                }
                continue;
            }
            "2" => SwapDirection::EthToToken,
            "3" => SwapDirection::TokenToEth,
            "4" => {
                output.write_all("\n👋 Goodbye!\n".as_bytes()).await?;
                break;
            }
            _ => {
                output
                    .write_all("❌ Invalid option. Please select 1-4.\n".as_bytes())
                    .await?;
                continue;
            }
        };

        let asset = match direction {
            SwapDirection::EthToToken => "ETH",
            SwapDirection::TokenToEth => token_symbol,
        };
        output
            .write_all(format!("Enter {} amount to swap: ", asset).as_bytes())
            .await?;
        output.flush().await?;
        let Some(amount) = lines.next_line().await? else {
            break;
        };

        match run_once(executor, direction, &amount).await {
            Ok(()) => {}
            Err(e) => {
                error!("swap failed: {}", e);
                output.write_all(format!("❌ Error: {}\n", e).as_bytes()).await?;
            }
        }
    }

    output.flush().await?;
    Ok(())
}
