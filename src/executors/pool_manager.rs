use std::sync::Arc;

use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use async_trait::async_trait;
use tracing::info;

use crate::builder::SwapBuilder;
use crate::chain::ChainClient;
use crate::config::Config;
use crate::contracts::IERC20;
use crate::errors::SwapError;
use crate::reporter::{Reporter, resolve_token_decimals};
use crate::submitter::{SubmitterOptions, TransactionSubmitter};
use crate::types::{Executor, SwapCall, SwapDirection, SwapOutcome, SwapReceipt, SwapRequest};

/// Executes single swaps against the pool manager: build, approve if needed,
/// submit, report.
pub struct PoolManagerExecutor<C> {
    client: Arc<C>,
    builder: SwapBuilder,
    submitter: TransactionSubmitter<C>,
    reporter: Reporter<C>,
    approve_before_swap: bool,
    approve_gas_limit: u64,
}

impl<C: ChainClient> PoolManagerExecutor<C> {
    pub fn new(config: &Config, client: Arc<C>) -> Result<Self, SwapError> {
        let submission = &config.settings.submission;
        let submitter = TransactionSubmitter::new(
            client.clone(),
            &config.private_key,
            SubmitterOptions::from(submission),
        )?;
        let reporter = Reporter::new(
            client.clone(),
            submitter.sender(),
            config.token,
            config.settings.token.clone(),
        );
        Ok(Self {
            client,
            builder: SwapBuilder::from_config(config),
            submitter,
            reporter,
            approve_before_swap: submission.approve_before_swap,
            approve_gas_limit: submission.approve_gas_limit,
        })
    }

    /// Like [`new`](Self::new), but the token's decimals are read from the
    /// chain first so amount parsing and balance display use the same value.
    pub async fn connect(config: &Config, client: Arc<C>) -> Result<Self, SwapError> {
        let mut config = config.clone();
        config.settings.token.decimals =
            resolve_token_decimals(&*client, config.token, config.settings.token.decimals).await;
        Self::new(&config, client)
    }

    pub fn sender(&self) -> Address {
        self.submitter.sender()
    }

    pub fn reporter(&self) -> &Reporter<C> {
        &self.reporter
    }

    /// A request for `amount` from this executor's account.
    pub fn request(&self, direction: SwapDirection, amount: U256) -> SwapRequest {
        SwapRequest {
            direction,
            amount,
            sender: self.sender(),
        }
    }

    /// Approves the pool manager for `amount` of the token when the current
    /// allowance does not cover it.
    async fn ensure_allowance(&self, amount: U256) -> Result<Option<SwapReceipt>, SwapError> {
        let spender = self.builder.pool_manager();
        let token = self.builder.token();
        let allowance = self
            .client
            .token_allowance(token, self.sender(), spender)
            .await?;
        if allowance >= amount {
            info!(%allowance, %amount, "allowance sufficient, skipping approval");
            return Ok(None);
        }

        info!(%token, %spender, %amount, "approving token spend");
        let call = SwapCall {
            to: token,
            data: IERC20::approveCall {
                spender,
                value: amount,
            }
            .abi_encode()
            .into(),
            value: U256::ZERO,
        };
        let receipt = self
            .submitter
            .submit_with_gas(&call, self.approve_gas_limit)
            .await?;
        Ok(Some(receipt))
    }
}

#[async_trait]
impl<C: ChainClient + 'static> Executor<SwapRequest> for PoolManagerExecutor<C> {
    type Output = SwapOutcome;

    async fn execute(&self, request: SwapRequest) -> Result<SwapOutcome, SwapError> {
        // validate and encode before touching the network
        let call = self.builder.build(&request)?;
        info!(direction = %request.direction, amount = %request.amount, to = %call.to, "swap built");

        self.reporter.print_balances("Balances before swap").await?;

        let approval = if request.direction == SwapDirection::TokenToEth && self.approve_before_swap {
            self.ensure_allowance(request.amount).await?
        } else {
            None
        };

        let receipt = self.submitter.submit(&call).await?;
        println!(
            "✅ Swap completed! Transaction: {} (block {})",
            receipt.transaction_hash,
            receipt
                .block_number
                .map_or_else(|| "unknown".to_string(), |b| b.to_string())
        );

        self.reporter.print_balances("Balances after swap").await?;

        Ok(SwapOutcome {
            request,
            receipt,
            approval,
        })
    }
}
