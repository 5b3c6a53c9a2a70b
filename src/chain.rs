use std::sync::Arc;

use alloy::{
    primitives::{Address, B256, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
};
use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::contracts::IERC20;
use crate::types::{ReceiptStatus, SwapReceipt};

/// The node-facing operations the swapper needs. Everything here is a single
/// request/response round trip.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn native_balance(&self, owner: Address) -> Result<U256>;

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256>;

    async fn token_allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    async fn token_decimals(&self, token: Address) -> Result<u8>;

    /// Pending transaction count, used as the next nonce.
    async fn transaction_count(&self, owner: Address) -> Result<u64>;

    async fn gas_price(&self) -> Result<u128>;

    async fn chain_id(&self) -> Result<u64>;

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256>;

    /// `None` while the transaction is not yet included.
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<SwapReceipt>>;
}

/// [`ChainClient`] backed by an alloy provider.
pub struct RpcChainClient<P> {
    provider: Arc<P>,
}

impl<P> RpcChainClient<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P> ChainClient for RpcChainClient<P>
where
    P: Provider + 'static,
{
    async fn native_balance(&self, owner: Address) -> Result<U256> {
        self.provider
            .get_balance(owner)
            .await
            .with_context(|| format!("eth_getBalance for {owner}"))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        IERC20::new(token, &*self.provider)
            .balanceOf(owner)
            .call()
            .await
            .with_context(|| format!("balanceOf({owner}) on {token}"))
    }

    async fn token_allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        IERC20::new(token, &*self.provider)
            .allowance(owner, spender)
            .call()
            .await
            .with_context(|| format!("allowance({owner}, {spender}) on {token}"))
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        IERC20::new(token, &*self.provider)
            .decimals()
            .call()
            .await
            .with_context(|| format!("decimals() on {token}"))
    }

    async fn transaction_count(&self, owner: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(owner)
            .pending()
            .await
            .with_context(|| format!("eth_getTransactionCount for {owner}"))
    }

    async fn gas_price(&self) -> Result<u128> {
        self.provider.get_gas_price().await.context("eth_gasPrice")
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider.get_chain_id().await.context("eth_chainId")
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        self.provider.estimate_gas(tx).await.context("eth_estimateGas")
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .context("eth_sendRawTransaction")?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<SwapReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .with_context(|| format!("eth_getTransactionReceipt for {hash}"))?;

        Ok(receipt.map(|receipt| SwapReceipt {
            transaction_hash: receipt.transaction_hash,
            status: if receipt.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Reverted
            },
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        }))
    }
}

#[cfg(test)]
pub mod mock {
    use std::{
        collections::{HashMap, VecDeque},
        sync::Mutex,
    };

    use alloy::primitives::keccak256;
    use anyhow::anyhow;

    use super::*;

    /// Scripted in-memory chain. Records every call so tests can assert on
    /// what reached the "network".
    #[derive(Default)]
    pub struct MockChainClient {
        pub native_balance: U256,
        pub token_balance: U256,
        pub allowance: U256,
        pub decimals: u8,
        pub reject_broadcast: Option<String>,
        pub fail_estimate: bool,
        pub fail_decimals: bool,
        receipts: Mutex<VecDeque<Result<Option<ReceiptStatus>>>>,
        calls: Mutex<Vec<String>>,
        sent: Mutex<Vec<Vec<u8>>>,
        nonces: Mutex<HashMap<Address, u64>>,
    }

    impl MockChainClient {
        pub fn new() -> Self {
            Self {
                decimals: 6,
                ..Default::default()
            }
        }

        /// Queue the results of successive receipt polls, oldest first. Once
        /// the queue is drained every poll reports "pending".
        pub fn with_receipts(self, receipts: Vec<Result<Option<ReceiptStatus>>>) -> Self {
            *self.receipts.lock().unwrap() = receipts.into();
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, name: &str) -> usize {
            self.calls().iter().filter(|c| c.as_str() == name).count()
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }

        fn record(&self, name: &str) {
            self.calls.lock().unwrap().push(name.to_string());
        }
    }

    #[async_trait]
    impl ChainClient for MockChainClient {
        async fn native_balance(&self, _owner: Address) -> Result<U256> {
            self.record("native_balance");
            Ok(self.native_balance)
        }

        async fn token_balance(&self, _token: Address, _owner: Address) -> Result<U256> {
            self.record("token_balance");
            Ok(self.token_balance)
        }

        async fn token_allowance(&self, _token: Address, _owner: Address, _spender: Address) -> Result<U256> {
            self.record("token_allowance");
            Ok(self.allowance)
        }

        async fn token_decimals(&self, _token: Address) -> Result<u8> {
            self.record("token_decimals");
            if self.fail_decimals {
                return Err(anyhow!("execution reverted"));
            }
            Ok(self.decimals)
        }

        async fn transaction_count(&self, owner: Address) -> Result<u64> {
            self.record("transaction_count");
            let mut nonces = self.nonces.lock().unwrap();
            let nonce = nonces.entry(owner).or_default();
            let current = *nonce;
            *nonce += 1;
            Ok(current)
        }

        async fn gas_price(&self) -> Result<u128> {
            self.record("gas_price");
            Ok(1_000_000_000)
        }

        async fn chain_id(&self) -> Result<u64> {
            self.record("chain_id");
            Ok(8453)
        }

        async fn estimate_gas(&self, _tx: TransactionRequest) -> Result<u64> {
            self.record("estimate_gas");
            if self.fail_estimate {
                return Err(anyhow!("execution reverted"));
            }
            Ok(210_000)
        }

        async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
            self.record("send_raw_transaction");
            if let Some(reason) = &self.reject_broadcast {
                return Err(anyhow!("{}", reason));
            }
            self.sent.lock().unwrap().push(raw.to_vec());
            Ok(keccak256(raw))
        }

        async fn transaction_receipt(&self, hash: B256) -> Result<Option<SwapReceipt>> {
            self.record("transaction_receipt");
            let next = self.receipts.lock().unwrap().pop_front().unwrap_or(Ok(None));
            Ok(next?.map(|status| SwapReceipt {
                transaction_hash: hash,
                status,
                block_number: Some(100),
                gas_used: 150_000,
            }))
        }
    }
}
