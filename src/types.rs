use std::{fmt, str::FromStr};

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;

use crate::errors::SwapError;

/// Executors take an action and carry it through to a terminal outcome.
#[async_trait]
pub trait Executor<A>: Send + Sync {
    type Output: Send;

    async fn execute(&self, action: A) -> Result<Self::Output, SwapError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    EthToToken,
    TokenToEth,
}

impl SwapDirection {
    /// Decimals of the asset being sold.
    pub fn source_decimals(&self, token_decimals: u8) -> u8 {
        match self {
            SwapDirection::EthToToken => 18,
            SwapDirection::TokenToEth => token_decimals,
        }
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::EthToToken => write!(f, "ETH -> token"),
            SwapDirection::TokenToEth => write!(f, "token -> ETH"),
        }
    }
}

impl FromStr for SwapDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "eth-to-token" | "eth-to-usdc" => Ok(SwapDirection::EthToToken),
            "token-to-eth" | "usdc-to-eth" => Ok(SwapDirection::TokenToEth),
            other => Err(format!(
                "unknown direction '{}' (expected eth-to-usdc or usdc-to-eth)",
                other
            )),
        }
    }
}

/// One swap, amount in the smallest unit of the asset being sold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub direction: SwapDirection,
    pub amount: U256,
    pub sender: Address,
}

/// A contract call ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// A signed transaction, immutable once produced and dropped after broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: B256,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub transaction_hash: B256,
    pub status: ReceiptStatus,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Result of a confirmed swap.
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub request: SwapRequest,
    pub receipt: SwapReceipt,
    pub approval: Option<SwapReceipt>,
}
