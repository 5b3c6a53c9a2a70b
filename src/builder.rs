//! Encodes pool manager `swap` calls.
//!
//! Native ETH is `address(0)` in a V4 pool key and therefore always
//! `currency0`; the configured token is `currency1`. Swaps are exact-input,
//! which the pool manager expresses as a negative `amountSpecified`.

use alloy::{
    primitives::{
        Address, Bytes, I256, U256,
        aliases::{I24, U24, U160},
        uint,
    },
    sol_types::SolCall,
};

use crate::config::{Config, PoolSettings};
use crate::contracts::IPoolManager::{self, PoolKey, SwapParams};
use crate::errors::SwapError;
use crate::types::{SwapCall, SwapDirection, SwapRequest};

/// `TickMath.MIN_SQRT_PRICE + 1`
pub const MIN_SQRT_PRICE_LIMIT: U160 = uint!(4295128740_U160);
/// `TickMath.MAX_SQRT_PRICE - 1`
pub const MAX_SQRT_PRICE_LIMIT: U160 =
    uint!(1461446703485210103287273052203988822378723970341_U160);

/// How the target pool is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolSelector {
    /// Only the pool parameters are given; the currencies come from the swap
    /// direction and the pool manager resolves the pool from the full key.
    Pair {
        fee: u32,
        tick_spacing: i32,
        hooks: Address,
    },
    /// A complete pool key, used verbatim.
    Key(PoolKey),
}

impl From<&PoolSettings> for PoolSelector {
    fn from(settings: &PoolSettings) -> Self {
        PoolSelector::Pair {
            fee: settings.fee,
            tick_spacing: settings.tick_spacing,
            hooks: settings.hooks,
        }
    }
}

pub struct SwapBuilder {
    pool_manager: Address,
    token: Address,
    pool: PoolSelector,
}

impl SwapBuilder {
    pub fn new(pool_manager: Address, token: Address, pool: PoolSelector) -> Self {
        Self {
            pool_manager,
            token,
            pool,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.pool_manager,
            config.token,
            PoolSelector::from(&config.settings.pool),
        )
    }

    pub fn pool_manager(&self) -> Address {
        self.pool_manager
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn pool_key(&self) -> Result<PoolKey, SwapError> {
        match &self.pool {
            PoolSelector::Key(key) => Ok(key.clone()),
            PoolSelector::Pair {
                fee,
                tick_spacing,
                hooks,
            } => {
                let tick_spacing = I24::try_from(*tick_spacing).map_err(|_| {
                    SwapError::Validation(format!("tick spacing {} does not fit int24", tick_spacing))
                })?;
                Ok(PoolKey {
                    currency0: Address::ZERO,
                    currency1: self.token,
                    fee: U24::from(*fee),
                    tickSpacing: tick_spacing,
                    hooks: *hooks,
                })
            }
        }
    }

    /// Validates the request and encodes the call. Touches no network.
    pub fn build(&self, request: &SwapRequest) -> Result<SwapCall, SwapError> {
        if request.amount.is_zero() {
            return Err(SwapError::Validation("amount must be greater than zero".to_string()));
        }
        let amount = I256::try_from(request.amount).map_err(|_| {
            SwapError::Validation(format!("amount {} exceeds int256", request.amount))
        })?;

        let zero_for_one = request.direction == SwapDirection::EthToToken;
        let params = SwapParams {
            zeroForOne: zero_for_one,
            amountSpecified: -amount,
            sqrtPriceLimitX96: if zero_for_one {
                MIN_SQRT_PRICE_LIMIT
            } else {
                MAX_SQRT_PRICE_LIMIT
            },
        };

        let call = IPoolManager::swapCall {
            key: self.pool_key()?,
            params,
            hookData: Bytes::new(),
        };

        Ok(SwapCall {
            to: self.pool_manager,
            data: call.abi_encode().into(),
            value: if zero_for_one { request.amount } else { U256::ZERO },
        })
    }
}

/// Arguments recovered from an encoded swap call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSwap {
    pub direction: SwapDirection,
    pub amount: U256,
    pub key: PoolKey,
}

impl SwapCall {
    pub fn decode(&self) -> Result<DecodedSwap, SwapError> {
        let call = IPoolManager::swapCall::abi_decode(&self.data)
            .map_err(|e| SwapError::Validation(format!("not a pool manager swap call: {}", e)))?;
        let direction = if call.params.zeroForOne {
            SwapDirection::EthToToken
        } else {
            SwapDirection::TokenToEth
        };
        Ok(DecodedSwap {
            direction,
            amount: call.params.amountSpecified.unsigned_abs(),
            key: call.key,
        })
    }
}
