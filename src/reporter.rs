use std::{fmt, sync::Arc};

use alloy::primitives::{Address, U256, utils::format_units};
use tracing::{info, warn};

use crate::chain::ChainClient;
use crate::config::TokenSettings;
use crate::errors::SwapError;

/// Native and token holdings of one account at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub native: U256,
    pub token: U256,
    pub token_decimals: u8,
    pub token_symbol: String,
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ETH Balance: {} ETH", format_amount(self.native, 18, 4))?;
        write!(
            f,
            "{} Balance: {} {}",
            self.token_symbol,
            format_amount(self.token, self.token_decimals, 2),
            self.token_symbol
        )
    }
}

/// Renders `value` (in units of `10^-decimals`) with `precision` fractional
/// digits, truncating.
pub fn format_amount(value: U256, decimals: u8, precision: usize) -> String {
    let Ok(full) = format_units(value, decimals) else {
        return value.to_string();
    };
    match full.split_once('.') {
        Some((whole, fraction)) if precision > 0 => {
            let mut fraction: String = fraction.chars().take(precision).collect();
            while fraction.len() < precision {
                fraction.push('0');
            }
            format!("{}.{}", whole, fraction)
        }
        Some((whole, _)) => whole.to_string(),
        None if precision > 0 => format!("{}.{}", full, "0".repeat(precision)),
        None => full,
    }
}

/// Reads `decimals()` from the token contract. The configured value is used
/// only when the call fails; a disagreement is logged and the chain wins.
pub async fn resolve_token_decimals<C: ChainClient>(client: &C, token: Address, configured: u8) -> u8 {
    match client.token_decimals(token).await {
        Ok(decimals) => {
            if decimals != configured {
                warn!(%token, on_chain = decimals, configured, "token decimals differ from settings, using on-chain value");
            }
            decimals
        }
        Err(e) => {
            warn!("decimals() failed, using configured {}: {:#}", configured, e);
            configured
        }
    }
}

pub struct Reporter<C> {
    client: Arc<C>,
    owner: Address,
    token: Address,
    token_settings: TokenSettings,
}

impl<C: ChainClient> Reporter<C> {
    pub fn new(client: Arc<C>, owner: Address, token: Address, token_settings: TokenSettings) -> Self {
        Self {
            client,
            owner,
            token,
            token_settings,
        }
    }

    pub fn token_settings(&self) -> &TokenSettings {
        &self.token_settings
    }

    pub async fn balances(&self) -> Result<BalanceReport, SwapError> {
        let native = self.client.native_balance(self.owner).await?;
        let token = self.client.token_balance(self.token, self.owner).await?;
        Ok(BalanceReport {
            native,
            token,
            token_decimals: self.token_settings.decimals,
            token_symbol: self.token_settings.symbol.clone(),
        })
    }

    /// Fetches balances and prints them under `label`.
    pub async fn print_balances(&self, label: &str) -> Result<BalanceReport, SwapError> {
        let report = self.balances().await?;
        info!(owner = %self.owner, native = %report.native, token = %report.token, "{}", label);
        println!("{}:\n{}", label, report);
        Ok(report)
    }
}
