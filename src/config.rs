use std::{fmt, fs, path::Path, str::FromStr};

use alloy::primitives::Address;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::errors::SwapError;

/// Source of configuration values, normally the process environment.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from `std::env`.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> EnvSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Immutable run configuration. Built once at startup and handed to every
/// component that needs it.
#[derive(Clone)]
pub struct Config {
    pub rpc_url: Url,
    pub private_key: String,
    pub pool_manager: Address,
    pub token: Address,
    pub settings: Settings,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("private_key", &"<redacted>")
            .field("pool_manager", &self.pool_manager)
            .field("token", &self.token)
            .field("settings", &self.settings)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub pool: PoolSettings,
    pub token: TokenSettings,
    pub submission: SubmissionSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PoolSettings {
    pub fee: u32,
    pub tick_spacing: i32,
    pub hooks: Address,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            fee: 3000,
            tick_spacing: 60,
            hooks: Address::ZERO,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TokenSettings {
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            symbol: "USDC".to_string(),
            decimals: 6,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SubmissionSettings {
    pub gas_limit: u64,
    pub estimate_gas: bool,
    pub approve_gas_limit: u64,
    pub approve_before_swap: bool,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            gas_limit: 800_000,
            estimate_gas: false,
            approve_gas_limit: 100_000,
            approve_before_swap: true,
            poll_interval_ms: 2_000,
            max_poll_attempts: 150,
        }
    }
}

impl Settings {
    pub fn load(path: &Path, env: &impl EnvSource) -> Result<Self, SwapError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SwapError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;

        // Simple env var substitution: replace ${VAR} with env value
        let content = substitute_env_vars(&content, env)?;

        let settings: Settings = toml::from_str(&content)
            .map_err(|e| SwapError::Configuration(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SwapError> {
        if self.pool.fee > 1_000_000 {
            return Err(SwapError::Configuration(format!(
                "pool.fee {} exceeds 1000000",
                self.pool.fee
            )));
        }
        if !(1..=32767).contains(&self.pool.tick_spacing) {
            return Err(SwapError::Configuration(format!(
                "pool.tick_spacing {} must be within 1..=32767",
                self.pool.tick_spacing
            )));
        }
        if self.submission.max_poll_attempts == 0 {
            return Err(SwapError::Configuration(
                "submission.max_poll_attempts must be > 0".to_string(),
            ));
        }
        if self.submission.gas_limit == 0 || self.submission.approve_gas_limit == 0 {
            return Err(SwapError::Configuration(
                "gas limits must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn substitute_env_vars(content: &str, env: &impl EnvSource) -> Result<String, SwapError> {
    let mut result = content.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = env.get(var_name).ok_or_else(|| {
                SwapError::Configuration(format!(
                    "environment variable {} not found (check your .env file)",
                    var_name
                ))
            })?;
            result.replace_range(start..start + end + 1, &value);
        } else {
            break;
        }
    }
    Ok(result)
}

impl Config {
    /// Collects the required values from `env`. `settings_path` overrides the
    /// `SWAPPER_CONFIG` variable; with neither, default settings are used.
    pub fn load(env: &impl EnvSource, settings_path: Option<&Path>) -> Result<Self, SwapError> {
        let rpc_url = collect_required(env, "RPC_URL")?;
        let rpc_url = Url::parse(&rpc_url)
            .map_err(|e| SwapError::Configuration(format!("RPC_URL is not a valid URL: {}", e)))?;

        let private_key = collect_required(env, "PRIVATE_KEY")?;

        let pool_manager = parse_address(
            "POOL_MANAGER_ADDRESS",
            &collect_required(env, "POOL_MANAGER_ADDRESS")?,
        )?;

        let token_raw = match collect_optional(env, "TOKEN_ADDRESS") {
            Some(value) => value,
            None => collect_required(env, "USDC_ADDRESS")
                .map_err(|_| missing("TOKEN_ADDRESS (or USDC_ADDRESS)"))?,
        };
        let token = parse_address("TOKEN_ADDRESS", &token_raw)?;

        let settings = match settings_path
            .map(Path::to_path_buf)
            .or_else(|| collect_optional(env, "SWAPPER_CONFIG").map(Into::into))
        {
            Some(path) => Settings::load(&path, env)?,
            None => Settings::default(),
        };

        Ok(Self {
            rpc_url,
            private_key,
            pool_manager,
            token,
            settings,
        })
    }
}

/// Parses a 20-byte hex address. Mixed-case input must carry a valid EIP-55
/// checksum; single-case input has no checksum to verify.
pub fn parse_address(key: &str, raw: &str) -> Result<Address, SwapError> {
    let raw = raw.trim();
    let address = Address::from_str(raw)
        .map_err(|e| SwapError::Configuration(format!("{} is not a valid address: {}", key, e)))?;

    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum(None) != format!("0x{}", digits) {
        return Err(SwapError::Validation(format!(
            "{} has an invalid checksum (expected {})",
            key,
            address.to_checksum(None)
        )));
    }

    Ok(address)
}

fn missing(key: &str) -> SwapError {
    SwapError::Configuration(format!("required environment variable {} not set", key))
}

fn collect_required(env: &impl EnvSource, key: &str) -> Result<String, SwapError> {
    match env.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(missing(key)),
    }
}

fn collect_optional(env: &impl EnvSource, key: &str) -> Option<String> {
    match env.get(key) {
        Some(value) if !value.trim().is_empty() => Some(value),
        _ => {
            debug!("environment variable {} not set but it wasn't required", key);
            None
        }
    }
}
