use alloy::primitives::B256;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("signing error: {0}")]
    Signing(String),
    #[error("transaction rejected by node: {0}")]
    Submission(String),
    #[error("transaction {hash} was included{} but reverted on-chain", block_suffix(.block_number))]
    OnChainRevert {
        hash: B256,
        block_number: Option<u64>,
    },
    #[error("transaction {hash} has no receipt after {attempts} polls, outcome unknown (it may still be pending)")]
    Timeout { hash: B256, attempts: u32 },
    #[error("chain query failed: {0:#}")]
    Chain(anyhow::Error),
    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

fn block_suffix(block_number: &Option<u64>) -> String {
    match block_number {
        Some(block) => format!(" in block {block}"),
        None => String::new(),
    }
}

impl SwapError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SwapError::Configuration(_) | SwapError::Validation(_) => 2,
            SwapError::Signing(_)
            | SwapError::Submission(_)
            | SwapError::Chain(_)
            | SwapError::Io(_) => 1,
            SwapError::OnChainRevert { .. } => 3,
            SwapError::Timeout { .. } => 4,
        }
    }
}

impl From<anyhow::Error> for SwapError {
    fn from(err: anyhow::Error) -> Self {
        SwapError::Chain(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_message_includes_block() {
        let err = SwapError::OnChainRevert {
            hash: B256::ZERO,
            block_number: Some(42),
        };
        assert!(err.to_string().contains("in block 42"));

        let err = SwapError::OnChainRevert {
            hash: B256::ZERO,
            block_number: None,
        };
        assert!(!err.to_string().contains("in block"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SwapError::Configuration("x".into()).exit_code(), 2);
        assert_eq!(SwapError::Validation("x".into()).exit_code(), 2);
        assert_eq!(SwapError::Submission("x".into()).exit_code(), 1);
        assert_eq!(
            SwapError::Timeout {
                hash: B256::ZERO,
                attempts: 3
            }
            .exit_code(),
            4
        );
    }
}
