use std::{fmt, sync::Arc, time::Duration};

use alloy::{
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, B256},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use tracing::{debug, info, warn};

use crate::chain::ChainClient;
use crate::config::SubmissionSettings;
use crate::errors::SwapError;
use crate::types::{ReceiptStatus, SignedTransaction, SwapCall, SwapReceipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Built,
    Signed,
    Broadcast,
    Confirmed,
    Failed,
    TimedOut,
}

impl SubmissionState {
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Built, Signed)
                | (Signed, Broadcast)
                | (Broadcast, Confirmed)
                | (Broadcast, Failed)
                | (Broadcast, TimedOut)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubmissionState::Confirmed | SubmissionState::Failed | SubmissionState::TimedOut
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Built => "BUILT",
            SubmissionState::Signed => "SIGNED",
            SubmissionState::Broadcast => "BROADCAST",
            SubmissionState::Confirmed => "CONFIRMED",
            SubmissionState::Failed => "FAILED",
            SubmissionState::TimedOut => "TIMED_OUT",
        };
        f.write_str(name)
    }
}

/// Tracks one call through the submission states.
#[derive(Debug)]
struct Submission {
    state: SubmissionState,
    hash: Option<B256>,
}

impl Submission {
    fn new() -> Self {
        Self {
            state: SubmissionState::Built,
            hash: None,
        }
    }

    fn advance(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(tx = ?self.hash, "{} -> {}", self.state, next);
        self.state = next;
    }
}

/// Gas and receipt-polling parameters.
#[derive(Debug, Clone)]
pub struct SubmitterOptions {
    pub gas_limit: u64,
    pub estimate_gas: bool,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl From<&SubmissionSettings> for SubmitterOptions {
    fn from(settings: &SubmissionSettings) -> Self {
        Self {
            gas_limit: settings.gas_limit,
            estimate_gas: settings.estimate_gas,
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            max_poll_attempts: settings.max_poll_attempts,
        }
    }
}

/// Signs calls with the local key, broadcasts them and waits for a receipt.
pub struct TransactionSubmitter<C> {
    client: Arc<C>,
    wallet: EthereumWallet,
    sender: Address,
    options: SubmitterOptions,
}

impl<C: ChainClient> TransactionSubmitter<C> {
    pub fn new(client: Arc<C>, private_key: &str, options: SubmitterOptions) -> Result<Self, SwapError> {
        let signer = private_key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| SwapError::Signing(format!("unusable private key: {}", e)))?;
        let sender = signer.address();
        Ok(Self {
            client,
            wallet: EthereumWallet::from(signer),
            sender,
            options,
        })
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Runs `call` to a terminal state with the configured gas limit, or an
    /// estimate when `estimate_gas` is set.
    pub async fn submit(&self, call: &SwapCall) -> Result<SwapReceipt, SwapError> {
        self.run(call, None).await
    }

    /// Like [`submit`](Self::submit) but with an explicit fixed gas limit,
    /// used for approvals. Never estimated.
    pub async fn submit_with_gas(&self, call: &SwapCall, gas_limit: u64) -> Result<SwapReceipt, SwapError> {
        self.run(call, Some(gas_limit)).await
    }

    async fn run(&self, call: &SwapCall, gas_limit: Option<u64>) -> Result<SwapReceipt, SwapError> {
        let mut submission = Submission::new();

        let signed = self.sign(call, gas_limit).await?;
        submission.hash = Some(signed.hash);
        submission.advance(SubmissionState::Signed);

        let hash = self.broadcast(&signed).await?;
        submission.hash = Some(hash);
        submission.advance(SubmissionState::Broadcast);
        info!(
            tx = %hash,
            nonce = signed.nonce,
            gas_limit = signed.gas_limit,
            "transaction sent, waiting for receipt"
        );

        let (state, result) = match self.wait_for_receipt(hash).await {
            Some(receipt) if receipt.status == ReceiptStatus::Success => {
                info!(tx = %hash, block = ?receipt.block_number, gas_used = receipt.gas_used, "transaction confirmed");
                (SubmissionState::Confirmed, Ok(receipt))
            }
            Some(receipt) => (
                SubmissionState::Failed,
                Err(SwapError::OnChainRevert {
                    hash,
                    block_number: receipt.block_number,
                }),
            ),
            None => (
                SubmissionState::TimedOut,
                Err(SwapError::Timeout {
                    hash,
                    attempts: self.options.max_poll_attempts,
                }),
            ),
        };
        submission.advance(state);
        debug_assert!(submission.state.is_terminal());
        result
    }

    /// BUILT -> SIGNED: attach nonce, chain id and gas parameters, then sign.
    /// An explicit `gas_limit` is used as is; otherwise the configured limit
    /// or, with `estimate_gas`, the node's estimate.
    pub async fn sign(&self, call: &SwapCall, gas_limit: Option<u64>) -> Result<SignedTransaction, SwapError> {
        let nonce = self.client.transaction_count(self.sender).await?;
        let chain_id = self.client.chain_id().await?;
        let gas_price = self.client.gas_price().await?;

        let tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(call.to)
            .with_input(call.data.clone())
            .with_value(call.value)
            .with_nonce(nonce)
            .with_chain_id(chain_id)
            .with_gas_price(gas_price);

        let gas_limit = match gas_limit {
            Some(limit) => limit,
            None if self.options.estimate_gas => self
                .client
                .estimate_gas(tx.clone())
                .await
                .map_err(|e| SwapError::Submission(format!("gas estimation failed: {:#}", e)))?,
            None => self.options.gas_limit,
        };
        let tx = tx.with_gas_limit(gas_limit);

        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| SwapError::Signing(e.to_string()))?;

        Ok(SignedTransaction {
            raw: envelope.encoded_2718().into(),
            hash: *envelope.tx_hash(),
            nonce,
            gas_limit,
            gas_price,
            chain_id,
        })
    }

    /// SIGNED -> BROADCAST
    async fn broadcast(&self, signed: &SignedTransaction) -> Result<B256, SwapError> {
        let hash = self
            .client
            .send_raw_transaction(&signed.raw)
            .await
            .map_err(|e| SwapError::Submission(format!("{:#}", e)))?;
        if hash != signed.hash {
            warn!(expected = %signed.hash, returned = %hash, "node returned a different transaction hash");
        }
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: B256) -> Option<SwapReceipt> {
        for attempt in 1..=self.options.max_poll_attempts {
            match self.client.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Some(receipt),
                Ok(None) => debug!(tx = %hash, attempt, "receipt not available yet"),
                Err(e) => warn!(tx = %hash, attempt, "receipt poll failed: {:#}", e),
            }
            if attempt < self.options.max_poll_attempts {
                tokio::time::sleep(self.options.poll_interval).await;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        consensus::{Transaction, TxEnvelope},
        eips::eip2718::Decodable2718,
        primitives::{U256, address, bytes},
    };
    use anyhow::anyhow;

    use super::*;
    use crate::chain::mock::MockChainClient;

    pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn options(max_poll_attempts: u32) -> SubmitterOptions {
        SubmitterOptions {
            gas_limit: 800_000,
            estimate_gas: false,
            poll_interval: Duration::ZERO,
            max_poll_attempts,
        }
    }

    fn call() -> SwapCall {
        SwapCall {
            to: address!("0x000000000004444c5dc75cB358380D2e3dE08A90"),
            data: bytes!("f3cd914c"),
            value: U256::from(1_000u64),
        }
    }

    fn submitter(client: MockChainClient, max_poll_attempts: u32) -> (Arc<MockChainClient>, TransactionSubmitter<MockChainClient>) {
        let client = Arc::new(client);
        let submitter = TransactionSubmitter::new(client.clone(), TEST_KEY, options(max_poll_attempts)).unwrap();
        (client, submitter)
    }

    #[test]
    fn test_transitions() {
        use SubmissionState::*;
        assert!(Built.can_transition_to(Signed));
        assert!(Broadcast.can_transition_to(TimedOut));
        assert!(!Built.can_transition_to(Broadcast));
        assert!(!Signed.can_transition_to(Confirmed));
        assert!(!Failed.can_transition_to(Confirmed));
        assert!(TimedOut.is_terminal());
        assert!(!Broadcast.is_terminal());
    }

    #[test]
    fn test_rejects_bad_key() {
        let client = Arc::new(MockChainClient::new());
        let result = TransactionSubmitter::new(client.clone(), "0xnot-a-key", options(1));
        assert!(matches!(result, Err(SwapError::Signing(_))));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sign_produces_legacy_transaction() {
        let (_client, submitter) = submitter(MockChainClient::new(), 1);
        assert_eq!(
            submitter.sender(),
            address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );

        let signed = submitter.sign(&call(), None).await.unwrap();
        assert_eq!(signed.nonce, 0);
        assert_eq!(signed.chain_id, 8453);
        assert_eq!(signed.gas_limit, 800_000);

        let envelope = TxEnvelope::decode_2718(&mut &signed.raw[..]).unwrap();
        assert!(envelope.is_legacy());
        assert_eq!(*envelope.tx_hash(), signed.hash);
    }

    #[tokio::test]
    async fn test_confirmed_after_pending_polls() {
        let client = MockChainClient::new().with_receipts(vec![
            Ok(None),
            Err(anyhow!("connection reset")),
            Ok(Some(ReceiptStatus::Success)),
        ]);
        let (client, submitter) = submitter(client, 5);

        let receipt = submitter.submit(&call()).await.unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Success);
        assert_eq!(client.count("transaction_receipt"), 3);
        assert_eq!(client.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_failure() {
        let client = MockChainClient::new().with_receipts(vec![Ok(Some(ReceiptStatus::Reverted))]);
        let (_client, submitter) = submitter(client, 5);

        let err = submitter.submit(&call()).await.unwrap_err();
        assert!(matches!(
            err,
            SwapError::OnChainRevert {
                block_number: Some(100),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_not_failure() {
        let client = MockChainClient::new().with_receipts(vec![
            Ok(None),
            Err(anyhow!("rate limited")),
        ]);
        let (client, submitter) = submitter(client, 4);

        let err = submitter.submit(&call()).await.unwrap_err();
        assert!(matches!(err, SwapError::Timeout { attempts: 4, .. }));
        assert_eq!(client.count("transaction_receipt"), 4);
    }

    #[tokio::test]
    async fn test_rejected_broadcast() {
        let mut client = MockChainClient::new();
        client.reject_broadcast = Some("insufficient funds for gas * price + value".to_string());
        let (client, submitter) = submitter(client, 3);

        let err = submitter.submit(&call()).await.unwrap_err();
        assert!(matches!(err, SwapError::Submission(ref msg) if msg.contains("insufficient funds")));
        assert_eq!(client.count("transaction_receipt"), 0);
    }

    #[tokio::test]
    async fn test_estimated_gas() {
        let client = Arc::new(MockChainClient::new());
        let mut opts = options(1);
        opts.estimate_gas = true;
        let submitter = TransactionSubmitter::new(client.clone(), TEST_KEY, opts).unwrap();

        let signed = submitter.sign(&call(), None).await.unwrap();
        assert_eq!(signed.gas_limit, 210_000);
        assert_eq!(client.count("estimate_gas"), 1);
    }

    #[tokio::test]
    async fn test_explicit_gas_limit_skips_estimate() {
        let client = MockChainClient::new().with_receipts(vec![Ok(Some(ReceiptStatus::Success))]);
        let client = Arc::new(client);
        let mut opts = options(1);
        opts.estimate_gas = true;
        let submitter = TransactionSubmitter::new(client.clone(), TEST_KEY, opts).unwrap();

        submitter.submit_with_gas(&call(), 100_000).await.unwrap();
        assert_eq!(client.count("estimate_gas"), 0);

        let sent = client.sent();
        let envelope = TxEnvelope::decode_2718(&mut &sent[0][..]).unwrap();
        assert_eq!(envelope.gas_limit(), 100_000);
    }

    #[tokio::test]
    async fn test_failed_estimate_is_submission_error() {
        let mut client = MockChainClient::new();
        client.fail_estimate = true;
        let client = Arc::new(client);
        let mut opts = options(1);
        opts.estimate_gas = true;
        let submitter = TransactionSubmitter::new(client.clone(), TEST_KEY, opts).unwrap();

        let err = submitter.submit(&call()).await.unwrap_err();
        assert!(matches!(err, SwapError::Submission(_)));
        assert_eq!(client.count("send_raw_transaction"), 0);
    }
}
