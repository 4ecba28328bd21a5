//! On-chain arbitrator gateway
//!
//! Reads voter receipts from the dispute arbitrator contract and submits
//! reveal transactions. One gateway is bound to one signing account on one
//! chain; the account's nonce sequence is the resource the reveal worker
//! serializes on.

use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::infra::retry::{Retry, RetryConfig};
use crate::infra::traits::{ArbitratorGateway, RevealRequest, VoteReceipt};
use crate::infra::{Result, RevealerError};

// Generate contract bindings
sol! {
    #[sol(rpc)]
    interface IDisputeArbitrator {
        function revealVote(
            uint256 disputeId,
            address voter,
            uint256 choice,
            string reason,
            bytes32 salt
        ) external;

        function voteReceipt(uint256 disputeId, address voter) external view returns (bool);
    }
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// RPC URL for the chain hosting the arbitrator contracts
    pub rpc_url: String,
    /// Private key of the revealing account
    pub private_key: String,
    /// Chain ID
    pub chain_id: u64,
    /// Receipt poll interval while waiting for confirmation
    pub confirm_poll_ms: u64,
    /// Give up waiting for confirmation after this long
    pub confirm_timeout_secs: u64,
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Option<Self> {
        let rpc_url = std::env::var("REVEALER_RPC_URL").ok()?;
        let private_key = std::env::var("REVEALER_PRIVATE_KEY").ok()?;
        let chain_id = std::env::var("CHAIN_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        let confirm_poll_ms = std::env::var("REVEAL_CONFIRM_POLL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2_000);
        let confirm_timeout_secs = std::env::var("REVEAL_CONFIRM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(180);

        Some(Self {
            rpc_url,
            private_key,
            chain_id,
            confirm_poll_ms,
            confirm_timeout_secs,
        })
    }
}

/// Arbitrator gateway over an EVM JSON-RPC endpoint
pub struct EvmArbitratorGateway {
    config: GatewayConfig,
    signer: PrivateKeySigner,
    retry: Retry,
}

impl EvmArbitratorGateway {
    /// Create a new gateway; fails if the private key is malformed.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|e| RevealerError::Configuration(format!("invalid private key: {e}")))?;

        Ok(Self {
            config,
            signer,
            retry: Retry::new(RetryConfig::blockchain()),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Address of the bound signing account
    pub fn account(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl ArbitratorGateway for EvmArbitratorGateway {
    async fn read_receipt(
        &self,
        arbitrator: Address,
        dispute_id: u64,
        voter: Address,
    ) -> Result<VoteReceipt> {
        self.retry
            .run(|| async {
                let provider = ProviderBuilder::new().on_http(
                    self.config
                        .rpc_url
                        .parse()
                        .map_err(|e| RevealerError::Configuration(format!("invalid RPC URL: {e}")))?,
                );

                let contract = IDisputeArbitrator::new(arbitrator, &provider);
                let result = contract
                    .voteReceipt(U256::from(dispute_id), voter)
                    .call()
                    .await
                    .map_err(|e| RevealerError::Ledger(format!("voteReceipt call failed: {e}")))?;

                Ok(VoteReceipt {
                    has_revealed: result._0,
                })
            })
            .await
            .into_result()
    }

    async fn transaction_count(&self) -> Result<u64> {
        let account = self.signer.address();

        self.retry
            .run(|| async {
                let provider = ProviderBuilder::new().on_http(
                    self.config
                        .rpc_url
                        .parse()
                        .map_err(|e| RevealerError::Configuration(format!("invalid RPC URL: {e}")))?,
                );

                provider
                    .get_transaction_count(account)
                    .await
                    .map_err(|e| {
                        RevealerError::Ledger(format!("get_transaction_count failed: {e}"))
                    })
            })
            .await
            .into_result()
    }

    async fn submit_reveal(
        &self,
        arbitrator: Address,
        request: RevealRequest,
        nonce: u64,
    ) -> Result<B256> {
        // No retry on this path: a resubmission after an ambiguous failure
        // could consume a second nonce for the same vote.
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .on_http(
                self.config
                    .rpc_url
                    .parse()
                    .map_err(|e| RevealerError::Configuration(format!("invalid RPC URL: {e}")))?,
            );

        let contract = IDisputeArbitrator::new(arbitrator, &provider);

        let tx = contract
            .revealVote(
                U256::from(request.dispute_id),
                request.voter,
                U256::from(request.choice.as_u8()),
                request.reason.clone(),
                request.salt,
            )
            .nonce(nonce);

        let pending = tx
            .send()
            .await
            .map_err(|e| RevealerError::Ledger(format!("failed to send reveal: {e}")))?;

        let tx_hash = *pending.tx_hash();
        info!(
            "Reveal transaction sent: {tx_hash} (dispute {}, voter {}, nonce {nonce})",
            request.dispute_id, request.voter
        );

        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: B256) -> Result<()> {
        let provider = ProviderBuilder::new().on_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| RevealerError::Configuration(format!("invalid RPC URL: {e}")))?,
        );

        let poll = Duration::from_millis(self.config.confirm_poll_ms);
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.confirm_timeout_secs);

        loop {
            match provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if !receipt.status() {
                        return Err(RevealerError::TxReverted { tx_hash });
                    }
                    info!(
                        "Transaction {tx_hash} confirmed in block {}",
                        receipt.block_number.unwrap_or(0)
                    );
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => {
                    // Transient RPC failures are tolerated until the deadline.
                    debug!("Receipt poll for {tx_hash} failed: {e}");
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(RevealerError::ConfirmationTimeout { tx_hash });
            }

            tokio::time::sleep(poll).await;
        }
    }
}
