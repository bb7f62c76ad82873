use alloy::{
    network::{EthereumWallet, ReceiptResponse},
    primitives::{Address, Bytes, TxHash},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use reqwest::Url;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{InvokeError, InvokeResult};
use crate::ethereum::utils;

/// Where a submitted transaction ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub block_number: u64,
    pub success: bool,
}

pub type ConfirmationFuture = Pin<Box<dyn Future<Output = InvokeResult<Confirmation>> + Send>>;

/// A transaction that has been accepted by the node but not yet mined.
pub struct Submitted {
    pub tx_hash: TxHash,
    confirmation: ConfirmationFuture,
}

impl Submitted {
    pub fn new(tx_hash: TxHash, confirmation: ConfirmationFuture) -> Self {
        Self {
            tx_hash,
            confirmation,
        }
    }

    pub fn with_timeout(self, limit: Option<Duration>) -> Self {
        Self {
            tx_hash: self.tx_hash,
            confirmation: Box::pin(bounded("Transaction confirmation", limit, self.confirmation)),
        }
    }

    /// Wait until the transaction is included in a block.
    pub async fn confirmed(self) -> InvokeResult<Confirmation> {
        self.confirmation.await
    }
}

impl fmt::Debug for Submitted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitted")
            .field("tx_hash", &self.tx_hash)
            .finish_non_exhaustive()
    }
}

/// The node-facing side of an invocation.
#[async_trait]
pub trait ContractBackend: Send + Sync {
    /// Address that signs transactions, if this backend can sign at all.
    fn sender(&self) -> Option<Address>;

    async fn call(&self, tx: TransactionRequest) -> InvokeResult<Bytes>;

    async fn estimate_gas(&self, tx: TransactionRequest) -> InvokeResult<u64>;

    async fn submit(&self, tx: TransactionRequest) -> InvokeResult<Submitted>;
}

/// [`ContractBackend`] over an alloy HTTP provider.
#[derive(Debug)]
pub struct RpcBackend<P> {
    provider: P,
    sender: Option<Address>,
}

/// Read-only connection; it has no signer.
pub fn connect(rpc_url: &str) -> InvokeResult<RpcBackend<RootProvider<Http<Client>>>> {
    let provider = ProviderBuilder::new().on_http(parse_rpc_url(rpc_url)?);

    Ok(RpcBackend {
        provider,
        sender: None,
    })
}

/// Connection whose transactions are filled and signed with `private_key`.
pub fn connect_with_signer(
    rpc_url: &str,
    private_key: &str,
) -> InvokeResult<RpcBackend<impl Provider<Http<Client>> + 'static>> {
    let signer = PrivateKeySigner::from_str(utils::strip_hex_prefix(private_key.trim()))
        .map_err(|e| InvokeError::InvalidKey(e.to_string()))?;

    let sender = signer.address();
    tracing::info!("Signing as {}", sender);

    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(EthereumWallet::from(signer))
        .on_http(parse_rpc_url(rpc_url)?);

    Ok(RpcBackend {
        provider,
        sender: Some(sender),
    })
}

fn parse_rpc_url(rpc_url: &str) -> InvokeResult<Url> {
    rpc_url
        .parse::<Url>()
        .map_err(|e| InvokeError::argument(format!("Invalid RPC URL '{}': {}", rpc_url, e)))
}

#[async_trait]
impl<P> ContractBackend for RpcBackend<P>
where
    P: Provider<Http<Client>> + 'static,
{
    fn sender(&self) -> Option<Address> {
        self.sender
    }

    async fn call(&self, tx: TransactionRequest) -> InvokeResult<Bytes> {
        self.provider.call(&tx).await.map_err(InvokeError::transport)
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> InvokeResult<u64> {
        self.provider
            .estimate_gas(&tx)
            .await
            .map_err(InvokeError::transport)
    }

    async fn submit(&self, tx: TransactionRequest) -> InvokeResult<Submitted> {
        if self.sender.is_none() {
            return Err(InvokeError::InvalidKey(
                "a private key is required to send transactions".to_string(),
            ));
        }

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(InvokeError::transport)?;
        let tx_hash = *pending.tx_hash();
        tracing::debug!("Transaction {} accepted by node", tx_hash);

        let confirmation = async move {
            let receipt = pending.get_receipt().await.map_err(InvokeError::transport)?;
            Ok(Confirmation {
                block_number: receipt.block_number.unwrap_or_default(),
                success: ReceiptResponse::status(&receipt),
            })
        };

        Ok(Submitted::new(tx_hash, Box::pin(confirmation)))
    }
}

/// Run `fut`, failing with [`InvokeError::Timeout`] once `limit` elapses.
pub async fn bounded<T, F>(stage: &'static str, limit: Option<Duration>, fut: F) -> InvokeResult<T>
where
    F: Future<Output = InvokeResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| InvokeError::Timeout {
                stage,
                elapsed: limit,
            })?,
        None => fut.await,
    }
}
