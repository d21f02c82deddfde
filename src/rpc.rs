use crate::types::BlockRef;
use alloy_consensus::Transaction as _;
use alloy_network::TransactionResponse as _;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::{BlockNumberOrTag, TransactionInput, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// Connection refused/reset or other failure before the node answered.
    Transport,
    Timeout,
    /// The node answered with an error (e.g. "execution reverted").
    Rpc,
}

impl fmt::Display for RpcErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RpcErrorKind::Transport => "transport error",
            RpcErrorKind::Timeout => "request timed out",
            RpcErrorKind::Rpc => "rpc error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: RpcErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: RpcErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn rpc(message: impl Into<String>) -> Self {
        Self {
            kind: RpcErrorKind::Rpc,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.kind, RpcErrorKind::Transport | RpcErrorKind::Timeout)
    }
}

impl From<TransportError> for RpcError {
    fn from(err: TransportError) -> Self {
        if err.is_transport_error() {
            RpcError::transport(err.to_string())
        } else {
            RpcError::rpc(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub nonce: u64,
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptInfo {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    /// `true` for status 1.
    pub status: bool,
    pub gas_used: u64,
    pub logs: Vec<LogEntry>,
}

/// Parameters of a call or transaction, independent of any chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxParams {
    pub from: Option<Address>,
    pub to: Address,
    pub value: Option<U256>,
    pub data: Bytes,
}

impl TxParams {
    pub fn new(to: Address, data: Bytes, value: Option<U256>) -> Self {
        Self {
            from: None,
            to,
            value,
            data,
        }
    }

    fn into_request(self) -> TransactionRequest {
        TransactionRequest {
            from: self.from,
            to: Some(self.to.into()),
            value: self.value,
            input: TransactionInput::new(self.data),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait ChainReadClient: Send + Sync {
    fn endpoint(&self) -> &str;
    async fn chain_id(&self) -> Result<u64, RpcError>;
    async fn client_version(&self) -> Result<String, RpcError>;
    async fn block_number(&self) -> Result<u64, RpcError>;
    async fn block(&self, block: BlockRef) -> Result<Option<BlockInfo>, RpcError>;
    async fn transaction(&self, hash: B256) -> Result<Option<TransactionInfo>, RpcError>;
    async fn receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, RpcError>;
    async fn balance(&self, address: Address) -> Result<U256, RpcError>;
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError>;
    async fn gas_price(&self) -> Result<u128, RpcError>;
    async fn estimate_gas(&self, params: TxParams) -> Result<u64, RpcError>;
}

/// Holds signing capability. Nonce management is the client's concern.
#[async_trait]
pub trait ChainWriteClient: Send + Sync {
    fn address(&self) -> Address;
    async fn send_transaction(&self, params: TxParams) -> Result<B256, RpcError>;
}

#[derive(Clone)]
pub struct RpcClient {
    pub url: String,
    provider: DynProvider,
    http: Client,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let parsed = parse_endpoint(url)?;
        let provider = ProviderBuilder::new().connect_http(parsed).erased();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RpcError::transport(format!("http client: {err}")))?;
        Ok(Self {
            url: url.to_string(),
            provider,
            http,
            timeout,
        })
    }

    async fn bounded<T, E, F>(&self, method: &str, request: F) -> Result<T, RpcError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<RpcError>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(RpcError::timeout(format!(
                "{method} exceeded {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl ChainReadClient for RpcClient {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.bounded("eth_chainId", async { self.provider.get_chain_id().await })
            .await
    }

    async fn client_version(&self) -> Result<String, RpcError> {
        self.bounded(
            "web3_clientVersion",
            raw_rpc::<String>(&self.http, &self.url, "web3_clientVersion", json!([])),
        )
        .await
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.bounded("eth_blockNumber", async {
            self.provider.get_block_number().await
        })
        .await
    }

    async fn block(&self, block: BlockRef) -> Result<Option<BlockInfo>, RpcError> {
        let block = match block {
            BlockRef::Number(number) => {
                self.bounded("eth_getBlockByNumber", async {
                    self.provider
                        .get_block_by_number(BlockNumberOrTag::Number(number))
                        .await
                })
                .await?
            }
            BlockRef::Hash(hash) => {
                self.bounded("eth_getBlockByHash", async {
                    self.provider.get_block_by_hash(hash).await
                })
                .await?
            }
        };
        Ok(block.map(|block| BlockInfo {
            number: block.header.number,
            hash: block.header.hash,
            parent_hash: block.header.parent_hash,
            timestamp: block.header.timestamp,
            transaction_count: block.transactions.len(),
        }))
    }

    async fn transaction(&self, hash: B256) -> Result<Option<TransactionInfo>, RpcError> {
        let tx = self
            .bounded("eth_getTransactionByHash", async {
                self.provider.get_transaction_by_hash(hash).await
            })
            .await?;
        Ok(tx.map(|tx| TransactionInfo {
            hash: tx.tx_hash(),
            from: tx.from(),
            to: tx.to(),
            value: tx.value(),
            input: tx.input().clone(),
            nonce: tx.nonce(),
            block_number: tx.block_number(),
        }))
    }

    async fn receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, RpcError> {
        let receipt = self
            .bounded("eth_getTransactionReceipt", async {
                self.provider.get_transaction_receipt(hash).await
            })
            .await?;
        Ok(receipt.map(|receipt| ReceiptInfo {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            status: receipt.status(),
            gas_used: receipt.gas_used,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| LogEntry {
                    address: log.address(),
                    topics: log.topics().to_vec(),
                    data: log.data().data.clone(),
                })
                .collect(),
        }))
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcError> {
        self.bounded("eth_getBalance", async {
            self.provider.get_balance(address).await
        })
        .await
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        let request = TxParams::new(to, data, None).into_request();
        self.bounded("eth_call", async { self.provider.call(request).await })
            .await
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.bounded("eth_gasPrice", async { self.provider.get_gas_price().await })
            .await
    }

    async fn estimate_gas(&self, params: TxParams) -> Result<u64, RpcError> {
        let request = params.into_request();
        self.bounded("eth_estimateGas", async {
            self.provider.estimate_gas(request).await
        })
        .await
    }
}

/// Submits transactions signed by a local key.
#[derive(Clone)]
pub struct SignerClient {
    address: Address,
    provider: DynProvider,
    timeout: Duration,
}

impl SignerClient {
    pub fn new(url: &str, signer: PrivateKeySigner, timeout: Duration) -> Result<Self, RpcError> {
        let parsed = parse_endpoint(url)?;
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect_http(parsed)
            .erased();
        Ok(Self {
            address,
            provider,
            timeout,
        })
    }
}

#[async_trait]
impl ChainWriteClient for SignerClient {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, params: TxParams) -> Result<B256, RpcError> {
        let mut params = params;
        params.from = Some(self.address);
        let request = params.into_request();
        let send = async { self.provider.send_transaction(request).await };
        match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            Ok(Err(err)) => Err(RpcError::from(err)),
            // The node may still have accepted it; callers must check before resubmitting.
            Err(_) => Err(RpcError::timeout(format!(
                "eth_sendTransaction exceeded {}ms, broadcast state unknown",
                self.timeout.as_millis()
            ))),
        }
    }
}

fn parse_endpoint(url: &str) -> Result<url::Url, RpcError> {
    url.trim()
        .parse::<url::Url>()
        .map_err(|err| RpcError::transport(format!("invalid rpc url {url}: {err}")))
}

#[derive(Debug, Deserialize)]
struct RawResponse<T> {
    result: Option<T>,
    error: Option<serde_json::Value>,
}

pub async fn raw_rpc<T: for<'de> Deserialize<'de>>(
    http: &Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> Result<T, RpcError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });
    let response = http
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|err| RpcError::transport(format!("{method} request failed: {err}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(RpcError::transport(format!("{method} http status {status}")));
    }
    let body: RawResponse<T> = response
        .json()
        .await
        .map_err(|err| RpcError::rpc(format!("{method} decode failed: {err}")))?;
    if let Some(error) = body.error {
        return Err(RpcError::rpc(format!("{method}: {error}")));
    }
    body.result
        .ok_or_else(|| RpcError::rpc(format!("{method}: missing result")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_and_timeouts_are_transient() {
        assert!(RpcError::transport("connection reset by peer").is_transient());
        assert!(RpcError::timeout("eth_call exceeded 30000ms").is_transient());
        assert!(!RpcError::rpc("execution reverted").is_transient());
    }

    #[test]
    fn rejects_malformed_endpoint() {
        let err = RpcClient::new("not a url", DEFAULT_REQUEST_TIMEOUT)
            .err()
            .expect("invalid url must fail");
        assert_eq!(err.kind, RpcErrorKind::Transport);
        assert!(err.message.contains("invalid rpc url"));
    }

    #[tokio::test]
    async fn client_version_gives_up_on_a_silent_endpoint() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = RpcClient::new(&url, Duration::from_millis(200)).unwrap();
        let started = std::time::Instant::now();
        let err = client.client_version().await.unwrap_err();
        assert!(err.is_transient(), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn tx_params_map_to_call_request() {
        let to = Address::repeat_byte(0x22);
        let request =
            TxParams::new(to, Bytes::from(vec![1, 2, 3]), Some(U256::from(5))).into_request();
        assert_eq!(request.to, Some(to.into()));
        assert_eq!(request.value, Some(U256::from(5)));
        assert_eq!(request.input.input().cloned(), Some(Bytes::from(vec![1, 2, 3])));
    }
}
