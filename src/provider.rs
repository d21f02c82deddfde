use crate::abi::{balanceOfCall, decimalsCall, decode_symbol, symbolCall};
use crate::cache::{CacheKey, TtlCache};
use crate::error::{BridgeError, Result};
use crate::rpc::{
    BlockInfo, ChainReadClient, ChainWriteClient, ReceiptInfo, RpcClient, SignerClient,
    TransactionInfo, TxParams,
};
use crate::types::{BlockRef, Chain, TokenDescriptor};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// The read and write clients of one chain.
#[derive(Clone)]
pub struct ChainClients {
    pub read: Arc<dyn ChainReadClient>,
    pub write: Option<Arc<dyn ChainWriteClient>>,
}

impl ChainClients {
    pub fn read_only(read: Arc<dyn ChainReadClient>) -> Self {
        Self { read, write: None }
    }

    /// Connects over HTTP; the write client exists only when a signer is given.
    pub fn connect(url: &str, signer: Option<PrivateKeySigner>, timeout: Duration) -> Result<Self> {
        let read = RpcClient::new(url, timeout)
            .map_err(|err| BridgeError::transport(Chain::L1, "connect", err))?;
        let write = signer
            .map(|signer| SignerClient::new(url, signer, timeout))
            .transpose()
            .map_err(|err| BridgeError::transport(Chain::L1, "connect", err))?;
        Ok(Self {
            read: Arc::new(read),
            write: write.map(|client| Arc::new(client) as Arc<dyn ChainWriteClient>),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderSettings {
    pub block_cache_ttl: Duration,
    pub metadata_cache_ttl: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            block_cache_ttl: Duration::from_secs(2),
            metadata_cache_ttl: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub gas_limit: u64,
    pub gas_price: u128,
    pub total: U256,
}

/// Sole owner of the L1 and L2 clients. Holds no bridge state, only read caches.
pub struct DualChainProvider {
    l1: RwLock<ChainClients>,
    l2: RwLock<ChainClients>,
    block_heights: TtlCache<u64>,
    token_metadata: TtlCache<TokenDescriptor>,
}

impl DualChainProvider {
    pub fn new(l1: ChainClients, l2: ChainClients, settings: ProviderSettings) -> Self {
        Self {
            l1: RwLock::new(l1),
            l2: RwLock::new(l2),
            block_heights: TtlCache::new(settings.block_cache_ttl),
            token_metadata: TtlCache::new(settings.metadata_cache_ttl),
        }
    }

    /// Builds both client pairs from endpoint URLs and an optional signer.
    pub fn connect(
        l1_url: &str,
        l2_url: &str,
        signer: Option<PrivateKeySigner>,
        request_timeout: Duration,
        settings: ProviderSettings,
    ) -> Result<Self> {
        let l1 = ChainClients::connect(l1_url, signer.clone(), request_timeout)
            .map_err(|err| with_chain(err, Chain::L1))?;
        let l2 = ChainClients::connect(l2_url, signer, request_timeout)
            .map_err(|err| with_chain(err, Chain::L2))?;
        Ok(Self::new(l1, l2, settings))
    }

    fn slot(&self, chain: Chain) -> &RwLock<ChainClients> {
        match chain {
            Chain::L1 => &self.l1,
            Chain::L2 => &self.l2,
        }
    }

    pub(crate) fn read_client(&self, chain: Chain) -> Arc<dyn ChainReadClient> {
        let slot = self
            .slot(chain)
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&slot.read)
    }

    pub(crate) fn write_client(&self, chain: Chain) -> Result<Arc<dyn ChainWriteClient>> {
        let slot = self
            .slot(chain)
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.write
            .as_ref()
            .map(Arc::clone)
            .ok_or(BridgeError::MissingSigner { chain })
    }

    /// Swaps one chain's clients and forgets what was cached for it.
    pub fn reconfigure(&self, chain: Chain, clients: ChainClients) {
        let mut slot = self
            .slot(chain)
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = clients;
        drop(slot);
        self.block_heights.invalidate_chain(chain);
        self.token_metadata.invalidate_chain(chain);
        tracing::info!(%chain, "chain clients reconfigured");
    }

    pub fn endpoint(&self, chain: Chain) -> String {
        self.read_client(chain).endpoint().to_string()
    }

    pub fn signer_address(&self, chain: Chain) -> Result<Address> {
        Ok(self.write_client(chain)?.address())
    }

    pub async fn get_chain_id(&self, chain: Chain) -> Result<u64> {
        self.read_client(chain)
            .chain_id()
            .await
            .map_err(|err| BridgeError::transport(chain, "eth_chainId", err))
    }

    pub async fn get_client_version(&self, chain: Chain) -> Result<String> {
        self.read_client(chain)
            .client_version()
            .await
            .map_err(|err| BridgeError::transport(chain, "web3_clientVersion", err))
    }

    pub async fn get_block_number(&self, chain: Chain) -> Result<u64> {
        let key = CacheKey::new(chain, "eth_blockNumber", &());
        self.block_heights
            .get_or_try_insert_with(key, || async {
                self.read_client(chain)
                    .block_number()
                    .await
                    .map_err(|err| BridgeError::transport(chain, "eth_blockNumber", err))
            })
            .await
    }

    pub async fn get_block(&self, block: BlockRef, chain: Chain) -> Result<BlockInfo> {
        self.read_client(chain)
            .block(block)
            .await
            .map_err(|err| BridgeError::transport(chain, "eth_getBlock", err))?
            .ok_or(BridgeError::BlockNotFound { chain, block })
    }

    pub async fn get_transaction(&self, hash: B256, chain: Chain) -> Result<TransactionInfo> {
        self.read_client(chain)
            .transaction(hash)
            .await
            .map_err(|err| BridgeError::transport(chain, "eth_getTransactionByHash", err))?
            .ok_or(BridgeError::TransactionNotFound { chain, hash })
    }

    /// `None` means the transaction has not been mined yet.
    pub async fn get_transaction_receipt(
        &self,
        hash: B256,
        chain: Chain,
    ) -> Result<Option<ReceiptInfo>> {
        self.read_client(chain)
            .receipt(hash)
            .await
            .map_err(|err| BridgeError::transport(chain, "eth_getTransactionReceipt", err))
    }

    pub async fn get_native_balance(&self, address: Address, chain: Chain) -> Result<U256> {
        self.read_client(chain)
            .balance(address)
            .await
            .map_err(|err| BridgeError::transport(chain, "eth_getBalance", err))
    }

    pub async fn get_erc20_balance(
        &self,
        token: Address,
        holder: Address,
        chain: Chain,
    ) -> Result<U256> {
        let data = Bytes::from(balanceOfCall { account: holder }.abi_encode());
        let result = self.read(chain, token, data).await?;
        balanceOfCall::abi_decode_returns(&result).map_err(|err| BridgeError::Decode {
            chain,
            operation: balanceOfCall::SIGNATURE,
            reason: err.to_string(),
        })
    }

    /// `symbol()` and `decimals()` together; if either fails, so does the descriptor.
    pub async fn get_erc20_metadata(&self, token: Address, chain: Chain) -> Result<TokenDescriptor> {
        let key = CacheKey::new(chain, "erc20_metadata", &token);
        self.token_metadata
            .get_or_try_insert_with(key, || self.fetch_erc20_metadata(token, chain))
            .await
    }

    async fn fetch_erc20_metadata(&self, token: Address, chain: Chain) -> Result<TokenDescriptor> {
        let symbol_data = Bytes::from(symbolCall {}.abi_encode());
        let decimals_data = Bytes::from(decimalsCall {}.abi_encode());
        let (symbol_raw, decimals_raw) = tokio::try_join!(
            self.read(chain, token, symbol_data),
            self.read(chain, token, decimals_data),
        )?;

        let symbol = decode_symbol(&symbol_raw).ok_or_else(|| BridgeError::Decode {
            chain,
            operation: symbolCall::SIGNATURE,
            reason: "neither string nor bytes32".to_string(),
        })?;
        let decimals =
            decimalsCall::abi_decode_returns(&decimals_raw).map_err(|err| BridgeError::Decode {
                chain,
                operation: decimalsCall::SIGNATURE,
                reason: err.to_string(),
            })?;

        tracing::debug!(%chain, %token, %symbol, decimals, "fetched token metadata");
        Ok(TokenDescriptor {
            chain,
            address: token,
            symbol,
            decimals,
        })
    }

    pub async fn get_gas_price(&self, chain: Chain) -> Result<u128> {
        self.read_client(chain)
            .gas_price()
            .await
            .map_err(|err| BridgeError::transport(chain, "eth_gasPrice", err))
    }

    pub async fn estimate_gas(&self, params: TxParams, chain: Chain) -> Result<u64> {
        self.read_client(chain)
            .estimate_gas(params)
            .await
            .map_err(|err| BridgeError::transport(chain, "eth_estimateGas", err))
    }

    /// Gas limit and price both come from `chain`; the markets are never mixed.
    pub async fn estimate_fee(&self, params: TxParams, chain: Chain) -> Result<FeeEstimate> {
        let (gas_limit, gas_price) =
            tokio::try_join!(self.estimate_gas(params, chain), self.get_gas_price(chain))?;
        Ok(FeeEstimate {
            gas_limit,
            gas_price,
            total: U256::from(gas_limit) * U256::from(gas_price),
        })
    }

    pub async fn read(&self, chain: Chain, to: Address, data: Bytes) -> Result<Bytes> {
        self.read_client(chain)
            .call(to, data)
            .await
            .map_err(|err| BridgeError::transport(chain, "eth_call", err))
    }

    /// Submits once; retrying is never done here.
    pub async fn send_transaction(
        &self,
        to: Address,
        value: Option<U256>,
        data: Bytes,
        chain: Chain,
    ) -> Result<B256> {
        let client = self.write_client(chain)?;
        let params = TxParams {
            from: Some(client.address()),
            to,
            value,
            data,
        };
        client
            .send_transaction(params)
            .await
            .map_err(|err| BridgeError::transport(chain, "eth_sendTransaction", err))
    }
}

fn with_chain(err: BridgeError, chain: Chain) -> BridgeError {
    match err {
        BridgeError::Transport {
            operation, source, ..
        } => BridgeError::Transport {
            chain,
            operation,
            source,
        },
        other => other,
    }
}
