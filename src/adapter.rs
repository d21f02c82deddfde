//! Chain-bound call helpers over the shared provider.
//!
//! A reader or writer only remembers which chain it targets. The client is
//! looked up on every call, so a `reconfigure` is picked up immediately.

use crate::error::{BridgeError, Result};
use crate::provider::DualChainProvider;
use crate::types::Chain;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use std::sync::Arc;

impl DualChainProvider {
    pub fn reader(self: &Arc<Self>, chain: Chain) -> ChainReader {
        ChainReader {
            provider: Arc::clone(self),
            chain,
        }
    }

    pub fn writer(self: &Arc<Self>, chain: Chain) -> ChainWriter {
        ChainWriter {
            provider: Arc::clone(self),
            chain,
        }
    }
}

#[derive(Clone)]
pub struct ChainReader {
    provider: Arc<DualChainProvider>,
    chain: Chain,
}

impl ChainReader {
    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub async fn call_raw(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.provider.read(self.chain, to, data).await
    }

    /// Encodes `call`, runs it, and decodes the return value.
    pub async fn call<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return> {
        let raw = self.call_raw(to, Bytes::from(call.abi_encode())).await?;
        C::abi_decode_returns(&raw).map_err(|err| BridgeError::Decode {
            chain: self.chain,
            operation: C::SIGNATURE,
            reason: err.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct ChainWriter {
    provider: Arc<DualChainProvider>,
    chain: Chain,
}

impl ChainWriter {
    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn address(&self) -> Result<Address> {
        self.provider.signer_address(self.chain)
    }

    pub async fn send_raw(&self, to: Address, data: Bytes, value: Option<U256>) -> Result<B256> {
        self.provider
            .send_transaction(to, value, data, self.chain)
            .await
    }

    pub async fn send<C: SolCall>(&self, to: Address, call: &C, value: Option<U256>) -> Result<B256> {
        self.send_raw(to, Bytes::from(call.abi_encode()), value).await
    }
}
