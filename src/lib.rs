//! Client for an L1/L2 token bridge: deposits, withdrawals, exits and status checks.

pub mod abi;
pub mod adapter;
pub mod bridge;
pub mod cache;
pub mod error;
pub mod provider;
pub mod rpc;
pub mod types;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{ChainReader, ChainWriter};
pub use bridge::{
    BridgeContracts, BridgeService, BridgeSettings, ExitLedger, RetryPolicy, TransferFlow,
};
pub use error::{BridgeError, Result};
pub use provider::{ChainClients, DualChainProvider, FeeEstimate, ProviderSettings};
pub use types::{BridgeStatus, Chain, L2ToL1Status};
