use crate::rpc::RpcError;
use crate::types::{BlockRef, Chain};
use alloy_primitives::B256;
use thiserror::Error;

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("amount {amount} has more fractional digits than the token's {decimals} decimals")]
    PrecisionExceeded { amount: String, decimals: u8 },

    #[error("approval failed on {chain}{}: {reason}", tx_suffix(.tx_hash))]
    ApprovalFailed {
        chain: Chain,
        tx_hash: Option<B256>,
        reason: String,
    },

    #[error("deposit failed on {chain}{}: {reason}", tx_suffix(.tx_hash))]
    DepositFailed {
        chain: Chain,
        tx_hash: Option<B256>,
        reason: String,
    },

    #[error("withdraw failed on {chain}{}: {reason}", tx_suffix(.tx_hash))]
    WithdrawFailed {
        chain: Chain,
        tx_hash: Option<B256>,
        reason: String,
    },

    #[error("exit for burn tx {burn_tx:#x} failed: {reason}")]
    ExitProcessingFailed { burn_tx: B256, reason: String },

    #[error("transaction {hash:#x} not found on {chain}")]
    TransactionNotFound { chain: Chain, hash: B256 },

    #[error("block {block} not found on {chain}")]
    BlockNotFound { chain: Chain, block: BlockRef },

    #[error("{operation} on {chain} failed: {source}")]
    Transport {
        chain: Chain,
        operation: &'static str,
        #[source]
        source: RpcError,
    },

    #[error("no signer configured for {chain}")]
    MissingSigner { chain: Chain },

    #[error("could not decode {operation} result on {chain}: {reason}")]
    Decode {
        chain: Chain,
        operation: &'static str,
        reason: String,
    },

    #[error("invalid transfer transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("exit ledger {path}: {reason}")]
    Ledger { path: String, reason: String },
}

impl BridgeError {
    pub fn transport(chain: Chain, operation: &'static str, source: RpcError) -> Self {
        BridgeError::Transport {
            chain,
            operation,
            source,
        }
    }

    /// Input problems detected before touching the network.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidAmount { .. }
                | BridgeError::InvalidAddress { .. }
                | BridgeError::PrecisionExceeded { .. }
        )
    }

    /// Only transient transport failures may be retried, and only for reads.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Transport { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    pub fn chain(&self) -> Option<Chain> {
        match self {
            BridgeError::ApprovalFailed { chain, .. }
            | BridgeError::DepositFailed { chain, .. }
            | BridgeError::WithdrawFailed { chain, .. }
            | BridgeError::TransactionNotFound { chain, .. }
            | BridgeError::BlockNotFound { chain, .. }
            | BridgeError::Transport { chain, .. }
            | BridgeError::MissingSigner { chain }
            | BridgeError::Decode { chain, .. } => Some(*chain),
            BridgeError::ExitProcessingFailed { .. } => Some(Chain::L1),
            _ => None,
        }
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            BridgeError::ApprovalFailed { tx_hash, .. }
            | BridgeError::DepositFailed { tx_hash, .. }
            | BridgeError::WithdrawFailed { tx_hash, .. } => *tx_hash,
            BridgeError::ExitProcessingFailed { burn_tx, .. } => Some(*burn_tx),
            BridgeError::TransactionNotFound { hash, .. } => Some(*hash),
            _ => None,
        }
    }
}

fn tx_suffix(tx_hash: &Option<B256>) -> String {
    tx_hash
        .map(|hash| format!(" (tx {hash:#x})"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_transport_errors_are_retryable() {
        let err = BridgeError::transport(
            Chain::L2,
            "eth_blockNumber",
            RpcError::transport("connection reset"),
        );
        assert!(err.is_retryable());
        assert_eq!(err.chain(), Some(Chain::L2));

        let reverted = BridgeError::transport(
            Chain::L1,
            "eth_call",
            RpcError::rpc("execution reverted"),
        );
        assert!(!reverted.is_retryable());
    }

    #[test]
    fn validation_errors_are_local() {
        let err = BridgeError::InvalidAmount {
            amount: "0.0".to_string(),
            reason: "amount must be greater than zero".to_string(),
        };
        assert!(err.is_validation());
        assert!(!err.is_retryable());
        assert_eq!(err.chain(), None);
    }

    #[test]
    fn lifecycle_errors_carry_hash() {
        let hash = B256::repeat_byte(0xab);
        let err = BridgeError::ApprovalFailed {
            chain: Chain::L1,
            tx_hash: Some(hash),
            reason: "receipt status 0".to_string(),
        };
        assert_eq!(err.tx_hash(), Some(hash));
        assert!(err.to_string().contains("approval failed on L1 (tx 0xabab"));
    }
}
