use crate::rpc::ReceiptInfo;
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// The two chains the bridge connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chain {
    L1,
    L2,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::L1, Chain::L2];

    pub fn as_str(self) -> &'static str {
        match self {
            Chain::L1 => "L1",
            Chain::L2 => "L2",
        }
    }

    /// Decimal count of the chain's native currency (ETH on L1, MATIC on L2).
    pub fn native_decimals(self) -> u8 {
        match self {
            Chain::L1 => 18,
            Chain::L2 => 18,
        }
    }

    pub fn native_symbol(self) -> &'static str {
        match self {
            Chain::L1 => "ETH",
            Chain::L2 => "MATIC",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "l1" | "root" => Ok(Chain::L1),
            "l2" | "child" => Ok(Chain::L2),
            other => Err(format!("unknown chain {other} (expected l1 or l2)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    L1ToL2,
    L2ToL1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Native,
    Token,
}

/// ERC20 metadata as seen on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub chain: Chain,
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferIntent {
    pub direction: Direction,
    pub asset: AssetKind,
    pub chain: Chain,
    pub token: Option<TokenDescriptor>,
    pub recipient: Address,
    pub amount: String,
}

impl TransferIntent {
    pub fn native(direction: Direction, chain: Chain, recipient: Address, amount: &str) -> Self {
        Self {
            direction,
            asset: AssetKind::Native,
            chain,
            token: None,
            recipient,
            amount: amount.trim().to_string(),
        }
    }

    pub fn token(
        direction: Direction,
        descriptor: TokenDescriptor,
        recipient: Address,
        amount: &str,
    ) -> Self {
        Self {
            direction,
            asset: AssetKind::Token,
            chain: descriptor.chain,
            token: Some(descriptor),
            recipient,
            amount: amount.trim().to_string(),
        }
    }

    pub fn decimals(&self) -> u8 {
        self.token
            .as_ref()
            .map(|token| token.decimals)
            .unwrap_or_else(|| self.chain.native_decimals())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxPurpose {
    Approve,
    Deposit,
    Withdraw,
    Exit,
}

impl fmt::Display for TxPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TxPurpose::Approve => "approve",
            TxPurpose::Deposit => "deposit",
            TxPurpose::Withdraw => "withdraw",
            TxPurpose::Exit => "exit",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransaction {
    pub hash: B256,
    pub chain: Chain,
    pub purpose: TxPurpose,
    /// Unix seconds.
    pub submitted_at: u64,
}

impl SubmittedTransaction {
    pub fn new(hash: B256, chain: Chain, purpose: TxPurpose) -> Self {
        let submitted_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        Self {
            hash,
            chain,
            purpose,
            submitted_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeStatus {
    Pending,
    Completed,
    Failed,
}

impl BridgeStatus {
    pub fn from_receipt(receipt: Option<&ReceiptInfo>) -> Self {
        match receipt {
            None => BridgeStatus::Pending,
            Some(receipt) if receipt.status => BridgeStatus::Completed,
            Some(_) => BridgeStatus::Failed,
        }
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BridgeStatus::Pending => "PENDING",
            BridgeStatus::Completed => "COMPLETED",
            BridgeStatus::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Status of an L2 → L1 withdrawal, including its exit on L1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct L2ToL1Status {
    pub status: BridgeStatus,
    pub exit_complete: bool,
    pub exit_tx_required: bool,
    pub exit_tx: Option<B256>,
}

/// Selects a block either by height or by hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockRef {
    Number(u64),
    Hash(B256),
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Number(number) => write!(f, "#{number}"),
            BlockRef::Hash(hash) => write!(f, "{hash:#x}"),
        }
    }
}

impl FromStr for BlockRef {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.starts_with("0x") && trimmed.len() == 66 {
            return B256::from_str(trimmed)
                .map(BlockRef::Hash)
                .map_err(|err| format!("invalid block hash {trimmed}: {err}"));
        }
        trimmed
            .parse::<u64>()
            .map(BlockRef::Number)
            .map_err(|err| format!("invalid block number {trimmed}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_parses_aliases() {
        assert_eq!("l1".parse::<Chain>().unwrap(), Chain::L1);
        assert_eq!("L2".parse::<Chain>().unwrap(), Chain::L2);
        assert_eq!("child".parse::<Chain>().unwrap(), Chain::L2);
        assert!("l3".parse::<Chain>().is_err());
    }

    #[test]
    fn block_ref_accepts_height_or_hash() {
        assert_eq!("42".parse::<BlockRef>().unwrap(), BlockRef::Number(42));
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(matches!(hash.parse::<BlockRef>().unwrap(), BlockRef::Hash(_)));
        assert!("latest".parse::<BlockRef>().is_err());
    }

    #[test]
    fn status_follows_receipt() {
        let mut receipt = ReceiptInfo {
            transaction_hash: B256::ZERO,
            block_number: Some(1),
            status: true,
            gas_used: 21_000,
            logs: Vec::new(),
        };
        assert_eq!(BridgeStatus::from_receipt(None), BridgeStatus::Pending);
        assert_eq!(
            BridgeStatus::from_receipt(Some(&receipt)),
            BridgeStatus::Completed
        );
        receipt.status = false;
        assert_eq!(
            BridgeStatus::from_receipt(Some(&receipt)),
            BridgeStatus::Failed
        );
    }

    #[test]
    fn intent_uses_token_decimals() {
        let descriptor = TokenDescriptor {
            chain: Chain::L1,
            address: Address::repeat_byte(0x11),
            symbol: "USDC".to_string(),
            decimals: 6,
        };
        let intent = TransferIntent::token(Direction::L1ToL2, descriptor, Address::ZERO, " 1.5 ");
        assert_eq!(intent.decimals(), 6);
        assert_eq!(intent.amount, "1.5");
        let native = TransferIntent::native(Direction::L2ToL1, Chain::L2, Address::ZERO, "2");
        assert_eq!(native.decimals(), 18);
    }
}
