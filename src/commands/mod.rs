pub mod balance;
pub mod block;
pub mod deposit;
pub mod doctor;
pub mod exit;
pub mod status;
pub mod token;
pub mod withdraw;

use crate::config::Config;
use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{anyhow, Context, Result};
use dual_bridge::bridge::{BridgeService, ExitLedger, ProofApiClient, TransferFlow};
use dual_bridge::provider::{DualChainProvider, FeeEstimate};
use dual_bridge::types::Chain;
use dual_bridge::units::format_units;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

/// RPC URLs given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RpcFlags {
    pub l1: Option<String>,
    pub l2: Option<String>,
}

impl RpcFlags {
    pub fn get(&self, chain: Chain) -> Option<&str> {
        match chain {
            Chain::L1 => self.l1.as_deref(),
            Chain::L2 => self.l2.as_deref(),
        }
    }
}

/// A connected bridge service plus the config it came from.
pub struct Session {
    pub service: BridgeService,
    expected_chain_ids: [Option<u64>; 2],
}

impl Session {
    pub fn open(config: &Config, rpc: &RpcFlags, signer: Option<PrivateKeySigner>) -> Result<Self> {
        let l1 = config.resolve_rpc(Chain::L1, rpc.get(Chain::L1))?;
        let l2 = config.resolve_rpc(Chain::L2, rpc.get(Chain::L2))?;
        tracing::debug!(
            l1 = %l1.redacted(),
            l2 = %l2.redacted(),
            signer = signer.is_some(),
            "opening session"
        );

        let provider = DualChainProvider::connect(
            &l1.url,
            &l2.url,
            signer,
            config.request_timeout(),
            config.provider_settings(),
        )?;
        let exit_source = ProofApiClient::new(&config.proof_api_url(), config.proof_timeout())
            .context("failed to build proof api client")?;
        let exits = match config.exit_ledger_path() {
            Some(path) => ExitLedger::open(path)?,
            None => {
                tracing::warn!("no data directory, exits are only remembered for this run");
                ExitLedger::in_memory()
            }
        };
        let service = BridgeService::new(
            Arc::new(provider),
            config.contracts()?,
            config.bridge_settings(),
            Arc::new(exit_source),
        )
        .with_exit_ledger(exits);
        Ok(Self {
            service,
            expected_chain_ids: [l1.chain_id, l2.chain_id],
        })
    }

    pub fn provider(&self) -> &Arc<DualChainProvider> {
        self.service.provider()
    }

    /// Refuses to write when the endpoint reports a different chain id than configured.
    pub async fn ensure_chain_id(&self, chain: Chain) -> Result<()> {
        let expected = match chain {
            Chain::L1 => self.expected_chain_ids[0],
            Chain::L2 => self.expected_chain_ids[1],
        };
        let Some(expected) = expected else {
            return Ok(());
        };
        let actual = self.provider().get_chain_id(chain).await?;
        if actual != expected {
            anyhow::bail!("{chain} endpoint reports chainId {actual}, config expects {expected}");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeeOutput {
    chain: Chain,
    gas_limit: u64,
    gas_price: String,
    total_wei: String,
    total: String,
}

pub fn print_estimate(chain: Chain, estimate: &FeeEstimate, json: bool) -> Result<()> {
    let output = FeeOutput {
        chain,
        gas_limit: estimate.gas_limit,
        gas_price: estimate.gas_price.to_string(),
        total_wei: estimate.total.to_string(),
        total: format_units(estimate.total, chain.native_decimals()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    println!("chain:     {}", output.chain);
    println!("gasLimit:  {}", output.gas_limit);
    println!("gasPrice:  {} wei", output.gas_price);
    println!("fee:       {} {}", output.total, chain.native_symbol());
    Ok(())
}

/// Logs the fee preview before a real submission. Only bad input stops the submission.
pub fn log_preview(chain: Chain, preview: dual_bridge::Result<FeeEstimate>) -> Result<()> {
    match preview {
        Ok(estimate) => tracing::info!(
            %chain,
            gas_limit = estimate.gas_limit,
            fee = %format_units(estimate.total, chain.native_decimals()),
            symbol = chain.native_symbol(),
            "fee preview"
        ),
        Err(err) if err.is_validation() => return Err(err.into()),
        Err(err) => tracing::warn!(%chain, error = %err, "fee preview failed"),
    }
    Ok(())
}

pub fn print_flow(flow: &TransferFlow, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(flow)?);
        return Ok(());
    }
    println!("state:  {}", flow.state);
    match flow.amount {
        Some(amount) => println!("amount: {}", format_units(amount, flow.intent.decimals())),
        None => println!("amount: {}", flow.intent.amount),
    }
    for tx in &flow.history {
        println!("{:<9} {} {:#x}", tx.purpose.to_string(), tx.chain, tx.hash);
    }
    Ok(())
}

pub fn parse_b256(value: &str) -> Result<B256> {
    B256::from_str(value.trim()).map_err(|err| anyhow!("invalid tx hash {value}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transaction_hashes() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert_eq!(parse_b256(&hash).unwrap(), B256::repeat_byte(0xab));
        assert!(parse_b256("0x1234").is_err());
    }

    #[test]
    fn only_bad_input_stops_after_a_failed_preview() {
        let invalid = dual_bridge::BridgeError::InvalidAmount {
            amount: "0".to_string(),
            reason: "amount must be greater than zero".to_string(),
        };
        assert!(log_preview(Chain::L1, Err(invalid)).is_err());

        let unreachable = dual_bridge::BridgeError::transport(
            Chain::L2,
            "eth_estimateGas",
            dual_bridge::rpc::RpcError::transport("connection refused"),
        );
        assert!(log_preview(Chain::L2, Err(unreachable)).is_ok());
    }

    #[test]
    fn rpc_flags_select_by_chain() {
        let flags = RpcFlags {
            l1: Some("http://l1".to_string()),
            l2: None,
        };
        assert_eq!(flags.get(Chain::L1), Some("http://l1"));
        assert_eq!(flags.get(Chain::L2), None);
    }
}
