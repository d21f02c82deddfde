use super::RpcFlags;
use crate::cli::DoctorArgs;
use crate::config::Config;
use alloy_primitives::Address;
use anyhow::Result;
use dual_bridge::rpc::{ChainReadClient, RpcClient};
use dual_bridge::types::Chain;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DoctorCheck {
    name: String,
    status: String,
    details: String,
    hint: Option<String>,
}

impl DoctorCheck {
    fn ok(name: String, details: String) -> Self {
        Self {
            name,
            status: "ok".to_string(),
            details,
            hint: None,
        }
    }

    fn warn(name: String, details: String, hint: Option<&str>) -> Self {
        Self {
            name,
            status: "warn".to_string(),
            details,
            hint: hint.map(str::to_string),
        }
    }

    fn fail(name: String, details: String, hint: &str) -> Self {
        Self {
            name,
            status: "fail".to_string(),
            details,
            hint: Some(hint.to_string()),
        }
    }
}

pub async fn run(
    args: DoctorArgs,
    config: &Config,
    rpc: &RpcFlags,
    signer: Option<Address>,
) -> Result<()> {
    let mut checks = Vec::new();
    for chain in Chain::ALL {
        checks.extend(check_chain(chain, config, rpc).await);
    }

    match signer {
        Some(address) => checks.push(DoctorCheck::ok(
            "signer".to_string(),
            format!("signer {address:#x}"),
        )),
        None => checks.push(DoctorCheck::warn(
            "signer".to_string(),
            "no signer configured, read-only mode".to_string(),
            Some("Set --private-key or the environment variable named by [signer] private_key_env."),
        )),
    }

    if let Err(err) = config.contracts() {
        checks.push(DoctorCheck::fail(
            "contracts".to_string(),
            format!("{err:#}"),
            "Fix the [contracts] section of the config file.",
        ));
    }

    output_checks(args.json, checks)
}

async fn check_chain(chain: Chain, config: &Config, rpc: &RpcFlags) -> Vec<DoctorCheck> {
    let prefix = chain.as_str().to_ascii_lowercase();
    let mut checks = Vec::new();

    let resolved = match config.resolve_rpc(chain, rpc.get(chain)) {
        Ok(resolved) => resolved,
        Err(err) => {
            checks.push(DoctorCheck::fail(
                format!("{prefix}_rpc"),
                format!("{err:#}"),
                "Configure the endpoint in the config file or pass the rpc flag.",
            ));
            return checks;
        }
    };

    let client = match RpcClient::new(&resolved.url, config.request_timeout()) {
        Ok(client) => client,
        Err(err) => {
            checks.push(DoctorCheck::fail(
                format!("{prefix}_rpc"),
                format!("{} not usable: {err}", resolved.redacted()),
                "Check the RPC URL.",
            ));
            return checks;
        }
    };

    match client.chain_id().await {
        Ok(chain_id) => match resolved.chain_id {
            Some(expected) if expected != chain_id => checks.push(DoctorCheck::fail(
                format!("{prefix}_chainId"),
                format!(
                    "{} reports chainId {chain_id}, config expects {expected}",
                    resolved.redacted()
                ),
                "The endpoint points at a different network than configured.",
            )),
            _ => checks.push(DoctorCheck::ok(
                format!("{prefix}_chainId"),
                format!("{} chainId {chain_id}", resolved.redacted()),
            )),
        },
        Err(err) => {
            checks.push(DoctorCheck::fail(
                format!("{prefix}_rpc"),
                format!("{} not reachable: {err}", resolved.redacted()),
                "Check the RPC URL or network connectivity.",
            ));
            return checks;
        }
    }

    match client.block_number().await {
        Ok(block) => checks.push(DoctorCheck::ok(
            format!("{prefix}_block"),
            format!("latest block {block}"),
        )),
        Err(err) => checks.push(DoctorCheck::warn(
            format!("{prefix}_block"),
            format!("eth_blockNumber failed: {err}"),
            None,
        )),
    }

    match client.gas_price().await {
        Ok(price) => checks.push(DoctorCheck::ok(
            format!("{prefix}_gasPrice"),
            format!("gas price {price} wei"),
        )),
        Err(err) => checks.push(DoctorCheck::warn(
            format!("{prefix}_gasPrice"),
            format!("eth_gasPrice failed: {err}"),
            None,
        )),
    }

    match client.client_version().await {
        Ok(version) => checks.push(DoctorCheck::ok(format!("{prefix}_client"), version)),
        Err(err) => checks.push(DoctorCheck::warn(
            format!("{prefix}_client"),
            format!("web3_clientVersion failed: {err}"),
            Some("Some providers disable web3_clientVersion."),
        )),
    }

    checks
}

fn output_checks(json: bool, checks: Vec<DoctorCheck>) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&checks)?);
        return Ok(());
    }

    for check in checks {
        let icon = match check.status.as_str() {
            "ok" => "✅",
            "warn" => "⚠️",
            "fail" => "❌",
            _ => "•",
        };
        println!("{icon} {}: {}", check.name, check.details);
        if let Some(hint) = check.hint {
            println!("  hint: {hint}");
        }
    }
    Ok(())
}
