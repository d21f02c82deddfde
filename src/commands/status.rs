use super::{parse_b256, Session};
use crate::cli::StatusArgs;
use anyhow::Result;
use dual_bridge::types::BridgeStatus;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DepositStatusOutput {
    tx: String,
    status: BridgeStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WithdrawalStatusOutput {
    burn_tx: String,
    status: BridgeStatus,
    exit_complete: bool,
    exit_tx_required: bool,
    exit_tx: Option<String>,
}

pub async fn run_l1_to_l2(args: StatusArgs, session: Session) -> Result<()> {
    if args.exit_tx.is_some() {
        anyhow::bail!("--exit-tx only applies to l2-to-l1");
    }
    let tx = parse_b256(&args.tx)?;
    let status = session.service.check_l1_to_l2_bridge_status(tx).await?;
    let output = DepositStatusOutput {
        tx: format!("{tx:#x}"),
        status,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    println!("{} {}", output.tx, output.status);
    Ok(())
}

pub async fn run_l2_to_l1(args: StatusArgs, session: Session) -> Result<()> {
    let burn_tx = parse_b256(&args.tx)?;
    if let Some(exit_tx) = args.exit_tx.as_deref() {
        session.service.record_exit(burn_tx, parse_b256(exit_tx)?)?;
    }
    let report = session.service.check_l2_to_l1_bridge_status(burn_tx).await?;
    let output = WithdrawalStatusOutput {
        burn_tx: format!("{burn_tx:#x}"),
        status: report.status,
        exit_complete: report.exit_complete,
        exit_tx_required: report.exit_tx_required,
        exit_tx: report.exit_tx.map(|tx| format!("{tx:#x}")),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    println!("burn:           {} {}", output.burn_tx, output.status);
    println!("exitComplete:   {}", output.exit_complete);
    println!("exitTxRequired: {}", output.exit_tx_required);
    if let Some(exit_tx) = output.exit_tx {
        println!("exitTx:         {exit_tx}");
    }
    Ok(())
}
