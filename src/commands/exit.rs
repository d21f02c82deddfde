use super::{parse_b256, Session};
use crate::cli::ExitArgs;
use anyhow::Result;
use dual_bridge::types::Chain;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExitOutput {
    burn_tx: String,
    exit_tx: String,
}

pub async fn run(args: ExitArgs, session: Session) -> Result<()> {
    let burn_tx = parse_b256(&args.burn_tx)?;
    session.ensure_chain_id(Chain::L1).await?;
    let exit_tx = session.service.exit_from_l1(burn_tx).await?;

    let output = ExitOutput {
        burn_tx: format!("{burn_tx:#x}"),
        exit_tx: format!("{exit_tx:#x}"),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    println!("burn tx: {}", output.burn_tx);
    println!("exit tx: {}", output.exit_tx);
    Ok(())
}
