use super::{log_preview, print_estimate, print_flow, Session};
use crate::cli::{AmountArgs, TokenAmountArgs};
use anyhow::{Context, Result};
use dual_bridge::types::Chain;
use dual_bridge::units::validate_address;

/// Burn native MATIC on L2. Run `exit` once the burn is checkpointed.
pub async fn run_matic(args: AmountArgs, session: Session) -> Result<()> {
    let preview = session.service.estimate_withdraw_matic(&args.amount).await;
    if args.dry_run {
        return print_estimate(Chain::L2, &preview?, args.json);
    }
    log_preview(Chain::L2, preview)?;
    session.ensure_chain_id(Chain::L2).await?;
    let flow = session
        .service
        .withdraw_matic_flow(&args.amount)
        .await
        .context("MATIC withdrawal failed")?;
    print_flow(&flow, args.json)?;
    if !args.json {
        println!("next: dual-bridge exit --burn-tx <hash> once the burn is checkpointed");
    }
    Ok(())
}

pub async fn run_erc20(args: TokenAmountArgs, session: Session) -> Result<()> {
    let token = validate_address(&args.token)?;
    let preview = session
        .service
        .estimate_withdraw_erc20_token(token, &args.amount)
        .await;
    if args.dry_run {
        return print_estimate(Chain::L2, &preview?, args.json);
    }
    log_preview(Chain::L2, preview)?;
    session.ensure_chain_id(Chain::L2).await?;
    let flow = session
        .service
        .withdraw_erc20_token_flow(token, &args.amount)
        .await
        .with_context(|| format!("withdrawal of token {token} failed"))?;
    print_flow(&flow, args.json)
}
