use super::{log_preview, print_estimate, print_flow, Session};
use crate::cli::{AmountArgs, TokenAmountArgs};
use anyhow::{Context, Result};
use dual_bridge::types::Chain;
use dual_bridge::units::validate_address;

/// Deposit ETH from L1 to the signer's address on L2.
pub async fn run_eth(args: AmountArgs, session: Session) -> Result<()> {
    let preview = session.service.estimate_deposit_eth(&args.amount).await;
    if args.dry_run {
        return print_estimate(Chain::L1, &preview?, args.json);
    }
    log_preview(Chain::L1, preview)?;
    session.ensure_chain_id(Chain::L1).await?;
    let flow = session
        .service
        .deposit_eth_flow(&args.amount)
        .await
        .context("ETH deposit failed")?;
    print_flow(&flow, args.json)
}

/// Approve the predicate and deposit an ERC20 token from L1.
pub async fn run_erc20(args: TokenAmountArgs, session: Session) -> Result<()> {
    let token = validate_address(&args.token)?;
    let preview = session.service.estimate_deposit_erc20(token, &args.amount).await;
    if args.dry_run {
        return print_estimate(Chain::L1, &preview?, args.json);
    }
    log_preview(Chain::L1, preview)?;
    session.ensure_chain_id(Chain::L1).await?;
    let flow = session
        .service
        .deposit_erc20_token_flow(token, &args.amount)
        .await
        .with_context(|| format!("deposit of token {token} failed"))?;
    print_flow(&flow, args.json)
}
