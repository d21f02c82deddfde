use super::Session;
use crate::cli::BalanceArgs;
use anyhow::{Context, Result};
use dual_bridge::units::{format_units, validate_address};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BalanceOutput {
    chain: String,
    holder: String,
    token: Option<String>,
    symbol: String,
    raw: String,
    formatted: String,
}

pub async fn run(args: BalanceArgs, session: Session) -> Result<()> {
    let chain = args.chain;
    let provider = session.provider();
    let holder = match args.holder.as_deref() {
        Some(holder) => validate_address(holder)?,
        None => provider
            .signer_address(chain)
            .context("pass --holder or configure a signer")?,
    };

    let output = match args.token.as_deref() {
        Some(token) => {
            let token = validate_address(token)?;
            let (descriptor, raw) = tokio::try_join!(
                provider.get_erc20_metadata(token, chain),
                provider.get_erc20_balance(token, holder, chain),
            )?;
            BalanceOutput {
                chain: chain.to_string(),
                holder: format!("{holder:#x}"),
                token: Some(format!("{token:#x}")),
                symbol: descriptor.symbol,
                raw: raw.to_string(),
                formatted: format_units(raw, descriptor.decimals),
            }
        }
        None => {
            let raw = provider.get_native_balance(holder, chain).await?;
            BalanceOutput {
                chain: chain.to_string(),
                holder: format!("{holder:#x}"),
                token: None,
                symbol: chain.native_symbol().to_string(),
                raw: raw.to_string(),
                formatted: format_units(raw, chain.native_decimals()),
            }
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    println!("{} {} ({} on {})", output.formatted, output.symbol, output.holder, output.chain);
    Ok(())
}
