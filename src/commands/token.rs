use super::Session;
use crate::cli::TokenArgs;
use anyhow::Result;
use dual_bridge::units::validate_address;

pub async fn run(args: TokenArgs, session: Session) -> Result<()> {
    let address = validate_address(&args.address)?;
    let descriptor = session
        .provider()
        .get_erc20_metadata(address, args.chain)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }
    println!("chain:    {}", descriptor.chain);
    println!("address:  {:#x}", descriptor.address);
    println!("symbol:   {}", descriptor.symbol);
    println!("decimals: {}", descriptor.decimals);
    Ok(())
}
