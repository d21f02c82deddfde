use super::Session;
use crate::cli::BlockArgs;
use anyhow::{anyhow, Result};
use dual_bridge::types::BlockRef;

pub async fn run(args: BlockArgs, session: Session) -> Result<()> {
    let provider = session.provider();
    let block = match args.id.as_deref() {
        Some(id) => id.parse::<BlockRef>().map_err(|err| anyhow!(err))?,
        None => BlockRef::Number(provider.get_block_number(args.chain).await?),
    };
    let info = provider.get_block(block, args.chain).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("chain:        {}", args.chain);
    println!("number:       {}", info.number);
    println!("hash:         {:#x}", info.hash);
    println!("parentHash:   {:#x}", info.parent_hash);
    println!("timestamp:    {}", info.timestamp);
    println!("transactions: {}", info.transaction_count);
    Ok(())
}
