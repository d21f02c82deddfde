use crate::commands::{self, RpcFlags, Session};
use crate::config::Config;
use crate::signer::{load_signer, SignerOptions};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dual_bridge::types::Chain;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dual-bridge",
    version,
    about = "Move ETH, MATIC and ERC20 tokens between L1 and L2"
)]
pub struct Cli {
    /// Config file (default <config dir>/dual-bridge/config.toml).
    #[arg(long = "config", global = true)]
    pub config_path: Option<PathBuf>,

    /// Overrides [chains.l1] rpc.
    #[arg(long, global = true)]
    pub l1_rpc: Option<String>,

    /// Overrides [chains.l2] rpc.
    #[arg(long, global = true)]
    pub l2_rpc: Option<String>,

    #[arg(long, global = true, conflicts_with = "private_key_env")]
    pub private_key: Option<String>,

    /// Environment variable holding the key (default from [signer], else PRIVATE_KEY).
    #[arg(long, global = true)]
    pub private_key_env: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        let signer = load_signer(
            SignerOptions {
                private_key: self.private_key.as_deref(),
                private_key_env: self.private_key_env.as_deref(),
            },
            &config,
        )?;
        let rpc = RpcFlags {
            l1: self.l1_rpc,
            l2: self.l2_rpc,
        };
        let open = || Session::open(&config, &rpc, signer.clone());

        match self.command {
            Command::Deposit(cmd) => cmd.run(open()?).await,
            Command::Withdraw(cmd) => cmd.run(open()?).await,
            Command::Exit(args) => commands::exit::run(args, open()?).await,
            Command::Status(cmd) => cmd.run(open()?).await,
            Command::Balance(args) => commands::balance::run(args, open()?).await,
            Command::Token(args) => commands::token::run(args, open()?).await,
            Command::Block(args) => commands::block::run(args, open()?).await,
            Command::Doctor(args) => {
                let address = signer.as_ref().map(|signer| signer.address());
                commands::doctor::run(args, &config, &rpc, address).await
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// L1 -> L2 deposits.
    Deposit(DepositCommand),
    /// Start an L2 -> L1 withdrawal by burning on L2.
    Withdraw(WithdrawCommand),
    /// Finish a withdrawal on L1 once the burn is checkpointed.
    Exit(ExitArgs),
    Status(StatusCommand),
    Balance(BalanceArgs),
    Token(TokenArgs),
    Block(BlockArgs),
    /// Check both endpoints and the signer.
    Doctor(DoctorArgs),
}

#[derive(Parser, Debug)]
pub struct DepositCommand {
    #[command(subcommand)]
    pub command: DepositSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum DepositSubcommand {
    Eth(AmountArgs),
    Erc20(TokenAmountArgs),
}

impl DepositCommand {
    pub async fn run(self, session: Session) -> Result<()> {
        match self.command {
            DepositSubcommand::Eth(args) => commands::deposit::run_eth(args, session).await,
            DepositSubcommand::Erc20(args) => commands::deposit::run_erc20(args, session).await,
        }
    }
}

#[derive(Parser, Debug)]
pub struct WithdrawCommand {
    #[command(subcommand)]
    pub command: WithdrawSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum WithdrawSubcommand {
    Matic(AmountArgs),
    Erc20(TokenAmountArgs),
}

impl WithdrawCommand {
    pub async fn run(self, session: Session) -> Result<()> {
        match self.command {
            WithdrawSubcommand::Matic(args) => commands::withdraw::run_matic(args, session).await,
            WithdrawSubcommand::Erc20(args) => commands::withdraw::run_erc20(args, session).await,
        }
    }
}

#[derive(Parser, Debug)]
pub struct StatusCommand {
    #[command(subcommand)]
    pub command: StatusSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum StatusSubcommand {
    L1ToL2(StatusArgs),
    L2ToL1(StatusArgs),
}

impl StatusCommand {
    pub async fn run(self, session: Session) -> Result<()> {
        match self.command {
            StatusSubcommand::L1ToL2(args) => commands::status::run_l1_to_l2(args, session).await,
            StatusSubcommand::L2ToL1(args) => commands::status::run_l2_to_l1(args, session).await,
        }
    }
}

#[derive(Args, Debug)]
pub struct AmountArgs {
    /// Human-readable amount, e.g. 0.25
    pub amount: String,

    /// Print the fee estimate without sending anything.
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TokenAmountArgs {
    #[arg(long)]
    pub token: String,

    pub amount: String,

    /// Print the fee estimate of the first write without sending anything.
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExitArgs {
    #[arg(long)]
    pub burn_tx: String,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[arg(long)]
    pub tx: String,

    /// An exit already sent for this burn (l2-to-l1 only).
    #[arg(long)]
    pub exit_tx: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    #[arg(long)]
    pub chain: Chain,

    #[arg(long)]
    pub token: Option<String>,

    /// Defaults to the signer address.
    #[arg(long)]
    pub holder: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long)]
    pub chain: Chain,

    #[arg(long)]
    pub address: String,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BlockArgs {
    #[arg(long)]
    pub chain: Chain,

    /// Block number or hash; latest when omitted.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "dual-bridge",
            "deposit",
            "erc20",
            "--token",
            "0x1111111111111111111111111111111111111111",
            "100.5",
            "--l1-rpc",
            "http://localhost:8545",
        ])
        .unwrap();
        assert_eq!(cli.l1_rpc.as_deref(), Some("http://localhost:8545"));
        match cli.command {
            Command::Deposit(DepositCommand {
                command: DepositSubcommand::Erc20(args),
            }) => {
                assert_eq!(args.amount, "100.5");
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from([
            "dual-bridge",
            "withdraw",
            "erc20",
            "--token",
            "0x1111111111111111111111111111111111111111",
            "1",
            "--dry-run",
            "--config",
            "/tmp/bridge.toml",
        ])
        .unwrap();
        assert_eq!(cli.config_path, Some(PathBuf::from("/tmp/bridge.toml")));
        assert!(matches!(
            cli.command,
            Command::Withdraw(WithdrawCommand {
                command: WithdrawSubcommand::Erc20(TokenAmountArgs { dry_run: true, .. }),
            })
        ));
        assert!(Cli::try_parse_from(["dual-bridge", "--config-path", "x", "doctor"]).is_err());
    }

    #[test]
    fn chain_flag_is_typed() {
        let cli = Cli::try_parse_from(["dual-bridge", "block", "--chain", "l2"]).unwrap();
        assert!(matches!(cli.command, Command::Block(BlockArgs { chain: Chain::L2, .. })));
        assert!(Cli::try_parse_from(["dual-bridge", "block", "--chain", "l3"]).is_err());
    }

    #[test]
    fn key_flags_conflict() {
        let result = Cli::try_parse_from([
            "dual-bridge",
            "doctor",
            "--private-key",
            "0x01",
            "--private-key-env",
            "KEY",
        ]);
        assert!(result.is_err());
    }
}
