//! Transfer lifecycles between L1 and L2.

mod exit;
mod flow;
mod ledger;
mod retry;

pub use exit::{find_burn_log, BurnEvent, ExitPayloadSource, ProofApiClient, DEFAULT_PROOF_API};
pub use flow::{TransferEvent, TransferFlow, TransferState};
pub use ledger::ExitLedger;
pub use retry::RetryPolicy;

use crate::abi::{
    encode_approve_call, encode_deposit_ether_for_call, encode_deposit_for_call,
    encode_exit_call, encode_withdraw_call,
};
use crate::error::{BridgeError, Result};
use crate::provider::{DualChainProvider, FeeEstimate};
use crate::rpc::{ReceiptInfo, TxParams};
use crate::types::{
    BridgeStatus, Chain, Direction, L2ToL1Status, SubmittedTransaction, TokenDescriptor,
    TransferIntent, TxPurpose,
};
use crate::units::{parse_positive_amount, parse_token_amount, validate_human_amount};
use alloy_primitives::{address, Address, Bytes, B256, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeContracts {
    /// L1 entry point for deposits and exits.
    pub root_chain_manager: Address,
    /// L1 spender that pulls ERC20 deposits.
    pub erc20_predicate: Address,
    /// L2 contract holding the native token.
    pub native_token: Address,
}

impl Default for BridgeContracts {
    fn default() -> Self {
        Self {
            root_chain_manager: address!("a0c68c638235ee32657e8f720a23cec1bfc77c77"),
            erc20_predicate: address!("40ec5b33f54e0e8a33a975908c5ba1c14e5bbbdf"),
            native_token: address!("0000000000000000000000000000000000001010"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BridgeSettings {
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
    pub read_retry: RetryPolicy,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            receipt_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(1),
            read_retry: RetryPolicy::default(),
        }
    }
}

pub struct BridgeService {
    provider: Arc<DualChainProvider>,
    contracts: BridgeContracts,
    settings: BridgeSettings,
    exit_source: Arc<dyn ExitPayloadSource>,
    exits: ExitLedger,
}

impl BridgeService {
    pub fn new(
        provider: Arc<DualChainProvider>,
        contracts: BridgeContracts,
        settings: BridgeSettings,
        exit_source: Arc<dyn ExitPayloadSource>,
    ) -> Self {
        Self {
            provider,
            contracts,
            settings,
            exit_source,
            exits: ExitLedger::in_memory(),
        }
    }

    pub fn with_exit_ledger(mut self, exits: ExitLedger) -> Self {
        self.exits = exits;
        self
    }

    pub fn provider(&self) -> &Arc<DualChainProvider> {
        &self.provider
    }

    pub fn contracts(&self) -> &BridgeContracts {
        &self.contracts
    }

    pub async fn deposit_eth(&self, amount: &str) -> Result<B256> {
        Ok(self.deposit_eth_flow(amount).await?.state_tx())
    }

    pub async fn deposit_eth_flow(&self, amount: &str) -> Result<TransferFlow> {
        let value = parse_positive_amount(amount, Chain::L1.native_decimals())?;
        let user = self.provider.signer_address(Chain::L1)?;
        let intent = TransferIntent::native(Direction::L1ToL2, Chain::L1, user, amount);
        let mut flow = TransferFlow::new(intent, vec![TxPurpose::Deposit]);
        flow.advance(TransferEvent::Validated { amount: value })?;

        let data = encode_deposit_ether_for_call(user);
        let manager = self.contracts.root_chain_manager;
        let submitted = self.submit(&mut flow, Chain::L1, manager, data, Some(value)).await;
        let hash = submitted.map_err(|err| {
            fail(&mut flow, BridgeError::DepositFailed {
                chain: Chain::L1,
                tx_hash: None,
                reason: err.to_string(),
            })
        })?;
        tracing::info!(%hash, amount = %flow.intent.amount, "ETH deposit submitted");
        flow.advance(TransferEvent::Finalized)?;
        Ok(flow)
    }

    pub async fn deposit_erc20_token(&self, token: Address, amount: &str) -> Result<B256> {
        Ok(self.deposit_erc20_token_flow(token, amount).await?.state_tx())
    }

    /// Approve, wait for the approval to be mined with status 1, then deposit.
    pub async fn deposit_erc20_token_flow(&self, token: Address, amount: &str) -> Result<TransferFlow> {
        validate_human_amount(amount)?;
        let user = self.provider.signer_address(Chain::L1)?;
        let descriptor = self.token_descriptor(token, Chain::L1).await?;
        let value = parse_token_amount(amount, descriptor.decimals)?;

        let intent = TransferIntent::token(Direction::L1ToL2, descriptor, user, amount);
        let mut flow = TransferFlow::new(intent, vec![TxPurpose::Approve, TxPurpose::Deposit]);
        flow.advance(TransferEvent::Validated { amount: value })?;

        let approve = encode_approve_call(self.contracts.erc20_predicate, value);
        let submitted = self.submit(&mut flow, Chain::L1, token, approve, None).await;
        let approve_tx = submitted.map_err(|err| {
            fail(&mut flow, BridgeError::ApprovalFailed {
                chain: Chain::L1,
                tx_hash: None,
                reason: err.to_string(),
            })
        })?;

        let approval_failed = |reason: String| BridgeError::ApprovalFailed {
            chain: Chain::L1,
            tx_hash: Some(approve_tx),
            reason,
        };
        match self.wait_for_receipt(approve_tx, Chain::L1).await {
            Ok(Some(receipt)) if receipt.status => {
                flow.advance(TransferEvent::Confirmed)?;
            }
            Ok(Some(_)) => {
                return Err(fail(&mut flow, approval_failed("approval reverted".into())));
            }
            Ok(None) => {
                let reason = format!(
                    "approval not mined within {}ms",
                    self.settings.receipt_timeout.as_millis()
                );
                return Err(fail(&mut flow, approval_failed(reason)));
            }
            Err(err) => return Err(fail(&mut flow, approval_failed(err.to_string()))),
        }

        let deposit = encode_deposit_for_call(user, token, value);
        let manager = self.contracts.root_chain_manager;
        let submitted = self.submit(&mut flow, Chain::L1, manager, deposit, None).await;
        let hash = submitted.map_err(|err| {
            fail(&mut flow, BridgeError::DepositFailed {
                chain: Chain::L1,
                tx_hash: None,
                reason: err.to_string(),
            })
        })?;
        tracing::info!(%hash, %token, amount = %flow.intent.amount, "token deposit submitted");
        flow.advance(TransferEvent::Finalized)?;
        Ok(flow)
    }

    pub async fn withdraw_matic(&self, amount: &str) -> Result<B256> {
        Ok(self.withdraw_matic_flow(amount).await?.state_tx())
    }

    /// Burns native MATIC on L2. The exit is a separate step on L1.
    pub async fn withdraw_matic_flow(&self, amount: &str) -> Result<TransferFlow> {
        let value = parse_positive_amount(amount, Chain::L2.native_decimals())?;
        let user = self.provider.signer_address(Chain::L2)?;
        let intent = TransferIntent::native(Direction::L2ToL1, Chain::L2, user, amount);
        let mut flow = TransferFlow::new(intent, vec![TxPurpose::Withdraw]);
        flow.advance(TransferEvent::Validated { amount: value })?;

        let data = encode_withdraw_call(value);
        let native = self.contracts.native_token;
        let submitted = self.submit(&mut flow, Chain::L2, native, data, Some(value)).await;
        let hash = submitted.map_err(|err| fail(&mut flow, withdraw_failed(err)))?;
        tracing::info!(%hash, amount = %flow.intent.amount, "MATIC withdrawal submitted");
        flow.advance(TransferEvent::Finalized)?;
        Ok(flow)
    }

    pub async fn withdraw_erc20_token(&self, token: Address, amount: &str) -> Result<B256> {
        Ok(self.withdraw_erc20_token_flow(token, amount).await?.state_tx())
    }

    /// Burns a child token on L2; `token` is the L2 address.
    pub async fn withdraw_erc20_token_flow(&self, token: Address, amount: &str) -> Result<TransferFlow> {
        validate_human_amount(amount)?;
        let user = self.provider.signer_address(Chain::L2)?;
        let descriptor = self.token_descriptor(token, Chain::L2).await?;
        let value = parse_token_amount(amount, descriptor.decimals)?;

        let intent = TransferIntent::token(Direction::L2ToL1, descriptor, user, amount);
        let mut flow = TransferFlow::new(intent, vec![TxPurpose::Withdraw]);
        flow.advance(TransferEvent::Validated { amount: value })?;

        let data = encode_withdraw_call(value);
        let submitted = self.submit(&mut flow, Chain::L2, token, data, None).await;
        let hash = submitted.map_err(|err| fail(&mut flow, withdraw_failed(err)))?;
        tracing::info!(%hash, %token, amount = %flow.intent.amount, "token withdrawal submitted");
        flow.advance(TransferEvent::Finalized)?;
        Ok(flow)
    }

    /// Claims an L2 burn on L1 with the payload from the exit source.
    ///
    /// A recorded exit that is mined with status 1 or still known to L1 is returned as is.
    /// Only a reverted or dropped exit is submitted again.
    pub async fn exit_from_l1(&self, burn_tx: B256) -> Result<B256> {
        let failed = |reason: &str| BridgeError::ExitProcessingFailed {
            burn_tx,
            reason: reason.to_string(),
        };

        if let Some(exit_tx) = self.live_exit(burn_tx).await? {
            tracing::info!(%burn_tx, %exit_tx, "exit already submitted");
            return Ok(exit_tx);
        }

        let receipt = self
            .read_receipt(burn_tx, Chain::L2)
            .await?
            .ok_or_else(|| failed("burn transaction has no receipt on L2"))?;
        if !receipt.status {
            return Err(failed("burn transaction reverted on L2"));
        }
        let burn = find_burn_log(&receipt, self.contracts.native_token)
            .ok_or_else(|| failed("no burn event in the L2 receipt"))?;
        tracing::debug!(token = %burn.token, amount = %burn.amount, "burn event located");

        let payload = self
            .exit_source
            .exit_payload(burn_tx, burn.event_signature)
            .await?
            .ok_or_else(|| failed("burn is not checkpointed on L1 yet"))?;

        let exit_tx = self
            .provider
            .writer(Chain::L1)
            .send_raw(self.contracts.root_chain_manager, encode_exit_call(payload), None)
            .await
            .map_err(|err| failed(&err.to_string()))?;
        tracing::info!(
            chain = %Chain::L1,
            purpose = %TxPurpose::Exit,
            %burn_tx,
            %exit_tx,
            "exit submitted"
        );
        if let Err(err) = self.record_exit(burn_tx, exit_tx) {
            tracing::warn!(error = %err, %burn_tx, %exit_tx, "exit submitted but not persisted");
        }
        Ok(exit_tx)
    }

    async fn live_exit(&self, burn_tx: B256) -> Result<Option<B256>> {
        let Some(exit_tx) = self.exit_for(burn_tx) else {
            return Ok(None);
        };
        match self.read_receipt(exit_tx, Chain::L1).await? {
            Some(receipt) if receipt.status => return Ok(Some(exit_tx)),
            Some(_) => {
                tracing::warn!(%burn_tx, %exit_tx, "recorded exit reverted, submitting again");
                return Ok(None);
            }
            None => {}
        }
        let lookup = self
            .settings
            .read_retry
            .run("eth_getTransactionByHash", || {
                self.provider.get_transaction(exit_tx, Chain::L1)
            })
            .await;
        match lookup {
            Ok(_) => Ok(Some(exit_tx)),
            Err(BridgeError::TransactionNotFound { .. }) => {
                tracing::warn!(%burn_tx, %exit_tx, "recorded exit unknown to L1, submitting again");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn check_l1_to_l2_bridge_status(&self, tx: B256) -> Result<BridgeStatus> {
        let receipt = self.read_receipt(tx, Chain::L1).await?;
        Ok(BridgeStatus::from_receipt(receipt.as_ref()))
    }

    pub async fn check_l2_to_l1_bridge_status(&self, burn_tx: B256) -> Result<L2ToL1Status> {
        let receipt = self.read_receipt(burn_tx, Chain::L2).await?;
        let status = BridgeStatus::from_receipt(receipt.as_ref());
        if status != BridgeStatus::Completed {
            return Ok(L2ToL1Status {
                status,
                exit_complete: false,
                exit_tx_required: false,
                exit_tx: None,
            });
        }

        let Some(exit_tx) = self.exit_for(burn_tx) else {
            return Ok(L2ToL1Status {
                status,
                exit_complete: false,
                exit_tx_required: true,
                exit_tx: None,
            });
        };
        let exit_status =
            BridgeStatus::from_receipt(self.read_receipt(exit_tx, Chain::L1).await?.as_ref());
        Ok(L2ToL1Status {
            status,
            exit_complete: exit_status == BridgeStatus::Completed,
            exit_tx_required: exit_status == BridgeStatus::Failed,
            exit_tx: Some(exit_tx),
        })
    }

    /// Registers an exit, including ones observed outside this service.
    pub fn record_exit(&self, burn_tx: B256, exit_tx: B256) -> Result<()> {
        self.exits.record(burn_tx, exit_tx)
    }

    pub fn exit_for(&self, burn_tx: B256) -> Option<B256> {
        self.exits.get(burn_tx)
    }

    pub async fn estimate_deposit_eth(&self, amount: &str) -> Result<FeeEstimate> {
        let value = parse_positive_amount(amount, Chain::L1.native_decimals())?;
        let user = self.provider.signer_address(Chain::L1)?;
        let params = TxParams {
            from: Some(user),
            to: self.contracts.root_chain_manager,
            value: Some(value),
            data: encode_deposit_ether_for_call(user),
        };
        self.estimate(params, Chain::L1).await
    }

    pub async fn estimate_withdraw_matic(&self, amount: &str) -> Result<FeeEstimate> {
        let value = parse_positive_amount(amount, Chain::L2.native_decimals())?;
        let user = self.provider.signer_address(Chain::L2)?;
        let params = TxParams {
            from: Some(user),
            to: self.contracts.native_token,
            value: Some(value),
            data: encode_withdraw_call(value),
        };
        self.estimate(params, Chain::L2).await
    }

    /// Previews the approval, the first write of a token deposit.
    pub async fn estimate_deposit_erc20(&self, token: Address, amount: &str) -> Result<FeeEstimate> {
        let value = self.token_amount(token, amount, Chain::L1).await?;
        let user = self.provider.signer_address(Chain::L1)?;
        let params = TxParams {
            from: Some(user),
            to: token,
            value: None,
            data: encode_approve_call(self.contracts.erc20_predicate, value),
        };
        self.estimate(params, Chain::L1).await
    }

    pub async fn estimate_withdraw_erc20_token(
        &self,
        token: Address,
        amount: &str,
    ) -> Result<FeeEstimate> {
        let value = self.token_amount(token, amount, Chain::L2).await?;
        let user = self.provider.signer_address(Chain::L2)?;
        let params = TxParams {
            from: Some(user),
            to: token,
            value: None,
            data: encode_withdraw_call(value),
        };
        self.estimate(params, Chain::L2).await
    }

    async fn token_amount(&self, token: Address, amount: &str, chain: Chain) -> Result<U256> {
        validate_human_amount(amount)?;
        let descriptor = self.token_descriptor(token, chain).await?;
        parse_token_amount(amount, descriptor.decimals)
    }

    async fn token_descriptor(&self, token: Address, chain: Chain) -> Result<TokenDescriptor> {
        self.settings
            .read_retry
            .run("erc20_metadata", || self.provider.get_erc20_metadata(token, chain))
            .await
    }

    async fn estimate(&self, params: TxParams, chain: Chain) -> Result<FeeEstimate> {
        let estimate = self
            .settings
            .read_retry
            .run("fee_estimate", || self.provider.estimate_fee(params.clone(), chain))
            .await?;
        tracing::info!(
            %chain,
            gas_limit = estimate.gas_limit,
            gas_price = estimate.gas_price,
            total = %estimate.total,
            "fee estimate"
        );
        Ok(estimate)
    }

    /// Polls until the receipt shows up or `receipt_timeout` passes; `None` on timeout.
    pub async fn wait_for_receipt(&self, hash: B256, chain: Chain) -> Result<Option<ReceiptInfo>> {
        let start = Instant::now();
        loop {
            if let Some(receipt) = self.read_receipt(hash, chain).await? {
                if !receipt.status {
                    tracing::warn!(%chain, %hash, "transaction mined with status 0");
                }
                return Ok(Some(receipt));
            }
            if start.elapsed() >= self.settings.receipt_timeout {
                tracing::warn!(%chain, %hash, "receipt wait timed out");
                return Ok(None);
            }
            tracing::debug!(%chain, %hash, "receipt not available yet");
            sleep(self.settings.poll_interval).await;
        }
    }

    async fn read_receipt(&self, hash: B256, chain: Chain) -> Result<Option<ReceiptInfo>> {
        self.settings
            .read_retry
            .run("eth_getTransactionReceipt", || {
                self.provider.get_transaction_receipt(hash, chain)
            })
            .await
    }

    async fn submit(
        &self,
        flow: &mut TransferFlow,
        chain: Chain,
        to: Address,
        data: Bytes,
        value: Option<U256>,
    ) -> Result<B256> {
        let purpose = flow.next_step().ok_or_else(|| BridgeError::InvalidTransition {
            from: flow.state.to_string(),
            event: "submitted".to_string(),
        })?;
        let hash = self.provider.writer(chain).send_raw(to, data, value).await?;
        tracing::info!(%chain, %purpose, %hash, "transaction submitted");
        flow.advance(TransferEvent::Submitted(SubmittedTransaction::new(
            hash, chain, purpose,
        )))?;
        Ok(hash)
    }
}

impl TransferFlow {
    fn state_tx(&self) -> B256 {
        match &self.state {
            TransferState::Finalized { tx } => *tx,
            _ => self.last_tx().map(|tx| tx.hash).unwrap_or_default(),
        }
    }
}

fn fail(flow: &mut TransferFlow, err: BridgeError) -> BridgeError {
    tracing::warn!(error = %err, state = %flow.state, "transfer failed");
    if let Err(transition) = flow.advance(TransferEvent::Failed(err.to_string())) {
        tracing::debug!(error = %transition, "flow already terminal");
    }
    err
}

fn withdraw_failed(err: BridgeError) -> BridgeError {
    BridgeError::WithdrawFailed {
        chain: Chain::L2,
        tx_hash: None,
        reason: err.to_string(),
    }
}
