//! In-memory chain used by unit tests. Records every request it receives.

use crate::provider::ChainClients;
use crate::rpc::{
    BlockInfo, ChainReadClient, ChainWriteClient, LogEntry, ReceiptInfo, RpcError,
    TransactionInfo, TxParams,
};
use crate::types::{BlockRef, Chain};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::abi::TokenSeq;
use alloy_sol_types::{SolCall, SolType, SolValue};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    ChainId,
    ClientVersion,
    BlockNumber,
    Block(BlockRef),
    Transaction(B256),
    Receipt(B256),
    Balance(Address),
    Call { to: Address, data: Bytes },
    GasPrice,
    EstimateGas(TxParams),
    Send(TxParams),
}

impl RecordedCall {
    pub fn selector(&self) -> Option<[u8; 4]> {
        match self {
            RecordedCall::Call { data, .. } => selector_of(data),
            RecordedCall::EstimateGas(params) | RecordedCall::Send(params) => {
                selector_of(&params.data)
            }
            _ => None,
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    block_number: u64,
    blocks: HashMap<BlockRef, BlockInfo>,
    transactions: HashMap<B256, TransactionInfo>,
    receipts: HashMap<B256, ReceiptInfo>,
    balances: HashMap<Address, U256>,
    responses: HashMap<(Address, [u8; 4]), Bytes>,
    gas_limit: u64,
    gas_price: u128,
    read_failures: VecDeque<RpcError>,
    send_failures: HashMap<[u8; 4], RpcError>,
    reverting: HashMap<[u8; 4], bool>,
    send_logs: HashMap<[u8; 4], Vec<LogEntry>>,
    withhold_receipts: bool,
    sent: u64,
}

pub struct MockChain {
    chain: Chain,
    signer: Address,
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new(chain: Chain) -> Arc<Self> {
        let state = MockState {
            gas_limit: 21_000,
            gas_price: 1_000_000_000,
            ..MockState::default()
        };
        Arc::new(Self {
            chain,
            signer: Address::repeat_byte(0xaa),
            state: Mutex::new(state),
        })
    }

    pub fn clients(self: &Arc<Self>) -> ChainClients {
        ChainClients {
            read: Arc::clone(self) as Arc<dyn ChainReadClient>,
            write: Some(Arc::clone(self) as Arc<dyn ChainWriteClient>),
        }
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&RecordedCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn sends(&self) -> Vec<TxParams> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Send(params) => Some(params.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn set_block_number(&self, number: u64) {
        self.lock().block_number = number;
    }

    pub fn insert_block(&self, block: BlockInfo) {
        let mut state = self.lock();
        state.blocks.insert(BlockRef::Number(block.number), block.clone());
        state.blocks.insert(BlockRef::Hash(block.hash), block);
    }

    pub fn insert_transaction(&self, tx: TransactionInfo) {
        self.lock().transactions.insert(tx.hash, tx);
    }

    pub fn insert_receipt(&self, receipt: ReceiptInfo) {
        self.lock().receipts.insert(receipt.transaction_hash, receipt);
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.lock().balances.insert(address, balance);
    }

    pub fn set_gas(&self, gas_limit: u64, gas_price: u128) {
        let mut state = self.lock();
        state.gas_limit = gas_limit;
        state.gas_price = gas_price;
    }

    /// Answers `eth_call` to `to` with `selector` using the ABI-encoded `value`.
    pub fn respond<T: SolValue>(&self, to: Address, selector: [u8; 4], value: T)
    where
        for<'a> <T::SolType as SolType>::Token<'a>: TokenSeq<'a>,
    {
        self.respond_raw(to, selector, Bytes::from(value.abi_encode_params()));
    }

    pub fn respond_raw(&self, to: Address, selector: [u8; 4], data: Bytes) {
        self.lock().responses.insert((to, selector), data);
    }

    pub fn erc20(&self, token: Address, symbol: &str, decimals: u8) {
        self.respond(token, crate::abi::symbolCall::SELECTOR, (symbol.to_string(),));
        self.respond(
            token,
            crate::abi::decimalsCall::SELECTOR,
            (U256::from(decimals),),
        );
    }

    /// The next `times` read requests fail with `error`.
    pub fn fail_reads(&self, times: usize, error: RpcError) {
        let mut state = self.lock();
        for _ in 0..times {
            state.read_failures.push_back(error.clone());
        }
    }

    pub fn fail_sends(&self, selector: [u8; 4], error: RpcError) {
        self.lock().send_failures.insert(selector, error);
    }

    /// Transactions with `selector` are mined with status 0.
    pub fn revert_sends(&self, selector: [u8; 4]) {
        self.lock().reverting.insert(selector, true);
    }

    pub fn emit_on_send(&self, selector: [u8; 4], logs: Vec<LogEntry>) {
        self.lock().send_logs.insert(selector, logs);
    }

    /// Sent transactions stay unmined until this is switched off again.
    pub fn withhold_receipts(&self, withhold: bool) {
        self.lock().withhold_receipts = withhold;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_read(&self, call: RecordedCall) -> Result<MutexGuard<'_, MockState>, RpcError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.read_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

pub fn receipt(hash: B256, status: bool, logs: Vec<LogEntry>) -> ReceiptInfo {
    ReceiptInfo {
        transaction_hash: hash,
        block_number: Some(1),
        status,
        gas_used: 21_000,
        logs,
    }
}

fn selector_of(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4)?.try_into().ok()
}

#[async_trait]
impl ChainReadClient for MockChain {
    fn endpoint(&self) -> &str {
        match self.chain {
            Chain::L1 => "http://l1.mock",
            Chain::L2 => "http://l2.mock",
        }
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.record_read(RecordedCall::ChainId)?;
        Ok(match self.chain {
            Chain::L1 => 1,
            Chain::L2 => 137,
        })
    }

    async fn client_version(&self) -> Result<String, RpcError> {
        self.record_read(RecordedCall::ClientVersion)?;
        Ok(format!("mock/{}", self.chain))
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        Ok(self.record_read(RecordedCall::BlockNumber)?.block_number)
    }

    async fn block(&self, block: BlockRef) -> Result<Option<BlockInfo>, RpcError> {
        let state = self.record_read(RecordedCall::Block(block))?;
        Ok(state.blocks.get(&block).cloned())
    }

    async fn transaction(&self, hash: B256) -> Result<Option<TransactionInfo>, RpcError> {
        let state = self.record_read(RecordedCall::Transaction(hash))?;
        Ok(state.transactions.get(&hash).cloned())
    }

    async fn receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, RpcError> {
        let state = self.record_read(RecordedCall::Receipt(hash))?;
        Ok(state.receipts.get(&hash).cloned())
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcError> {
        let state = self.record_read(RecordedCall::Balance(address))?;
        Ok(state.balances.get(&address).copied().unwrap_or_default())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        let selector = selector_of(&data);
        let state = self.record_read(RecordedCall::Call { to, data })?;
        selector
            .and_then(|selector| state.responses.get(&(to, selector)).cloned())
            .ok_or_else(|| RpcError::rpc("execution reverted"))
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        Ok(self.record_read(RecordedCall::GasPrice)?.gas_price)
    }

    async fn estimate_gas(&self, params: TxParams) -> Result<u64, RpcError> {
        Ok(self.record_read(RecordedCall::EstimateGas(params))?.gas_limit)
    }
}

#[async_trait]
impl ChainWriteClient for MockChain {
    fn address(&self) -> Address {
        self.signer
    }

    async fn send_transaction(&self, params: TxParams) -> Result<B256, RpcError> {
        let selector = selector_of(&params.data).unwrap_or_default();
        let mut state = self.lock();
        state.calls.push(RecordedCall::Send(params.clone()));
        if let Some(error) = state.send_failures.get(&selector) {
            return Err(error.clone());
        }

        state.sent += 1;
        let mut seed = vec![self.chain as u8];
        seed.extend_from_slice(&state.sent.to_be_bytes());
        let hash = keccak256(seed);

        let tx = TransactionInfo {
            hash,
            from: self.signer,
            to: Some(params.to),
            value: params.value.unwrap_or_default(),
            input: params.data.clone(),
            nonce: state.sent - 1,
            block_number: None,
        };
        state.transactions.insert(hash, tx);

        if !state.withhold_receipts {
            let status = !state.reverting.get(&selector).copied().unwrap_or(false);
            let logs = state.send_logs.get(&selector).cloned().unwrap_or_default();
            state.receipts.insert(hash, receipt(hash, status, logs));
        }
        Ok(hash)
    }
}
