use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};

alloy_sol_types::sol! {
    // ERC20
    function balanceOf(address account) view returns (uint256);
    function approve(address spender, uint256 value) returns (bool);
    function decimals() view returns (uint8);
    function symbol() view returns (string);

    // L1 root chain manager
    function depositEtherFor(address user) payable;
    function depositFor(address user, address rootToken, bytes depositData);
    function exit(bytes inputData);

    // L2 child token and native token contract
    function withdraw(uint256 amount) payable;
}

pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// ERC20 `Transfer`; a transfer to the zero address is a child-token burn.
pub fn transfer_topic() -> B256 {
    event_topic("Transfer(address,address,uint256)")
}

/// Emitted by the L2 native token contract when MATIC is withdrawn.
pub fn native_withdraw_topic() -> B256 {
    event_topic("Withdraw(address,address,uint256,uint256,uint256)")
}

pub fn encode_approve_call(spender: Address, value: U256) -> Bytes {
    Bytes::from(approveCall { spender, value }.abi_encode())
}

pub fn encode_deposit_ether_for_call(user: Address) -> Bytes {
    Bytes::from(depositEtherForCall { user }.abi_encode())
}

/// `depositData` for ERC20 predicates is the ABI-encoded amount.
pub fn encode_deposit_for_call(user: Address, root_token: Address, amount: U256) -> Bytes {
    let call = depositForCall {
        user,
        rootToken: root_token,
        depositData: Bytes::from(amount.abi_encode()),
    };
    Bytes::from(call.abi_encode())
}

pub fn encode_withdraw_call(amount: U256) -> Bytes {
    Bytes::from(withdrawCall { amount }.abi_encode())
}

pub fn encode_exit_call(input_data: Bytes) -> Bytes {
    Bytes::from(exitCall { inputData: input_data }.abi_encode())
}

/// Some tokens return `bytes32` instead of `string` for `symbol()`.
pub fn decode_symbol(data: &[u8]) -> Option<String> {
    if let Ok(symbol) = symbolCall::abi_decode_returns(data) {
        return Some(symbol);
    }
    let raw = <B256>::abi_decode(data).ok()?;
    let trimmed: Vec<u8> = raw.iter().copied().take_while(|byte| *byte != 0).collect();
    String::from_utf8(trimmed).ok()
}
