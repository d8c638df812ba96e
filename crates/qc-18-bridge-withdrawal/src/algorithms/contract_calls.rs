//! # Contract Call Builder
//!
//! Calldata for the fixed catalog of on-chain functions this subsystem talks to.
//!
//! | Call | Signature |
//! |------|-----------|
//! | ERC-20 approve | `approve(address,uint256)` |
//! | ERC-20 allowance | `allowance(address,address)` |
//! | ERC-20 balance | `balanceOf(address)` |
//! | ERC-721 approve | `approve(address,uint256)` |
//! | ERC-721 owner | `ownerOf(uint256)` |
//! | ERC-721 approved | `getApproved(uint256)` |
//! | ERC-721 operator status | `isApprovedForAll(address,address)` |
//! | ERC-721 operator grant | `setApprovalForAll(address,bool)` |
//! | Withdrawal | `withdraw(address,address,uint256,uint256,bytes32,uint8[],bytes32[])` |
//! | Connection lifecycle | see [`ConnectionAction::signature`] |
//! | Cross-chain transfer | `crossChainTransfer(address,address,uint256,string)` |

use super::abi::{
    decode_address_from_hex, decode_bool_from_hex, decode_uint_from_hex, encode_address_word,
    encode_bool, encode_bytes32_from_text, encode_call_header, encode_dynamic_array,
    encode_string, encode_uint, selector, AbiParam,
};
use crate::domain::{
    invariant_word_aligned, Address, ConnectionAction, EncodedCall, EncodingError, QuorumResult,
    Word,
};
use primitive_types::U256;

/// ERC-20 and ERC-721 `approve`.
pub const SIG_ERC20_APPROVE: &str = "approve(address,uint256)";
/// ERC-20 `allowance`.
pub const SIG_ERC20_ALLOWANCE: &str = "allowance(address,address)";
/// ERC-20 `balanceOf`.
pub const SIG_ERC20_BALANCE_OF: &str = "balanceOf(address)";
/// ERC-721 `ownerOf`.
pub const SIG_ERC721_OWNER_OF: &str = "ownerOf(uint256)";
/// ERC-721 `getApproved`.
pub const SIG_ERC721_GET_APPROVED: &str = "getApproved(uint256)";
/// ERC-721 `isApprovedForAll`.
pub const SIG_ERC721_IS_APPROVED_FOR_ALL: &str = "isApprovedForAll(address,address)";
/// ERC-721 `setApprovalForAll`.
pub const SIG_ERC721_SET_APPROVAL_FOR_ALL: &str = "setApprovalForAll(address,bool)";
/// Quorum-authorized withdrawal.
pub const SIG_WITHDRAW: &str =
    "withdraw(address,address,uint256,uint256,bytes32,uint8[],bytes32[])";
/// Cross-chain transfer.
pub const SIG_CROSS_CHAIN_TRANSFER: &str = "crossChainTransfer(address,address,uint256,string)";

fn address(value: &Address) -> AbiParam {
    AbiParam::Static(encode_address_word(value))
}

fn uint256(value: U256) -> Result<AbiParam, EncodingError> {
    Ok(AbiParam::Static(encode_uint(value, 256)?))
}

fn finish(call: EncodedCall) -> Result<EncodedCall, EncodingError> {
    invariant_word_aligned(&call)?;
    Ok(call)
}

// =============================================================================
// ERC-20
// =============================================================================

/// `approve(spender, amount)`.
pub fn erc20_approve(spender: &Address, amount: U256) -> Result<EncodedCall, EncodingError> {
    finish(encode_call_header(
        selector(SIG_ERC20_APPROVE),
        &[address(spender), uint256(amount)?],
    ))
}

/// `allowance(owner, spender)`.
pub fn erc20_allowance(owner: &Address, spender: &Address) -> EncodedCall {
    encode_call_header(
        selector(SIG_ERC20_ALLOWANCE),
        &[address(owner), address(spender)],
    )
}

/// `balanceOf(owner)`.
pub fn erc20_balance_of(owner: &Address) -> EncodedCall {
    encode_call_header(selector(SIG_ERC20_BALANCE_OF), &[address(owner)])
}

// =============================================================================
// ERC-721
// =============================================================================

/// `approve(to, tokenId)`. Same selector as the ERC-20 form.
pub fn erc721_approve(to: &Address, token_id: U256) -> Result<EncodedCall, EncodingError> {
    finish(encode_call_header(
        selector(SIG_ERC20_APPROVE),
        &[address(to), uint256(token_id)?],
    ))
}

/// `ownerOf(tokenId)`.
pub fn erc721_owner_of(token_id: U256) -> Result<EncodedCall, EncodingError> {
    finish(encode_call_header(
        selector(SIG_ERC721_OWNER_OF),
        &[uint256(token_id)?],
    ))
}

/// `getApproved(tokenId)`.
pub fn erc721_get_approved(token_id: U256) -> Result<EncodedCall, EncodingError> {
    finish(encode_call_header(
        selector(SIG_ERC721_GET_APPROVED),
        &[uint256(token_id)?],
    ))
}

/// `isApprovedForAll(owner, operator)`.
pub fn erc721_is_approved_for_all(owner: &Address, operator: &Address) -> EncodedCall {
    encode_call_header(
        selector(SIG_ERC721_IS_APPROVED_FOR_ALL),
        &[address(owner), address(operator)],
    )
}

/// `setApprovalForAll(operator, approved)`.
pub fn erc721_set_approval_for_all(operator: &Address, approved: bool) -> EncodedCall {
    encode_call_header(
        selector(SIG_ERC721_SET_APPROVAL_FOR_ALL),
        &[address(operator), AbiParam::Static(encode_bool(approved))],
    )
}

// =============================================================================
// Withdrawal
// =============================================================================

/// Arguments of the withdrawal call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawCall {
    /// Token released by the contract.
    pub token: Address,
    /// Recipient.
    pub user: Address,
    /// Amount in base units.
    pub amount: U256,
    /// Expiration the witnesses signed over.
    pub expiration: u64,
    /// Authorization code, packed into `bytes32`.
    pub code: String,
    /// One recovery id per witness signature.
    pub recovery_ids: Vec<u8>,
    /// `r, s` per witness signature, flattened.
    pub rs: Vec<Word>,
}

impl WithdrawCall {
    /// Assemble from a collected quorum.
    pub fn from_quorum(
        token: Address,
        user: Address,
        amount: U256,
        quorum: &QuorumResult,
    ) -> Result<Self, EncodingError> {
        let (recovery_ids, rs) = quorum.split_signatures()?;
        Ok(Self {
            token,
            user,
            amount,
            expiration: quorum.expiration,
            code: quorum.code.clone(),
            recovery_ids,
            rs,
        })
    }
}

/// `withdraw(token, user, amount, expiration, code, v[], rs[])`.
///
/// Head: five inline words then two offsets. With `n` signatures the
/// encoding after the selector is `7*32 + (1+n)*32 + (1+2n)*32` bytes.
pub fn encode_withdraw(call: &WithdrawCall) -> Result<EncodedCall, EncodingError> {
    if call.rs.len() != call.recovery_ids.len() * 2 {
        return Err(EncodingError::new(
            "rs",
            format!(
                "expected {} words for {} signatures, got {}",
                call.recovery_ids.len() * 2,
                call.recovery_ids.len(),
                call.rs.len()
            ),
        ));
    }
    let v_section = encode_dynamic_array(&call.recovery_ids, |v| encode_uint(U256::from(*v), 8))?;
    let rs_section = encode_dynamic_array(&call.rs, |word| Ok(*word))?;

    finish(encode_call_header(
        selector(SIG_WITHDRAW),
        &[
            address(&call.token),
            address(&call.user),
            uint256(call.amount)?,
            uint256(U256::from(call.expiration))?,
            AbiParam::Static(encode_bytes32_from_text(&call.code)),
            AbiParam::Dynamic(v_section),
            AbiParam::Dynamic(rs_section),
        ],
    ))
}

// =============================================================================
// Connection lifecycle and cross-chain
// =============================================================================

/// Connection lifecycle call; `peer` is required for agree/reject and ignored otherwise.
pub fn encode_connection(
    action: ConnectionAction,
    peer: Option<&Address>,
) -> Result<EncodedCall, EncodingError> {
    let params = match (action.takes_peer(), peer) {
        (true, Some(peer)) => vec![address(peer)],
        (true, None) => {
            return Err(EncodingError::new(
                "peer",
                format!("{} requires a peer address", action.signature()),
            ))
        }
        (false, _) => Vec::new(),
    };
    Ok(encode_call_header(selector(action.signature()), &params))
}

/// `crossChainTransfer(destination, token, amount, chain)`.
pub fn encode_cross_chain_transfer(
    destination: &Address,
    token: &Address,
    amount: U256,
    chain: &str,
) -> Result<EncodedCall, EncodingError> {
    if chain.is_empty() {
        return Err(EncodingError::new("chain", "destination chain is empty"));
    }
    finish(encode_call_header(
        selector(SIG_CROSS_CHAIN_TRANSFER),
        &[
            address(destination),
            address(token),
            uint256(amount)?,
            AbiParam::Dynamic(encode_string(chain)),
        ],
    ))
}

// =============================================================================
// Result decoders
// =============================================================================

/// `allowance` / `balanceOf` result.
pub fn decode_allowance(result: &str) -> Result<U256, EncodingError> {
    decode_uint_from_hex(result)
}

/// `ownerOf` / `getApproved` result.
pub fn decode_owner(result: &str) -> Result<Address, EncodingError> {
    decode_address_from_hex(result)
}

/// `isApprovedForAll` result.
pub fn decode_approval(result: &str) -> Result<bool, EncodingError> {
    decode_bool_from_hex(result)
}
