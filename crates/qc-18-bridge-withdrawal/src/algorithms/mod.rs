//! # Algorithms Module
//!
//! Pure encoding, conversion and scheduling logic. Nothing here performs I/O.

pub mod abi;
pub mod contract_calls;
pub mod retry;
pub mod signature_format;
pub mod units;

pub use abi::{
    decode_address_from_hex, decode_address_from_tail, decode_bool_from_hex,
    decode_dynamic_bytes, decode_uint_from_hex, encode_address, encode_address_word, encode_bool,
    encode_bytes32_from_text, encode_call_header, encode_dynamic_array, encode_dynamic_bytes,
    encode_string, encode_tuple, encode_uint, encode_uint_str, selector, AbiParam, WORD_SIZE,
};
pub use contract_calls::{
    decode_allowance, decode_approval, decode_owner, encode_connection,
    encode_cross_chain_transfer, encode_withdraw, erc20_allowance, erc20_approve,
    erc20_balance_of, erc721_approve, erc721_get_approved, erc721_is_approved_for_all,
    erc721_owner_of, erc721_set_approval_for_all, WithdrawCall,
};
pub use retry::{run_with_retry, Attempt, RetryError, RetryPolicy};
pub use signature_format::{
    resolve_signature, wrap_signature, ResolvedSignature, SignatureFormat,
    WRAPPED_SIGNATURE_MAGIC,
};
pub use units::{from_base_units, to_base_units};
