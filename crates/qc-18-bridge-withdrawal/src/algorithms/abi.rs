//! # Binary Codec
//!
//! Hand-rolled, word-aligned ABI encoding for the fixed call catalog.
//!
//! ## Head/tail layout
//!
//! ```text
//! selector | head[0] .. head[n-1] | tail
//!            inline value, or offset = n * 32 + bytes of tail before this section
//! ```
//!
//! Every failure is an [`EncodingError`] naming the field. The only silent
//! coercion is [`encode_bytes32_from_text`], which truncates past 32 bytes.

use crate::domain::{Address, EncodedCall, EncodingError, Word};
use primitive_types::U256;
use sha3::{Digest, Keccak256};

/// ABI word size in bytes.
pub const WORD_SIZE: usize = 32;

/// One top-level argument of a call or tuple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiParam {
    /// Inline 32-byte value.
    Static(Word),
    /// Encoded dynamic section (length word + content); the head holds its offset.
    Dynamic(Vec<u8>),
}

/// 4-byte function selector: Keccak-256 of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Strip an optional `0x`/`0X` prefix.
pub fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Decode hex (prefix optional), naming `field` on failure.
pub fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, EncodingError> {
    hex::decode(strip_hex_prefix(value.trim())).map_err(|e| EncodingError::new(field, e.to_string()))
}

/// Left-padded address word from hex text.
pub fn encode_address(value: &str) -> Result<Word, EncodingError> {
    Ok(encode_address_word(&Address::parse(value)?))
}

/// Left-padded address word.
pub fn encode_address_word(address: &Address) -> Word {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Big-endian `uint<bits>` word.
pub fn encode_uint(value: U256, bits: u32) -> Result<Word, EncodingError> {
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(EncodingError::new("bits", format!("uint{} is not an ABI type", bits)));
    }
    if value.bits() > bits as usize {
        return Err(EncodingError::new(
            format!("uint{}", bits),
            format!("{} does not fit in {} bits", value, bits),
        ));
    }
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    Ok(word)
}

/// `uint<bits>` word from decimal text; negative input is rejected.
pub fn encode_uint_str(field: &str, value: &str, bits: u32) -> Result<Word, EncodingError> {
    let trimmed = value.trim();
    if trimmed.starts_with('-') {
        return Err(EncodingError::new(field, "negative value"));
    }
    let parsed = U256::from_dec_str(trimmed)
        .map_err(|e| EncodingError::new(field, format!("{:?}", e)))?;
    encode_uint(parsed, bits).map_err(|e| EncodingError::new(field, e.reason))
}

/// Boolean word.
pub fn encode_bool(value: bool) -> Word {
    let mut word = [0u8; 32];
    word[31] = value as u8;
    word
}

/// Right-padded `bytes32` from UTF-8 text.
///
/// Text longer than 32 bytes is truncated without error.
pub fn encode_bytes32_from_text(text: &str) -> Word {
    let bytes = text.as_bytes();
    let len = bytes.len().min(WORD_SIZE);
    let mut word = [0u8; 32];
    word[..len].copy_from_slice(&bytes[..len]);
    word
}

/// Length word for a dynamic section.
fn length_word(len: usize) -> Word {
    let mut word = [0u8; 32];
    U256::from(len).to_big_endian(&mut word);
    word
}

/// Dynamic `bytes`/`string`: length word, then content zero-padded to a word multiple.
pub fn encode_dynamic_bytes(value: &[u8]) -> Vec<u8> {
    let padded = value.len().div_ceil(WORD_SIZE) * WORD_SIZE;
    let mut out = Vec::with_capacity(WORD_SIZE + padded);
    out.extend_from_slice(&length_word(value.len()));
    out.extend_from_slice(value);
    out.resize(WORD_SIZE + padded, 0);
    out
}

/// Dynamic `string`.
pub fn encode_string(value: &str) -> Vec<u8> {
    encode_dynamic_bytes(value.as_bytes())
}

/// Dynamic array of statically-sized elements: length word, then one word per element.
pub fn encode_dynamic_array<T>(
    elements: &[T],
    encoder: impl Fn(&T) -> Result<Word, EncodingError>,
) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(WORD_SIZE * (elements.len() + 1));
    out.extend_from_slice(&length_word(elements.len()));
    for element in elements {
        out.extend_from_slice(&encoder(element)?);
    }
    Ok(out)
}

/// Head words and tail for a tuple of top-level params.
pub fn encode_tuple(params: &[AbiParam]) -> (Vec<Word>, Vec<u8>) {
    let head_len = params.len() * WORD_SIZE;
    let mut head = Vec::with_capacity(params.len());
    let mut tail = Vec::new();
    for param in params {
        match param {
            AbiParam::Static(word) => head.push(*word),
            AbiParam::Dynamic(section) => {
                head.push(length_word(head_len + tail.len()));
                tail.extend_from_slice(section);
            }
        }
    }
    (head, tail)
}

/// Tuple encoding as one contiguous buffer.
pub fn encode_tuple_bytes(params: &[AbiParam]) -> Vec<u8> {
    let (head, tail) = encode_tuple(params);
    let mut out = Vec::with_capacity(head.len() * WORD_SIZE + tail.len());
    for word in &head {
        out.extend_from_slice(word);
    }
    out.extend_from_slice(&tail);
    out
}

/// Full call: selector, head region, dynamic tail.
pub fn encode_call_header(selector: [u8; 4], params: &[AbiParam]) -> EncodedCall {
    let (static_words, dynamic_tail) = encode_tuple(params);
    EncodedCall {
        selector,
        static_words,
        dynamic_tail,
    }
}

/// Word starting at `offset`.
pub fn read_word(data: &[u8], offset: usize) -> Result<Word, EncodingError> {
    let end = offset
        .checked_add(WORD_SIZE)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            EncodingError::new(
                "data",
                format!("word at {} out of bounds ({} bytes)", offset, data.len()),
            )
        })?;
    let mut word = [0u8; 32];
    word.copy_from_slice(&data[offset..end]);
    Ok(word)
}

/// Word read as an in-buffer offset or length.
fn word_to_usize(field: &str, word: &Word) -> Result<usize, EncodingError> {
    let value = U256::from_big_endian(word);
    if value > U256::from(u32::MAX) {
        return Err(EncodingError::new(field, format!("{} is not a sane size", value)));
    }
    Ok(value.as_usize())
}

/// Dynamic `bytes` whose offset sits in head slot `head_index`.
pub fn decode_dynamic_bytes(data: &[u8], head_index: usize) -> Result<Vec<u8>, EncodingError> {
    let offset = word_to_usize("offset", &read_word(data, head_index * WORD_SIZE)?)?;
    let len = word_to_usize("length", &read_word(data, offset)?)?;
    let start = offset + WORD_SIZE;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            EncodingError::new(
                "bytes",
                format!("{} bytes at {} overrun {} byte buffer", len, start, data.len()),
            )
        })?;
    Ok(data[start..end].to_vec())
}

/// Address from the low 20 bytes of a word; the 12 high bytes must be zero.
pub fn decode_address_from_tail(word: &[u8]) -> Result<Address, EncodingError> {
    if word.len() < WORD_SIZE {
        return Err(EncodingError::new(
            "address",
            format!("expected a 32-byte word, got {} bytes", word.len()),
        ));
    }
    if word[..12].iter().any(|b| *b != 0) {
        return Err(EncodingError::new("address", "dirty high-order bytes"));
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..WORD_SIZE]);
    Ok(Address::from_bytes(bytes))
}

/// Address from a hex call result.
pub fn decode_address_from_hex(value: &str) -> Result<Address, EncodingError> {
    decode_address_from_tail(&decode_hex("address", value)?)
}

/// Unsigned integer from hex. Odd-length input is left-padded; only the first word is read.
pub fn decode_uint_from_hex(value: &str) -> Result<U256, EncodingError> {
    let digits = strip_hex_prefix(value.trim());
    if digits.is_empty() {
        return Err(EncodingError::new("uint", "empty result"));
    }
    let bytes = if digits.len() % 2 == 1 {
        decode_hex("uint", &format!("0{}", digits))?
    } else {
        decode_hex("uint", digits)?
    };
    let len = bytes.len().min(WORD_SIZE);
    Ok(U256::from_big_endian(&bytes[..len]))
}

/// Boolean from a hex call result.
pub fn decode_bool_from_hex(value: &str) -> Result<bool, EncodingError> {
    match decode_uint_from_hex(value)? {
        v if v.is_zero() => Ok(false),
        v if v == U256::one() => Ok(true),
        v => Err(EncodingError::new("bool", format!("{} is not 0 or 1", v))),
    }
}
