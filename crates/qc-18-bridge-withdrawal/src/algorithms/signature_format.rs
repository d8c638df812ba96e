//! # Signature Format Resolver
//!
//! Detects signatures produced by counterfactual smart accounts and unwraps
//! them to the inner signature.
//!
//! A wrapped signature is `abi.encode(address factory, bytes factoryCalldata,
//! bytes innerSignature) ++ MAGIC`, where MAGIC is a fixed 32-byte suffix.

use super::abi::{
    decode_dynamic_bytes, decode_hex, encode_address_word, encode_dynamic_bytes,
    encode_tuple_bytes, AbiParam, WORD_SIZE,
};
use crate::domain::{Address, EncodingError, Word, ECDSA_SIGNATURE_LEN};
use tracing::warn;

/// Trailing marker of a wrapped signature.
pub const WRAPPED_SIGNATURE_MAGIC: Word = [
    0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92,
    0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92,
];

/// Head slot of the inner signature in the wrapping tuple.
const INNER_SIGNATURE_SLOT: usize = 2;

/// Classification of a raw signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureFormat {
    /// No magic suffix; passed through untouched.
    Standard,
    /// Wrapped, inner payload is a 65-byte ECDSA signature.
    Unwrapped,
    /// Wrapped, inner payload is not 65 bytes; used as-is.
    UnwrappedNonStandard,
}

/// Resolver output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSignature {
    /// Signature to send onward. Identical to the input for [`SignatureFormat::Standard`].
    pub signature: String,
    /// How it was classified.
    pub format: SignatureFormat,
}

impl ResolvedSignature {
    /// The inner layout did not match the expected ECDSA shape.
    pub fn has_warning(&self) -> bool {
        self.format == SignatureFormat::UnwrappedNonStandard
    }
}

/// Classify `raw` and unwrap it if it carries the magic suffix.
pub fn resolve_signature(raw: &str) -> Result<ResolvedSignature, EncodingError> {
    let bytes = decode_hex("signature", raw)?;
    if bytes.len() < WORD_SIZE || bytes[bytes.len() - WORD_SIZE..] != WRAPPED_SIGNATURE_MAGIC {
        return Ok(ResolvedSignature {
            signature: raw.to_string(),
            format: SignatureFormat::Standard,
        });
    }

    let tuple = &bytes[..bytes.len() - WORD_SIZE];
    let inner = decode_dynamic_bytes(tuple, INNER_SIGNATURE_SLOT)
        .map_err(|e| EncodingError::new("signature", format!("wrapped payload: {}", e.reason)))?;

    let format = if inner.len() == ECDSA_SIGNATURE_LEN {
        SignatureFormat::Unwrapped
    } else {
        // Contract (non-ECDSA) signatures land here; forwarded unchanged.
        warn!(
            inner_len = inner.len(),
            "[qc-18] Wrapped signature does not contain a 65-byte ECDSA payload, using it as-is"
        );
        SignatureFormat::UnwrappedNonStandard
    };

    Ok(ResolvedSignature {
        signature: format!("0x{}", hex::encode(inner)),
        format,
    })
}

/// Wrap `inner` the way a counterfactual account does.
pub fn wrap_signature(factory: &Address, calldata: &[u8], inner: &[u8]) -> Vec<u8> {
    let mut out = encode_tuple_bytes(&[
        AbiParam::Static(encode_address_word(factory)),
        AbiParam::Dynamic(encode_dynamic_bytes(calldata)),
        AbiParam::Dynamic(encode_dynamic_bytes(inner)),
    ]);
    out.extend_from_slice(&WRAPPED_SIGNATURE_MAGIC);
    out
}
