//! # Domain Invariants
//!
//! Business rules shared by the services.

use super::entities::{EncodedCall, QuorumResult};
use super::errors::{BridgeError, EncodingError};

/// Invariant: quorum size.
///
/// A result is usable only once `shares >= min_required`.
pub fn invariant_quorum_met(result: &QuorumResult) -> Result<(), BridgeError> {
    if !result.is_usable() {
        return Err(BridgeError::InsufficientQuorum {
            got: result.shares.len(),
            required: result.min_required,
        });
    }
    Ok(())
}

/// Invariant: quorum cap.
///
/// Collection never keeps more than `max_accepted` shares.
pub fn invariant_quorum_capped(result: &QuorumResult) -> bool {
    result.shares.len() <= result.max_accepted
}

/// Invariant: word alignment.
///
/// Calldata after the selector is a whole number of 32-byte words.
pub fn invariant_word_aligned(call: &EncodedCall) -> Result<(), EncodingError> {
    if call.len_after_selector() % 32 != 0 {
        return Err(EncodingError::new(
            "calldata",
            format!(
                "{} bytes after selector is not a multiple of 32",
                call.len_after_selector()
            ),
        ));
    }
    Ok(())
}

/// Invariant: shares agree.
///
/// Every share of one request carries the same expiration and code.
pub fn invariant_shares_agree(result: &QuorumResult) -> bool {
    result
        .shares
        .iter()
        .all(|s| s.expected_expiration == result.expiration && s.code == result.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignatureShare;

    fn result(count: usize, min: usize, max: usize) -> QuorumResult {
        QuorumResult {
            shares: (0..count)
                .map(|i| SignatureShare {
                    witness: format!("w{}", i),
                    signature_hex: String::new(),
                    expected_expiration: 100,
                    code: "c".into(),
                })
                .collect(),
            min_required: min,
            max_accepted: max,
            expiration: 100,
            code: "c".into(),
        }
    }

    #[test]
    fn test_quorum_met() {
        assert!(invariant_quorum_met(&result(18, 18, 20)).is_ok());
    }

    #[test]
    fn test_quorum_not_met() {
        let err = invariant_quorum_met(&result(17, 18, 20)).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InsufficientQuorum {
                got: 17,
                required: 18
            }
        ));
    }

    #[test]
    fn test_quorum_capped() {
        assert!(invariant_quorum_capped(&result(20, 18, 20)));
        assert!(!invariant_quorum_capped(&result(21, 18, 20)));
    }

    #[test]
    fn test_word_aligned() {
        let mut call = EncodedCall {
            selector: [0; 4],
            static_words: vec![[0; 32]; 2],
            dynamic_tail: vec![0; 64],
        };
        assert!(invariant_word_aligned(&call).is_ok());
        call.dynamic_tail.push(0);
        assert!(invariant_word_aligned(&call).is_err());
    }

    #[test]
    fn test_shares_agree() {
        let mut r = result(3, 2, 5);
        assert!(invariant_shares_agree(&r));
        r.shares[1].code = "other".into();
        assert!(!invariant_shares_agree(&r));
    }
}
