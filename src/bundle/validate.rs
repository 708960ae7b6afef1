//! Wire codec and pre-submission guard
//!
//! Transactions cross the API as base64 bincode blobs. Before anything is
//! sent to the relay every blob must decode, carry at least one real
//! signature, and name the expected signer as fee payer. One bad
//! transaction rejects the whole call before any bundle is submitted.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

use crate::bundle::errors::BundleError;

/// Decode one base64 bincode blob into a versioned transaction
pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, BundleError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| BundleError::invalid_input(format!("transaction is not valid base64: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| BundleError::invalid_input(format!("transaction failed to deserialize: {}", e)))
}

/// Serialize a versioned transaction back to its base64 wire form
pub fn encode_transaction(tx: &VersionedTransaction) -> Result<String, BundleError> {
    let bytes = bincode::serialize(tx)
        .map_err(|e| BundleError::internal(format!("transaction serialization failed: {}", e)))?;
    Ok(STANDARD.encode(bytes))
}

/// Guard a flat list of signed transactions before submission.
///
/// Checks, per transaction: it decodes, it carries at least one signature
/// slot, at least one signature is not the all-zero placeholder, and the
/// fee payer (first static account key) matches `signer_pubkey`. Indices
/// in errors are 0-based over the flattened list.
pub fn validate_signed_transactions(
    transactions: &[String],
    signer_pubkey: &str,
) -> Result<(), BundleError> {
    for (index, encoded) in transactions.iter().enumerate() {
        let tx = decode_transaction(encoded).map_err(|e| BundleError::SignatureMismatch {
            index,
            reason: e.to_string(),
        })?;

        if tx.signatures.is_empty() {
            return Err(BundleError::SignatureMismatch {
                index,
                reason: "transaction carries no signature slots".to_string(),
            });
        }

        let placeholder = Signature::default();
        if tx.signatures.iter().all(|sig| *sig == placeholder) {
            return Err(BundleError::SignatureMismatch {
                index,
                reason: "transaction is unsigned (all signatures are placeholders)".to_string(),
            });
        }

        let fee_payer = tx
            .message
            .static_account_keys()
            .first()
            .map(|k| k.to_string())
            .unwrap_or_default();
        if fee_payer != signer_pubkey {
            return Err(BundleError::SignatureMismatch {
                index,
                reason: format!(
                    "fee payer {} does not match signer {}",
                    fee_payer, signer_pubkey
                ),
            });
        }
    }
    Ok(())
}

/// Extract the first signature of each transaction for reporting.
/// Blobs that fail to decode are skipped; this runs after the guard, so a
/// failure here is a local decode hiccup and not worth aborting for.
pub fn extract_signatures(transactions: &[String]) -> Vec<String> {
    transactions
        .iter()
        .filter_map(|encoded| decode_transaction(encoded).ok())
        .filter_map(|tx| tx.signatures.first().map(|sig| sig.to_string()))
        .collect()
}

/// Regroup a flat list of signed transactions back into bundles by the
/// original bundle lengths. A length mismatch means the caller signed a
/// different set than was built and is fatal.
pub fn regroup_signed(
    flat: Vec<String>,
    bundle_lengths: &[usize],
) -> Result<Vec<Vec<String>>, BundleError> {
    let expected: usize = bundle_lengths.iter().sum();
    if flat.len() != expected {
        return Err(BundleError::invalid_input(format!(
            "signed transaction count {} does not match expected {}",
            flat.len(),
            expected
        )));
    }

    let mut bundles = Vec::with_capacity(bundle_lengths.len());
    let mut iter = flat.into_iter();
    for &len in bundle_lengths {
        bundles.push(iter.by_ref().take(len).collect());
    }
    Ok(bundles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::message::{Message, VersionedMessage};
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::system_instruction;

    fn make_transaction(payer: &Pubkey, signed: bool) -> String {
        let ix = system_instruction::transfer(payer, &Pubkey::new_unique(), 1);
        let message = Message::new_with_blockhash(&[ix], Some(payer), &Hash::new_unique());
        let num_signatures = message.header.num_required_signatures as usize;
        let signatures = if signed {
            vec![Signature::from([7u8; 64]); num_signatures]
        } else {
            vec![Signature::default(); num_signatures]
        };
        let tx = VersionedTransaction {
            signatures,
            message: VersionedMessage::Legacy(message),
        };
        encode_transaction(&tx).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let payer = Pubkey::new_unique();
        let encoded = make_transaction(&payer, true);
        let tx = decode_transaction(&encoded).unwrap();
        assert_eq!(tx.message.static_account_keys()[0], payer);
        assert_eq!(encode_transaction(&tx).unwrap(), encoded);
    }

    #[test]
    fn test_guard_accepts_signed_transactions() {
        let payer = Pubkey::new_unique();
        let txs = vec![make_transaction(&payer, true), make_transaction(&payer, true)];
        assert!(validate_signed_transactions(&txs, &payer.to_string()).is_ok());
    }

    #[test]
    fn test_guard_rejects_unsigned_transaction() {
        let payer = Pubkey::new_unique();
        let txs = vec![make_transaction(&payer, true), make_transaction(&payer, false)];
        let err = validate_signed_transactions(&txs, &payer.to_string()).unwrap_err();
        match err {
            BundleError::SignatureMismatch { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("unsigned"));
            }
            other => panic!("expected SignatureMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_guard_rejects_wrong_fee_payer() {
        let payer = Pubkey::new_unique();
        let txs = vec![make_transaction(&payer, true)];
        let other_signer = Pubkey::new_unique().to_string();
        let err = validate_signed_transactions(&txs, &other_signer).unwrap_err();
        match err {
            BundleError::SignatureMismatch { index, reason } => {
                assert_eq!(index, 0);
                assert!(reason.contains("fee payer"));
            }
            other => panic!("expected SignatureMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_guard_rejects_garbage_blob() {
        let err = validate_signed_transactions(&["not base64!!".to_string()], "x").unwrap_err();
        assert!(matches!(err, BundleError::SignatureMismatch { index: 0, .. }));

        let valid_b64_garbage = STANDARD.encode([1u8, 2, 3]);
        let err = validate_signed_transactions(&[valid_b64_garbage], "x").unwrap_err();
        assert!(matches!(err, BundleError::SignatureMismatch { index: 0, .. }));
    }

    #[test]
    fn test_extract_signatures_skips_bad_blobs() {
        let payer = Pubkey::new_unique();
        let txs = vec![
            make_transaction(&payer, true),
            "garbage".to_string(),
            make_transaction(&payer, true),
        ];
        let sigs = extract_signatures(&txs);
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0], bs58::encode([7u8; 64]).into_string());
    }

    #[test]
    fn test_regroup_by_lengths() {
        let flat: Vec<String> = (0..5).map(|i| format!("tx{}", i)).collect();
        let bundles = regroup_signed(flat, &[2, 3]).unwrap();
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0], vec!["tx0", "tx1"]);
        assert_eq!(bundles[1], vec!["tx2", "tx3", "tx4"]);
    }

    #[test]
    fn test_regroup_length_mismatch_is_fatal() {
        let flat: Vec<String> = (0..4).map(|i| format!("tx{}", i)).collect();
        assert!(regroup_signed(flat, &[2, 3]).is_err());
    }
}
