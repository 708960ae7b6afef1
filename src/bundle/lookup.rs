//! Address lookup table resolution and message rewriting
//!
//! Quote-service transactions arrive as compiled v0 messages whose account
//! lists are partly hidden behind address lookup tables. To prepend compute
//! budget instructions we decompile each message back to instructions with
//! full account metas, then recompile against the same tables with the
//! caller-chosen blockhash anchor.

use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::address_lookup_table::state::AddressLookupTable;
use solana_sdk::address_lookup_table::AddressLookupTableAccount;
use solana_sdk::compute_budget::{self, ComputeBudgetInstruction};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::{v0, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_instruction;
use solana_sdk::transaction::VersionedTransaction;

use crate::bundle::errors::BundleError;

/// Lookup table keys referenced by a message, in lookup order
pub fn referenced_lookup_keys(message: &VersionedMessage) -> Vec<Pubkey> {
    message
        .address_table_lookups()
        .map(|lookups| lookups.iter().map(|l| l.account_key).collect())
        .unwrap_or_default()
}

/// Fetch and deserialize the given lookup tables in one RPC round trip.
/// Every referenced table must exist; a missing table makes the message
/// impossible to decompile.
pub async fn fetch_lookup_tables(
    rpc: &Arc<RpcClient>,
    keys: &[Pubkey],
) -> Result<Vec<AddressLookupTableAccount>, BundleError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let accounts = rpc
        .get_multiple_accounts(keys)
        .await
        .map_err(|e| BundleError::Rpc(format!("lookup table fetch failed: {}", e)))?;

    let mut tables = Vec::with_capacity(keys.len());
    for (key, account) in keys.iter().zip(accounts) {
        let account = account
            .ok_or_else(|| BundleError::Rpc(format!("lookup table {} not found", key)))?;
        let table = AddressLookupTable::deserialize(&account.data)
            .map_err(|e| BundleError::Rpc(format!("lookup table {} deserialize failed: {}", key, e)))?;
        tables.push(AddressLookupTableAccount {
            key: *key,
            addresses: table.addresses.to_vec(),
        });
    }
    Ok(tables)
}

/// Reconstruct the instruction list of a compiled message, resolving loaded
/// addresses through the provided tables.
///
/// Account ordering in a v0 message is: static keys, then writable loaded
/// addresses (in lookup order), then readonly loaded addresses. Signers are
/// always static.
pub fn decompile_instructions(
    message: &VersionedMessage,
    tables: &[AddressLookupTableAccount],
) -> Result<Vec<Instruction>, BundleError> {
    let header = message.header();
    let static_keys = message.static_account_keys();
    let static_len = static_keys.len();

    let mut writable_loaded: Vec<Pubkey> = Vec::new();
    let mut readonly_loaded: Vec<Pubkey> = Vec::new();
    if let Some(lookups) = message.address_table_lookups() {
        for lookup in lookups {
            let table = tables
                .iter()
                .find(|t| t.key == lookup.account_key)
                .ok_or_else(|| {
                    BundleError::internal(format!(
                        "message references unresolved lookup table {}",
                        lookup.account_key
                    ))
                })?;
            for &idx in &lookup.writable_indexes {
                let address = table.addresses.get(idx as usize).ok_or_else(|| {
                    BundleError::internal(format!(
                        "lookup index {} out of bounds for table {}",
                        idx, lookup.account_key
                    ))
                })?;
                writable_loaded.push(*address);
            }
            for &idx in &lookup.readonly_indexes {
                let address = table.addresses.get(idx as usize).ok_or_else(|| {
                    BundleError::internal(format!(
                        "lookup index {} out of bounds for table {}",
                        idx, lookup.account_key
                    ))
                })?;
                readonly_loaded.push(*address);
            }
        }
    }

    let num_signers = header.num_required_signatures as usize;
    let writable_signers = num_signers - header.num_readonly_signed_accounts as usize;
    let writable_statics = static_len - header.num_readonly_unsigned_accounts as usize;

    let resolve = |index: usize| -> Result<AccountMeta, BundleError> {
        if index < static_len {
            let is_signer = index < num_signers;
            let is_writable = if is_signer {
                index < writable_signers
            } else {
                index < writable_statics
            };
            Ok(AccountMeta {
                pubkey: static_keys[index],
                is_signer,
                is_writable,
            })
        } else {
            let loaded = index - static_len;
            if loaded < writable_loaded.len() {
                Ok(AccountMeta::new(writable_loaded[loaded], false))
            } else {
                let ro = loaded - writable_loaded.len();
                readonly_loaded
                    .get(ro)
                    .map(|key| AccountMeta::new_readonly(*key, false))
                    .ok_or_else(|| {
                        BundleError::internal(format!("account index {} out of bounds", index))
                    })
            }
        }
    };

    message
        .instructions()
        .iter()
        .map(|compiled| {
            let program_id = resolve(compiled.program_id_index as usize)?.pubkey;
            let accounts = compiled
                .accounts
                .iter()
                .map(|&i| resolve(i as usize))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instruction {
                program_id,
                accounts,
                data: compiled.data.clone(),
            })
        })
        .collect()
}

/// Rewrite a swap transaction with compute budget instructions prepended
/// and the shared blockhash anchor applied.
///
/// Any compute budget instructions the quote service already placed are
/// dropped so the configured values win. Signatures come back as all-zero
/// placeholders; the caller signs later.
pub fn rewrite_with_compute_budget(
    tx: &VersionedTransaction,
    tables: &[AddressLookupTableAccount],
    recent_blockhash: Hash,
    unit_limit: u32,
    unit_price_micro_lamports: u64,
) -> Result<VersionedTransaction, BundleError> {
    let payer = *tx
        .message
        .static_account_keys()
        .first()
        .ok_or_else(|| BundleError::invalid_input("transaction has no accounts"))?;

    let decompiled = decompile_instructions(&tx.message, tables)?;
    let mut instructions = vec![
        ComputeBudgetInstruction::set_compute_unit_limit(unit_limit),
        ComputeBudgetInstruction::set_compute_unit_price(unit_price_micro_lamports),
    ];
    instructions.extend(
        decompiled
            .into_iter()
            .filter(|ix| ix.program_id != compute_budget::id()),
    );

    let message = v0::Message::try_compile(&payer, &instructions, tables, recent_blockhash)
        .map_err(|e| BundleError::internal(format!("message recompile failed: {}", e)))?;

    let num_signatures = message.header.num_required_signatures as usize;
    Ok(VersionedTransaction {
        signatures: vec![Signature::default(); num_signatures],
        message: VersionedMessage::V0(message),
    })
}

/// Build the unsigned tip transfer closing a bundle
pub fn build_tip_transaction(
    payer: &Pubkey,
    tip_account: &Pubkey,
    lamports: u64,
    recent_blockhash: Hash,
) -> Result<VersionedTransaction, BundleError> {
    let transfer = system_instruction::transfer(payer, tip_account, lamports);
    let message = v0::Message::try_compile(payer, &[transfer], &[], recent_blockhash)
        .map_err(|e| BundleError::internal(format!("tip message compile failed: {}", e)))?;

    Ok(VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::V0(message),
    })
}
