//! Debug introspection of built transactions
//!
//! Logs a human-readable summary of each transaction in a bundle before it
//! leaves the process. Only active at debug level.

use solana_sdk::message::VersionedMessage;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use tracing::debug;

/// Friendly name for the handful of programs we expect to see
pub fn program_name(program_id: &Pubkey) -> &'static str {
    let id = program_id.to_string();
    match id.as_str() {
        "11111111111111111111111111111111" => "System Program",
        "ComputeBudget111111111111111111111111111111" => "Compute Budget",
        "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA" => "Token Program",
        "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL" => "Associated Token",
        "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4" => "Jupiter Aggregator v6",
        _ => "unknown",
    }
}

/// Decode a compute budget instruction's data into a label, if recognized.
/// Discriminators: 2 = SetComputeUnitLimit(u32), 3 = SetComputeUnitPrice(u64).
pub fn describe_compute_budget(data: &[u8]) -> Option<String> {
    match data.first()? {
        2 => {
            let value = u32::from_le_bytes(data.get(1..5)?.try_into().ok()?);
            Some(format!("SetComputeUnitLimit({})", value))
        }
        3 => {
            let value = u64::from_le_bytes(data.get(1..9)?.try_into().ok()?);
            Some(format!("SetComputeUnitPrice({})", value))
        }
        _ => None,
    }
}

/// Log a one-line-per-instruction summary of a built transaction
pub fn log_transaction(bundle_index: usize, tx_index: usize, tx: &VersionedTransaction) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let version = match &tx.message {
        VersionedMessage::Legacy(_) => "legacy",
        VersionedMessage::V0(_) => "v0",
    };
    let static_keys = tx.message.static_account_keys();
    debug!(
        bundle_index,
        tx_index,
        version,
        accounts = static_keys.len(),
        instructions = tx.message.instructions().len(),
        blockhash = %tx.message.recent_blockhash(),
        "Built transaction"
    );

    for (i, compiled) in tx.message.instructions().iter().enumerate() {
        let program = static_keys
            .get(compiled.program_id_index as usize)
            .copied()
            .unwrap_or_default();
        let name = program_name(&program);
        let detail = if name == "Compute Budget" {
            describe_compute_budget(&compiled.data)
        } else {
            None
        };
        debug!(
            bundle_index,
            tx_index,
            instruction = i,
            program = %program,
            name,
            detail = detail.as_deref().unwrap_or(""),
            "  instruction"
        );
    }
}
