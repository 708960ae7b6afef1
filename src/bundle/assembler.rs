//! Bundle assembly
//!
//! Turns a build request (branches of output mints) into unsigned bundles.
//! One bundle per branch: the branch's swap transactions in order, each
//! rewritten with compute budget instructions and the shared blockhash
//! anchor, plus a tip transfer as the final transaction.
//!
//! The anchor is captured from the first fetched swap of the first branch
//! and applied to every transaction in the batch, so one signing pass
//! covers everything and all bundles expire together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use rand::Rng;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use tracing::{debug, info};

use crate::bundle::errors::BundleError;
use crate::bundle::lookup;
use crate::bundle::validate::{decode_transaction, encode_transaction};
use crate::config::{ComputeConfig, TipConfig};
use crate::inspect;
use crate::quote::{OrderParams, QuoteClient};
use crate::types::{BuildBundlesRequest, BuildBundlesResponse, TipPolicy};

pub struct BundleAssembler {
    quotes: QuoteClient,
    rpc: Arc<RpcClient>,
    tip_accounts: Vec<Pubkey>,
    tip_policy: TipPolicy,
    tip_cursor: AtomicUsize,
    default_tip_lamports: u64,
    max_txs_per_bundle: usize,
    cu_limit: u32,
    cu_price: u64,
}

impl BundleAssembler {
    pub fn new(
        quotes: QuoteClient,
        rpc: Arc<RpcClient>,
        tip: &TipConfig,
        compute: &ComputeConfig,
    ) -> Result<Self, BundleError> {
        let tip_accounts = tip
            .accounts
            .iter()
            .map(|s| {
                s.parse::<Pubkey>()
                    .map_err(|e| BundleError::internal(format!("bad tip account {}: {}", s, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if tip_accounts.is_empty() {
            return Err(BundleError::internal("tip account pool is empty"));
        }

        Ok(Self {
            quotes,
            rpc,
            tip_accounts,
            tip_policy: tip.policy,
            tip_cursor: AtomicUsize::new(0),
            default_tip_lamports: tip.lamports,
            max_txs_per_bundle: tip.max_txs_per_bundle,
            cu_limit: compute.unit_limit,
            cu_price: compute.unit_price_micro_lamports,
        })
    }

    fn validate_request(&self, request: &BuildBundlesRequest) -> Result<Pubkey, BundleError> {
        if request.branches.is_empty() {
            return Err(BundleError::invalid_input("branches must not be empty"));
        }
        if request.input_mint.is_empty() {
            return Err(BundleError::invalid_input("inputMint is required"));
        }
        if request.amount == 0 {
            return Err(BundleError::invalid_input("amount must be positive"));
        }
        for (i, branch) in request.branches.iter().enumerate() {
            if branch.is_empty() {
                return Err(BundleError::bad_branch(i + 1, "contains no swaps"));
            }
            // One slot is reserved for the tip transaction
            if branch.len() + 1 > self.max_txs_per_bundle {
                return Err(BundleError::bad_branch(
                    i + 1,
                    format!(
                        "has {} swaps, limit is {} per bundle including the tip",
                        branch.len(),
                        self.max_txs_per_bundle
                    ),
                ));
            }
        }
        request
            .signer_pubkey
            .parse::<Pubkey>()
            .map_err(|e| BundleError::invalid_input(format!("invalid signer pubkey: {}", e)))
    }

    fn pick_tip_account(&self) -> Pubkey {
        match self.tip_policy {
            TipPolicy::Random => {
                let idx = rand::thread_rng().gen_range(0..self.tip_accounts.len());
                self.tip_accounts[idx]
            }
            TipPolicy::RoundRobin => {
                let idx = self.tip_cursor.fetch_add(1, Ordering::Relaxed);
                self.tip_accounts[idx % self.tip_accounts.len()]
            }
        }
    }

    /// Fetch every swap of one branch concurrently, attributing failures to
    /// their 1-based branch and swap positions
    async fn fetch_branch(
        &self,
        branch_index: usize,
        mints: &[String],
        request: &BuildBundlesRequest,
    ) -> Result<Vec<VersionedTransaction>, BundleError> {
        let fetches = mints.iter().map(|output_mint| async move {
            self.quotes
                .fetch_order(&OrderParams {
                    input_mint: &request.input_mint,
                    output_mint,
                    amount: request.amount,
                    taker: &request.signer_pubkey,
                    slippage_bps: request.slippage_bps,
                })
                .await
        });

        let mut transactions = Vec::with_capacity(mints.len());
        for (swap_index, result) in join_all(fetches).await.into_iter().enumerate() {
            let order = result.map_err(|e| BundleError::QuoteUpstream {
                branch: branch_index + 1,
                swap: swap_index + 1,
                status: e.status,
                detail: e.detail,
            })?;
            // screen_order guarantees the transaction field is present
            let encoded = order.transaction.unwrap_or_default();
            let tx = decode_transaction(&encoded).map_err(|e| BundleError::QuoteUpstream {
                branch: branch_index + 1,
                swap: swap_index + 1,
                status: None,
                detail: e.to_string(),
            })?;
            transactions.push(tx);
        }
        Ok(transactions)
    }

    /// Build all bundles for a request
    pub async fn assemble(
        &self,
        request: &BuildBundlesRequest,
    ) -> Result<BuildBundlesResponse, BundleError> {
        let signer = self.validate_request(request)?;
        let tip_lamports = request.tip_lamports.unwrap_or(self.default_tip_lamports);

        let mut bundles: Vec<Vec<String>> = Vec::with_capacity(request.branches.len());
        let mut total_swaps = 0usize;
        let mut anchor: Option<Hash> = None;

        for (branch_index, mints) in request.branches.iter().enumerate() {
            let swaps = self.fetch_branch(branch_index, mints, request).await?;

            // The first fetched swap of the batch donates its blockhash as
            // the shared anchor for every transaction that follows
            let branch_anchor = match anchor {
                Some(h) => h,
                None => {
                    let h = *swaps[0].message.recent_blockhash();
                    anchor = Some(h);
                    h
                }
            };

            let mut table_keys: Vec<Pubkey> = Vec::new();
            for tx in &swaps {
                for key in lookup::referenced_lookup_keys(&tx.message) {
                    if !table_keys.contains(&key) {
                        table_keys.push(key);
                    }
                }
            }
            let tables = lookup::fetch_lookup_tables(&self.rpc, &table_keys).await?;

            let mut bundle = Vec::with_capacity(swaps.len() + 1);
            for (tx_index, tx) in swaps.iter().enumerate() {
                let rewritten = lookup::rewrite_with_compute_budget(
                    tx,
                    &tables,
                    branch_anchor,
                    self.cu_limit,
                    self.cu_price,
                )?;
                inspect::log_transaction(branch_index + 1, tx_index, &rewritten);
                bundle.push(encode_transaction(&rewritten)?);
            }

            let tip_account = self.pick_tip_account();
            let tip_tx =
                lookup::build_tip_transaction(&signer, &tip_account, tip_lamports, branch_anchor)?;
            inspect::log_transaction(branch_index + 1, bundle.len(), &tip_tx);
            bundle.push(encode_transaction(&tip_tx)?);

            debug!(
                branch = branch_index + 1,
                swaps = mints.len(),
                tip_account = %tip_account,
                "Assembled bundle"
            );
            total_swaps += mints.len();
            bundles.push(bundle);
        }

        let total_bundles = bundles.len();
        info!(total_bundles, total_swaps, "Assembled bundle batch");
        metrics::counter!("bundles_built_total").increment(total_bundles as u64);

        Ok(BuildBundlesResponse {
            bundles,
            total_swaps,
            total_bundles,
        })
    }
}
