//! Atomic swap-bundle coordinator
//!
//! Builds bundles of swap transactions (one per branch, tip transfer
//! last, all anchored to one blockhash), submits them to a block engine
//! relay, and aggregates per-bundle outcomes into a single call result.

pub mod bundle;
pub mod config;
pub mod inspect;
pub mod quote;
pub mod relay;
pub mod server;
pub mod types;
