//! Bundle lifecycle: assembly, validation, submission, aggregation

pub mod aggregator;
pub mod assembler;
pub mod errors;
pub mod lookup;
pub mod submitter;
pub mod validate;

pub use aggregator::{classify, OutcomeAggregator};
pub use assembler::BundleAssembler;
pub use errors::BundleError;
pub use submitter::BundleSubmitter;
