//! Feature selection passes run during exploration.
//!
//! `correlation` prunes redundant features by pairwise Pearson correlation,
//! `rfecv` ranks the survivors by recursive elimination driven by
//! `importance`.
pub mod correlation;
pub mod importance;
pub mod rfecv;

pub use correlation::{CorrelationPruner, CorrelationReport};
pub use importance::{permutation_importance, PermutationImportance};
pub use rfecv::{Rfecv, RfecvReport, RfecvResult};
