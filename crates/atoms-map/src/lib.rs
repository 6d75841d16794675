#![deny(unsafe_code)]

//! Reconciles arbitrarily spelled input headers with a canonical schema.

pub mod error;
pub mod normalize;
pub mod report;
pub mod score;
pub mod standardizer;

pub use error::{MapError, Result};
pub use normalize::{compact_key, header_key, normalize_header};
pub use report::{ColumnMatch, MappingReport, MatchMethod};
pub use score::{best_match, similarity};
pub use standardizer::{
    DEFAULT_FUZZY_THRESHOLD, SchemaStandardizer, StandardizationPlan, Standardized,
};
