#![deny(unsafe_code)]

//! Reference data for a run: canonical schemas per subtype, the subtype
//! catalog, header alias tables and the run configuration.

pub mod catalog;
pub mod config;
pub mod error;
pub mod schema;
pub mod synonyms;

pub use crate::catalog::SubtypeCatalog;
pub use crate::config::{
    FUZZY_THRESHOLD_RANGE, InputSettings, MatchingSettings, OutputSettings, PathSettings,
    RunConfig, SequenceSettings,
};
pub use crate::error::{Result, StandardsError};
pub use crate::schema::{CanonicalSchema, SchemaRegistry, default_schema_path};
pub use crate::synonyms::{SynonymCatalog, SynonymTable};
