#![deny(unsafe_code)]

//! Correction engine for credit-guarantee regulatory extracts.

pub mod cascade;
pub mod dates;
pub mod error;
pub mod incidence;
pub mod keys;
pub mod orchestrator;
pub mod output;
pub mod rules;
pub mod run_context;
pub mod sequence;

pub use cascade::{
    AuxiliaryData, CascadeRegistry, CascadeRule, RuleContext, RuleEffect, RuleMetadata,
    SubtypeCascade,
};
pub use dates::{date_year, format_date, parse_date};
pub use error::{CoreError, Result, RuleError, SequenceError};
pub use incidence::{Finding, IncidenceGroup, IncidenceGrouping, IncidenceRecorder};
pub use keys::{JoinIndex, TieBreak, composite_key, normalize_key};
pub use orchestrator::{Orchestrator, RunRequest};
pub use output::OutputLayout;
pub use rules::build_default_cascade_registry;
pub use run_context::{RunContext, TDC_SEQUENCE, VALORES_SEQUENCE};
pub use sequence::SequenceRegistry;
