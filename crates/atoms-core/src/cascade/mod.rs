//! Two-phase rule cascade.

pub mod engine;
pub mod rule_table;

pub use engine::{CascadeRegistry, SubtypeCascade};
pub use rule_table::{AuxiliaryData, CascadeRule, RuleContext, RuleEffect, RuleMetadata};
