//! Correction rules per subtype and the default cascade registry.

pub mod base;
pub mod common;
pub mod sobregiro;
pub mod tdc;
pub mod valores;

use std::sync::Arc;

use atoms_model::Subtype;
use atoms_standards::catalog::{BASE_AT12, SOBREGIRO_AT12, TDC_AT12, VALORES_AT12};

use crate::cascade::{CascadeRegistry, CascadeRule, SubtypeCascade};

fn cascade(subtype: &str, rules: Vec<Arc<dyn CascadeRule>>) -> atoms_model::Result<SubtypeCascade> {
    let mut cascade = SubtypeCascade::new(Subtype::new(subtype)?);
    for rule in rules {
        cascade.add_rule(rule);
    }
    Ok(cascade)
}

/// Build the registry with the rules of every primary subtype, each list in
/// execution order within its phase.
pub fn build_default_cascade_registry() -> atoms_model::Result<CascadeRegistry> {
    let mut registry = CascadeRegistry::new();

    registry.register(cascade(
        BASE_AT12,
        vec![
            Arc::new(common::WhitespaceRule::new()),
            Arc::new(base::Error0301Rule::new()),
            Arc::new(base::CommaInDocumentRule::new()),
            Arc::new(base::MaturityDateRule::new()),
            Arc::new(base::ScopedDefaultRule::property_policy_default()),
            Arc::new(base::ScopedDefaultRule::property_without_deed()),
            Arc::new(base::ScopedDefaultRule::auto_commercial_policy()),
            Arc::new(base::ScopedDefaultRule::property_without_appraiser()),
            Arc::new(base::AppraisalDateRule::new()),
            Arc::new(base::PropertyPolicyRule::new()),
            Arc::new(base::AutoPolicyRule::new()),
            Arc::new(base::OutOfCycleRule::new()),
            Arc::new(base::MinimumAppraisalValueRule::new()),
        ],
    )?);

    registry.register(cascade(
        TDC_AT12,
        vec![
            Arc::new(common::WhitespaceRule::new()),
            Arc::new(tdc::GuaranteeNumberRule::new()),
            Arc::new(tdc::OpeningDateRule::new()),
        ],
    )?);

    registry.register(cascade(
        SOBREGIRO_AT12,
        vec![
            Arc::new(common::WhitespaceRule::new()),
            Arc::new(sobregiro::OverdraftDefaultsRule::new()),
            Arc::new(sobregiro::BaseEnrichmentRule::new()),
        ],
    )?);

    registry.register(cascade(
        VALORES_AT12,
        vec![
            Arc::new(common::WhitespaceRule::new()),
            Arc::new(valores::SecuritiesLoanPaddingRule::new()),
            Arc::new(valores::SecuritiesAmountsRule::new()),
            Arc::new(valores::SecuritiesConstantsRule::new()),
            Arc::new(valores::SecuritiesGuaranteeNumberRule::new()),
            Arc::new(valores::SecuritiesFacilityRule::new()),
        ],
    )?);

    Ok(registry)
}
