use super::{LintResult, LintSeverity, SchemeLintRule};
use crate::core::pipeline::location::Location;
use crate::core::pipeline::metadata::StepMetadata;
use crate::core::pipeline::scheme::Scheme;
use std::collections::{BTreeMap, HashMap};

pub fn built_in_rules() -> Vec<Box<dyn SchemeLintRule>> {
    vec![
        Box::new(DuplicateLocationRule),
        Box::new(MissingEntryStepRule),
        Box::new(TierGapRule),
        Box::new(TypeChainBreakRule),
        Box::new(SentinelLocationRule),
    ]
}

/// Valid steps grouped by branch, ordered by tier. Shared locations keep
/// the first step seen.
fn steps_by_branch(scheme: &Scheme) -> BTreeMap<i16, BTreeMap<i16, &StepMetadata>> {
    let mut branches: BTreeMap<i16, BTreeMap<i16, &StepMetadata>> = BTreeMap::new();
    for step in scheme.steps() {
        let location = step.location();
        if !location.is_valid() {
            continue;
        }
        branches
            .entry(location.branch())
            .or_default()
            .entry(location.tier())
            .or_insert(step);
    }
    branches
}

struct DuplicateLocationRule;

impl SchemeLintRule for DuplicateLocationRule {
    fn validate(&self, scheme: &Scheme) -> Vec<LintResult> {
        let mut by_location: HashMap<Location, Vec<&StepMetadata>> = HashMap::new();
        for step in scheme.steps() {
            if step.location().is_valid() {
                by_location.entry(step.location()).or_default().push(step);
            }
        }

        let mut out = Vec::new();
        for (location, steps) in by_location {
            if steps.len() > 1 {
                let names: Vec<String> = steps
                    .iter()
                    .map(|step| format!("{}.{}", step.provider_type(), step.capability()))
                    .collect();
                out.push(LintResult::new(
                    "TF-LINT-001",
                    LintSeverity::Error,
                    format!(
                        "location {} is claimed by {} steps: {}",
                        location,
                        steps.len(),
                        names.join(", ")
                    ),
                    Some(location.to_string()),
                    Some("give every step its own (branch,tier) location".to_string()),
                ));
            }
        }
        out
    }
}

struct MissingEntryStepRule;

impl SchemeLintRule for MissingEntryStepRule {
    fn validate(&self, scheme: &Scheme) -> Vec<LintResult> {
        if scheme.steps().any(|step| step.location() == Location::ORIGIN) {
            return Vec::new();
        }
        vec![LintResult::new(
            "TF-LINT-002",
            LintSeverity::Error,
            "no step at (0,0); every item starts there",
            Some(Location::ORIGIN.to_string()),
            Some("place the first step at location (0,0)".to_string()),
        )]
    }
}

struct TierGapRule;

impl SchemeLintRule for TierGapRule {
    fn validate(&self, scheme: &Scheme) -> Vec<LintResult> {
        let mut out = Vec::new();
        for (branch, tiers) in steps_by_branch(scheme) {
            let mut expected = 0i16;
            for &tier in tiers.keys() {
                if tier != expected {
                    let unreachable = tiers.range(tier..).count();
                    out.push(LintResult::new(
                        "TF-LINT-003",
                        LintSeverity::Warning,
                        format!(
                            "branch {} has no step at tier {}; {} later step(s) are unreachable by linear traversal",
                            branch, expected, unreachable
                        ),
                        Some(Location::new(branch, expected).to_string()),
                        Some("fill the gap or supply a custom next-location policy".to_string()),
                    ));
                    break;
                }
                expected = tier.saturating_add(1);
            }
        }
        out
    }
}

struct TypeChainBreakRule;

impl SchemeLintRule for TypeChainBreakRule {
    fn validate(&self, scheme: &Scheme) -> Vec<LintResult> {
        let mut out = Vec::new();
        for tiers in steps_by_branch(scheme).values() {
            for (tier, step) in tiers {
                let Some(next) = tier.checked_add(1).and_then(|t| tiers.get(&t)) else {
                    continue;
                };
                if step.output_type() != next.input_type() {
                    out.push(LintResult::new(
                        "TF-LINT-004",
                        LintSeverity::Warning,
                        format!(
                            "{}.{} outputs {} but the next step {}.{} expects {}",
                            step.provider_type(),
                            step.capability(),
                            step.output_type(),
                            next.provider_type(),
                            next.capability(),
                            next.input_type()
                        ),
                        Some(next.location().to_string()),
                        Some("align the output and input type names of consecutive tiers".to_string()),
                    ));
                }
            }
        }
        out
    }
}

struct SentinelLocationRule;

impl SchemeLintRule for SentinelLocationRule {
    fn validate(&self, scheme: &Scheme) -> Vec<LintResult> {
        scheme
            .steps()
            .filter(|step| !step.location().is_valid())
            .map(|step| {
                LintResult::new(
                    "TF-LINT-005",
                    LintSeverity::Error,
                    format!(
                        "{}.{} uses the terminal location {} and can never run",
                        step.provider_type(),
                        step.capability(),
                        step.location()
                    ),
                    Some(step.location().to_string()),
                    Some("use non-negative branch and tier values".to_string()),
                )
            })
            .collect()
    }
}
