use crate::core::pipeline::location::Location;
use crate::core::pipeline::scheme::Scheme;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutEntry {
    pub tier: i16,
    pub provider_type: String,
    pub capability: String,
    pub input_type: String,
    pub output_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchLayout {
    pub branch: i16,
    pub steps: Vec<LayoutEntry>,
}

/// Steps of a scheme arranged by branch and tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemeLayout {
    pub total_steps: usize,
    pub providers: Vec<String>,
    pub branches: Vec<BranchLayout>,
    /// Steps placed at a location that can never execute.
    pub unplaced: Vec<String>,
}

impl SchemeLayout {
    pub fn from_scheme(scheme: &Scheme) -> Self {
        let mut branches: BTreeMap<i16, Vec<LayoutEntry>> = BTreeMap::new();
        let mut unplaced = Vec::new();
        for step in scheme.steps() {
            let location: Location = step.location();
            if !location.is_valid() {
                unplaced.push(step.to_string());
                continue;
            }
            branches
                .entry(location.branch())
                .or_default()
                .push(LayoutEntry {
                    tier: location.tier(),
                    provider_type: step.provider_type().to_string(),
                    capability: step.capability().to_string(),
                    input_type: step.input_type().to_string(),
                    output_type: step.output_type().to_string(),
                });
        }

        Self {
            total_steps: scheme.len(),
            providers: scheme.provider_types().map(str::to_string).collect(),
            branches: branches
                .into_iter()
                .map(|(branch, mut steps)| {
                    steps.sort_by_key(|entry| entry.tier);
                    BranchLayout { branch, steps }
                })
                .collect(),
            unplaced,
        }
    }
}

impl fmt::Display for SchemeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} step(s) from {} provider type(s)",
            self.total_steps,
            self.providers.len()
        )?;
        for branch in &self.branches {
            writeln!(f, "branch {}:", branch.branch)?;
            for entry in &branch.steps {
                writeln!(
                    f,
                    "  tier {:>3}  {}.{}  {} -> {}",
                    entry.tier,
                    entry.provider_type,
                    entry.capability,
                    entry.input_type,
                    entry.output_type
                )?;
            }
        }
        for step in &self.unplaced {
            writeln!(f, "unplaced: {}", step)?;
        }
        Ok(())
    }
}
