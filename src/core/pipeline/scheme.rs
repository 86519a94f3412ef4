#![allow(clippy::result_large_err)] // Scheme APIs return AppError to keep line/path context without boxing.

use crate::core::error::AppError;
use crate::core::pipeline::lint::LintSeverity;
use crate::core::pipeline::metadata::StepMetadata;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

/// Provider-agnostic list of required steps, bucketed by provider type.
///
/// Buckets keep the order in which their provider type was first seen and
/// steps keep insertion order inside a bucket. `Clone` copies every bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scheme {
    buckets: IndexMap<String, Vec<StepMetadata>>,
}

/// Problem found on one line of scheme text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemeDiagnostic {
    pub line: usize,
    pub text: String,
    pub code: String,
    pub severity: LintSeverity,
    pub message: String,
}

impl fmt::Display for SchemeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {} [{}] {}",
            self.line, self.severity, self.code, self.message
        )
    }
}

/// Outcome of parsing scheme text: every well-formed step plus a
/// diagnostic for each line that was not accepted.
#[derive(Debug, Clone, Default)]
pub struct ParsedScheme {
    pub scheme: Scheme,
    pub diagnostics: Vec<SchemeDiagnostic>,
}

impl ParsedScheme {
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &SchemeDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == LintSeverity::Error)
    }

    /// Accept the scheme only if no line failed to parse.
    pub fn into_result(self) -> Result<Scheme, AppError> {
        match self.diagnostics.into_iter().find(|d| d.severity == LintSeverity::Error) {
            Some(diagnostic) => Err(AppError::new(
                ErrorCategory::ParseError,
                format!("line {}: {}", diagnostic.line, diagnostic.message),
            )
            .with_code(diagnostic.code)
            .with_context("line", diagnostic.line.to_string())),
            None => Ok(self.scheme),
        }
    }
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps<I: IntoIterator<Item = StepMetadata>>(steps: I) -> Self {
        let mut scheme = Scheme::new();
        scheme.try_add_all(steps);
        scheme
    }

    /// Add a step to its provider bucket. Returns `false` when an equal
    /// step is already present.
    pub fn try_add(&mut self, metadata: StepMetadata) -> bool {
        let bucket = self
            .buckets
            .entry(metadata.provider_type().to_string())
            .or_default();
        if bucket.contains(&metadata) {
            return false;
        }
        bucket.push(metadata);
        true
    }

    /// Parse and add one step line. Returns `false` on malformed text or a
    /// duplicate.
    pub fn try_add_line(&mut self, line: &str) -> bool {
        match StepMetadata::try_parse(line) {
            Some(metadata) => self.try_add(metadata),
            None => false,
        }
    }

    /// Add several steps; `true` if at least one was new.
    pub fn try_add_all<I: IntoIterator<Item = StepMetadata>>(&mut self, steps: I) -> bool {
        let mut added = false;
        for metadata in steps {
            added |= self.try_add(metadata);
        }
        added
    }

    pub fn try_get(&self, provider_type: &str) -> Option<&[StepMetadata]> {
        self.buckets.get(provider_type).map(Vec::as_slice)
    }

    /// Claim every step of one provider type.
    pub fn try_remove(&mut self, provider_type: &str) -> Option<Vec<StepMetadata>> {
        self.buckets.shift_remove(provider_type)
    }

    /// Remove a single step, dropping its bucket once empty.
    pub fn remove_step(&mut self, metadata: &StepMetadata) -> bool {
        let Some(bucket) = self.buckets.get_mut(metadata.provider_type()) else {
            return false;
        };
        let Some(position) = bucket.iter().position(|entry| entry == metadata) else {
            return false;
        };
        bucket.remove(position);
        if bucket.is_empty() {
            self.buckets.shift_remove(metadata.provider_type());
        }
        true
    }

    /// Total number of steps across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn provider_types(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[StepMetadata])> {
        self.buckets
            .iter()
            .map(|(key, steps)| (key.as_str(), steps.as_slice()))
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepMetadata> {
        self.buckets.values().flatten()
    }

    /// Parse line-oriented scheme text. Blank lines and `#` comments are
    /// skipped; every other line either becomes a step or a diagnostic.
    pub fn parse(text: &str) -> ParsedScheme {
        let mut parsed = ParsedScheme::default();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<StepMetadata>() {
                Ok(metadata) => {
                    if !parsed.scheme.try_add(metadata) {
                        parsed.diagnostics.push(SchemeDiagnostic {
                            line: index + 1,
                            text: line.to_string(),
                            code: "TF-PARSE-004".to_string(),
                            severity: LintSeverity::Warning,
                            message: "duplicate step ignored".to_string(),
                        });
                    }
                }
                Err(err) => parsed.diagnostics.push(SchemeDiagnostic {
                    line: index + 1,
                    text: line.to_string(),
                    code: "TF-PARSE-003".to_string(),
                    severity: LintSeverity::Error,
                    message: err.to_string(),
                }),
            }
        }
        parsed
    }

    pub fn parse_reader<R: Read>(reader: R) -> Result<ParsedScheme, AppError> {
        let mut text = String::new();
        BufReader::new(reader).read_to_string(&mut text)?;
        Ok(Scheme::parse(&text))
    }

    pub fn load(path: &Path) -> Result<ParsedScheme, AppError> {
        let text = fs::read_to_string(path).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to read scheme {}: {}", path.display(), err),
            )
            .with_code("TF-IO-001")
        })?;
        Ok(Scheme::parse(&text))
    }
}

impl FromStr for Scheme {
    type Err = AppError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Scheme::parse(text).into_result()
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for metadata in self.steps() {
            writeln!(f, "{}", metadata)?;
        }
        Ok(())
    }
}
