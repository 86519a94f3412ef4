#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::pipeline::capability::{Capability, TypeTag};
use crate::core::pipeline::location::{Location, LocationParseError};
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;

const LABEL_TYPE: &str = "Type";
const LABEL_METHOD: &str = "Method";
const LABEL_INPUT: &str = "Input type name";
const LABEL_OUTPUT: &str = "Output type name";
const LABEL_LOCATION: &str = "Location";

const LABELS: [&str; 5] = [
    LABEL_TYPE,
    LABEL_METHOD,
    LABEL_INPUT,
    LABEL_OUTPUT,
    LABEL_LOCATION,
];

/// Declarative description of one required step.
///
/// Equality and hashing cover every field, so two steps that differ only
/// in their capability or types never collide as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepMetadata {
    provider_type: String,
    capability: String,
    input_type: String,
    output_type: String,
    location: Location,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MetadataParseError {
    #[error("step line is empty")]
    Empty,
    #[error("step line mixes labeled and positional fields")]
    MixedForms,
    #[error("positional step line needs 5 fields, found {0}")]
    WrongFieldCount(usize),
    #[error("unknown field label '{0}'")]
    UnknownField(String),
    #[error("field '{0}' is missing")]
    MissingField(&'static str),
    #[error("field '{0}' appears more than once")]
    DuplicateField(&'static str),
    #[error("field '{0}' has an empty value")]
    EmptyValue(&'static str),
    #[error("field '{0}' has a malformed quoted value")]
    BadQuote(&'static str),
    #[error("step line has an unterminated quoted value")]
    UnterminatedQuote,
    #[error(transparent)]
    Location(#[from] LocationParseError),
}

impl From<MetadataParseError> for AppError {
    fn from(err: MetadataParseError) -> Self {
        match err {
            MetadataParseError::Location(inner) => AppError::from(inner),
            other => AppError::new(ErrorCategory::ParseError, other.to_string())
                .with_code("TF-PARSE-002"),
        }
    }
}

impl StepMetadata {
    pub fn new(
        provider_type: impl Into<String>,
        capability: impl Into<String>,
        input_type: impl Into<String>,
        output_type: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            provider_type: provider_type.into(),
            capability: capability.into(),
            input_type: input_type.into(),
            output_type: output_type.into(),
            location,
        }
    }

    /// Metadata whose type names are taken from Rust types.
    pub fn typed<TIn: Any, TOut: Any>(
        provider_type: impl Into<String>,
        capability: impl Into<String>,
        location: Location,
    ) -> Self {
        Self::new(
            provider_type,
            capability,
            TypeTag::of::<TIn>().name(),
            TypeTag::of::<TOut>().name(),
            location,
        )
    }

    pub fn provider_type(&self) -> &str {
        &self.provider_type
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn input_type(&self) -> &str {
        &self.input_type
    }

    pub fn output_type(&self) -> &str {
        &self.output_type
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn parse(line: &str) -> Result<Self, AppError> {
        line.parse::<StepMetadata>().map_err(AppError::from)
    }

    pub fn try_parse(line: &str) -> Option<Self> {
        line.parse::<StepMetadata>().ok()
    }

    /// Structural compatibility with a capability advertised by a provider
    /// of `declaring_type`.
    pub fn does_capability_match(&self, declaring_type: &str, capability: &Capability) -> bool {
        if declaring_type != self.provider_type || capability.name() != self.capability {
            return false;
        }
        match capability.parameters() {
            [input] => {
                input.name() == self.input_type && capability.output().name() == self.output_type
            }
            _ => false,
        }
    }

    /// Typed variant of [`does_capability_match`](Self::does_capability_match)
    /// used for direct step insertion.
    pub fn matches_signature<TIn: Any, TOut: Any>(&self, declaring_type: &str, name: &str) -> bool {
        declaring_type == self.provider_type
            && name == self.capability
            && TypeTag::of::<TIn>().name() == self.input_type
            && TypeTag::of::<TOut>().name() == self.output_type
    }

    fn from_labeled(fields: &[(usize, &str)]) -> Result<Self, MetadataParseError> {
        let mut values: [Option<&str>; 5] = [None; 5];
        for (label_index, value) in fields {
            let label = LABELS[*label_index];
            if values[*label_index].is_some() {
                return Err(MetadataParseError::DuplicateField(label));
            }
            values[*label_index] = Some(*value);
        }

        let mut resolved = Vec::with_capacity(LABELS.len());
        for (index, label) in LABELS.iter().enumerate() {
            let value = values[index].ok_or(MetadataParseError::MissingField(*label))?;
            resolved.push(field_value(label, value)?);
        }
        let location = resolved[4].parse::<Location>()?;
        let mut resolved = resolved.into_iter();
        let mut next = || resolved.next().unwrap_or_default();
        Ok(Self::new(next(), next(), next(), next(), location))
    }

    fn from_positional(fields: &[&str]) -> Result<Self, MetadataParseError> {
        if fields.len() != LABELS.len() {
            return Err(MetadataParseError::WrongFieldCount(fields.len()));
        }
        Ok(Self::new(
            field_value(LABEL_TYPE, fields[0])?,
            field_value(LABEL_METHOD, fields[1])?,
            field_value(LABEL_INPUT, fields[2])?,
            field_value(LABEL_OUTPUT, fields[3])?,
            field_value(LABEL_LOCATION, fields[4])?.parse::<Location>()?,
        ))
    }
}

/// Bare values are trimmed and must not be empty; a double-quoted value is
/// taken literally after unescaping, so it may be empty or carry `;`.
fn field_value(label: &'static str, raw: &str) -> Result<String, MetadataParseError> {
    let value = raw.trim();
    if value.starts_with('"') {
        return unquote(value).ok_or(MetadataParseError::BadQuote(label));
    }
    if value.is_empty() {
        return Err(MetadataParseError::EmptyValue(label));
    }
    Ok(value.to_string())
}

fn unquote(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return chars.next().is_none().then_some(out),
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                other => out.push(other),
            },
            other => out.push(other),
        }
    }
    None
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value.trim() != value
        || value
            .chars()
            .any(|c| matches!(c, ';' | '"' | '{' | '}') || c.is_control())
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    if !needs_quoting(value) {
        return f.write_str(value);
    }
    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str("\"")
}

/// Split on `;` outside double quotes.
fn split_fields(body: &str) -> Result<Vec<&str>, MetadataParseError> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (position, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                fields.push(&body[start..position]);
                start = position + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(MetadataParseError::UnterminatedQuote);
    }
    fields.push(&body[start..]);
    Ok(fields)
}

/// Split `label: value`, returning the index of a known label.
fn split_label(field: &str) -> Option<(usize, &str)> {
    if field.starts_with('"') {
        return None;
    }
    let (label, value) = field.split_once(':')?;
    if value.starts_with(':') {
        return None;
    }
    let label = label.trim();
    LABELS
        .iter()
        .position(|known| known.eq_ignore_ascii_case(label))
        .map(|index| (index, value))
}

impl FromStr for StepMetadata {
    type Err = MetadataParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let trimmed = line.trim();
        let body = trimmed.strip_prefix('{').unwrap_or(trimmed);
        let body = body.strip_suffix('}').unwrap_or(body);

        let fields: Vec<&str> = split_fields(body)?
            .into_iter()
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .collect();
        if fields.is_empty() {
            return Err(MetadataParseError::Empty);
        }

        let labeled: Vec<Option<(usize, &str)>> =
            fields.iter().map(|field| split_label(field)).collect();
        let labeled_count = labeled.iter().filter(|entry| entry.is_some()).count();

        if labeled_count == 0 {
            return Self::from_positional(&fields);
        }
        if labeled_count != fields.len() {
            for (field, entry) in fields.iter().zip(&labeled) {
                if entry.is_none() && !field.starts_with('"') {
                    if let Some((label, _)) = field.split_once(':') {
                        if !label.contains("::") && !label.trim().is_empty() {
                            return Err(MetadataParseError::UnknownField(label.trim().to_string()));
                        }
                    }
                }
            }
            return Err(MetadataParseError::MixedForms);
        }

        let named: Vec<(usize, &str)> = labeled.into_iter().flatten().collect();
        Self::from_labeled(&named)
    }
}

impl fmt::Display for StepMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            (LABEL_TYPE, self.provider_type.as_str()),
            (LABEL_METHOD, self.capability.as_str()),
            (LABEL_INPUT, self.input_type.as_str()),
            (LABEL_OUTPUT, self.output_type.as_str()),
        ];
        f.write_str("{")?;
        for (label, value) in fields {
            write!(f, "{}: ", label)?;
            write_value(f, value)?;
            f.write_str("; ")?;
        }
        write!(f, "{}: {}}}", LABEL_LOCATION, self.location)
    }
}
