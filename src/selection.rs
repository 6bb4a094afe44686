use crate::parameter::{ParameterSpec, ParameterType, ParameterValue, Which};
use crate::resolve::{default_parameter_value, resolve, ResolveContext};
use crate::source::SourceError;
use serde_json::Value;
use std::collections::HashSet;

/// Separator used to split a resolved value into candidate choices. Fixed,
/// regardless of the parameter's delimiter.
pub const CANDIDATE_SEPARATOR: char = ',';

/// A structured form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Text(String),
    List(Vec<String>),
}

impl Submission {
    /// Strings pass through as text and arrays become lists (non-string
    /// elements use their JSON text). Any other shape is an empty text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text.clone()),
            Value::Array(items) => Self::List(items.iter().map(json_element_text).collect()),
            _ => Self::Text(String::new()),
        }
    }
}

fn json_element_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// The resolved value split into choices. Trailing empty pieces are not
/// choices; empty pieces in the middle are.
pub fn candidate_set(resolved: &str) -> HashSet<&str> {
    let mut pieces: Vec<&str> = resolved.split(CANDIDATE_SEPARATOR).collect();
    while pieces.last().is_some_and(|piece| piece.is_empty()) {
        pieces.pop();
    }
    pieces.into_iter().collect()
}

/// Keeps the submitted values that are valid choices, in submission order,
/// joined with `delimiter`.
pub fn filter_selection<S: AsRef<str>>(
    resolved: &str,
    submitted: &[S],
    delimiter: &str,
) -> String {
    let candidates = candidate_set(resolved);
    submitted
        .iter()
        .map(|value| value.as_ref())
        .filter(|value| candidates.contains(value))
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// Keeps every `level_count`-th element (1-based), i.e. the leaf of each
/// completed level group, joined with `delimiter`.
pub fn leaf_selections<S: AsRef<str>>(
    values: &[S],
    level_count: usize,
    delimiter: &str,
) -> String {
    let step = level_count.max(1);
    values
        .iter()
        .enumerate()
        .filter(|(index, _)| (index + 1) % step == 0)
        .map(|(_, value)| value.as_ref())
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// Encodes a structured submission into the stored string, quoting it when
/// the parameter asks for quotes.
pub fn encode_selection(spec: &ParameterSpec, submission: &Submission) -> String {
    let encoded = match submission {
        Submission::Text(text) => text.clone(),
        Submission::List(values) if spec.parameter_type.is_multi_level() => {
            leaf_selections(values, spec.level_names().len(), &spec.delimiter)
        }
        Submission::List(values) => values.join(spec.delimiter.as_str()),
    };
    spec.quote(encoded)
}

pub fn create_value_from_json(spec: &ParameterSpec, submission: &Value) -> ParameterValue {
    let submission = Submission::from_json(submission);
    ParameterValue::new(&spec.name, encode_selection(spec, &submission))
}

/// Builds the parameter value from plain request values.
///
/// Nothing submitted falls back to the default value. Text boxes take the
/// first submitted value as-is. Every other type keeps only submitted values
/// present in the resolved choices; `None` when the choices resolve to
/// nothing.
pub fn create_value_from_request<S: AsRef<str>>(
    spec: &ParameterSpec,
    ctx: &ResolveContext,
    submitted: &[S],
) -> Result<Option<ParameterValue>, SourceError> {
    let Some(first) = submitted.first() else {
        return default_parameter_value(spec, ctx);
    };
    if spec.parameter_type == ParameterType::TextBox {
        return Ok(Some(ParameterValue::new(&spec.name, first.as_ref())));
    }

    let Some(resolved) = resolve(spec, Which::Value, ctx)? else {
        return Ok(None);
    };
    let value = filter_selection(&resolved, submitted, &spec.delimiter);
    Ok(Some(ParameterValue::new(&spec.name, value)))
}
