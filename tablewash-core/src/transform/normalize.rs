//! Field normalizer: canonicalize the text of one column.

use crate::data::{ColumnType, Dataset, Schema, Value};
use crate::error::WashError;
use crate::transform::Transform;
use serde::{Deserialize, Serialize};

/// A single text rule. Rules run left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeRule {
    Trim,
    Uppercase,
    Lowercase,
    TitleCase,
}

impl NormalizeRule {
    pub fn apply(self, text: &str) -> String {
        match self {
            NormalizeRule::Trim => text.trim().to_string(),
            NormalizeRule::Uppercase => text.to_uppercase(),
            NormalizeRule::Lowercase => text.to_lowercase(),
            NormalizeRule::TitleCase => title_case(text),
        }
    }
}

/// Upper-case the first letter of each whitespace-delimited word, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_whitespace() {
            out.push(c);
            at_word_start = true;
        } else if at_word_start {
            // Only the first char of a multi-char expansion stays upper
            let mut upper = c.to_uppercase();
            out.extend(upper.next());
            out.extend(upper.flat_map(char::to_lowercase));
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Apply `rules` in order to one string.
pub fn normalize_text(text: &str, rules: &[NormalizeRule]) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc))
}

/// Normalize every value of a string column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    pub column: String,
    pub rules: Vec<NormalizeRule>,
}

impl Normalize {
    pub fn new(column: impl Into<String>, rules: impl Into<Vec<NormalizeRule>>) -> Self {
        Self {
            column: column.into(),
            rules: rules.into(),
        }
    }
}

impl Transform for Normalize {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        input.resolve(&self.column)?.require_type(ColumnType::String)?;
        Ok(input.clone())
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let col = input.column_ref(&self.column)?;
        col.require_type(ColumnType::String)?;
        if self.rules.is_empty() {
            return Ok(input.clone());
        }

        Ok(input.map_column(&col, |value| match value {
            Value::Str(s) => Value::Str(normalize_text(s, &self.rules)),
            other => other.clone(),
        }))
    }
}

/// Apply `rules` left to right to every value of `column`. Nulls pass through.
pub fn normalize(
    dataset: &Dataset,
    column: &str,
    rules: &[NormalizeRule],
) -> Result<Dataset, WashError> {
    Normalize::new(column, rules).apply(dataset)
}
