//! Filter predicates and their textual form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::FilterError;

/// Comparison applied by a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Case-insensitive substring.
    #[serde(rename = "contains")]
    Contains,
    /// Case-insensitive exact match; numeric equality when both sides are numbers.
    #[serde(rename = "equals", alias = "=", alias = "==")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "!=",
            FilterOperator::Greater => ">",
            FilterOperator::GreaterOrEqual => ">=",
            FilterOperator::Less => "<",
            FilterOperator::LessOrEqual => "<=",
        }
    }

    /// Ordering operators only apply to numeric values.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            FilterOperator::Greater
                | FilterOperator::GreaterOrEqual
                | FilterOperator::Less
                | FilterOperator::LessOrEqual
        )
    }
}

impl FromStr for FilterOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contains" => Ok(FilterOperator::Contains),
            "equals" | "=" | "==" => Ok(FilterOperator::Equals),
            "!=" => Ok(FilterOperator::NotEquals),
            ">" => Ok(FilterOperator::Greater),
            ">=" => Ok(FilterOperator::GreaterOrEqual),
            "<" => Ok(FilterOperator::Less),
            "<=" => Ok(FilterOperator::LessOrEqual),
            other => Err(FilterError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(field, operator, value)` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub field: String,
    pub op: FilterOperator,
    pub value: String,
}

impl FilterPredicate {
    pub fn new(field: impl Into<String>, op: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Parse `field op value`. The value is the rest of the line and may be
    /// wrapped in double quotes.
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let input = input.trim();
        let (field, rest) = next_token(input);
        let (op, value) = next_token(rest);

        if field.is_empty() || op.is_empty() || value.is_empty() {
            return Err(FilterError::Malformed(input.to_string()));
        }

        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        Ok(Self::new(field, op.parse()?, value))
    }
}

fn next_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

impl FromStr for FilterPredicate {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}
