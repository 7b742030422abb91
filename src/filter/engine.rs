//! Predicate evaluation over health rows.

use chrono::DateTime;

use super::predicate::{FilterOperator, FilterPredicate};
use crate::health::{HealthRow, MetricValue};

/// A row field resolved for comparison.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum FieldValue {
    Text(String),
    /// Numeric value plus the text form used by `contains`.
    Number(f64, String),
}

/// Keep the rows that satisfy every predicate, in their original order.
pub fn evaluate(rows: &[HealthRow], predicates: &[FilterPredicate]) -> Vec<HealthRow> {
    rows.iter()
        .filter(|row| predicates.iter().all(|p| matches(row, p)))
        .cloned()
        .collect()
}

/// Whether a single row satisfies a single predicate.
///
/// Unknown fields, missing values and non-numeric operands never match.
pub fn matches(row: &HealthRow, predicate: &FilterPredicate) -> bool {
    let Some(field) = resolve(row, &predicate.field) else {
        return false;
    };

    match (predicate.op, &field) {
        (FilterOperator::Contains, _) => fold(text_of(&field)).contains(&fold(&predicate.value)),
        (FilterOperator::Equals, _) => equals(&field, &predicate.value),
        (FilterOperator::NotEquals, FieldValue::Number(..)) => {
            parse_operand(&predicate.value).is_some() && !equals(&field, &predicate.value)
        }
        (FilterOperator::NotEquals, FieldValue::Text(_)) => !equals(&field, &predicate.value),
        (op, FieldValue::Number(n, _)) => match parse_operand(&predicate.value) {
            Some(operand) => compare(op, *n, operand),
            None => false,
        },
        (_, FieldValue::Text(_)) => false,
    }
}

pub(super) fn resolve(row: &HealthRow, field: &str) -> Option<FieldValue> {
    match field {
        "id" => Some(FieldValue::Text(row.target_id.clone())),
        "environment" => Some(FieldValue::Text(row.environment.clone())),
        "check_state" => Some(FieldValue::Text(row.check_state.as_str().to_string())),
        _ => {
            let result = row.result.as_ref()?;
            match field {
                "severity" => Some(FieldValue::Text(result.severity.as_str().to_string())),
                "error" => result.error_message.clone().map(FieldValue::Text),
                "elapsed_ms" => {
                    let ms = result.elapsed_ms();
                    Some(FieldValue::Number(ms as f64, ms.to_string()))
                }
                "checked_at" => Some(FieldValue::Number(
                    result.timestamp.timestamp() as f64,
                    result.timestamp.to_rfc3339(),
                )),
                _ => {
                    if let Some(metric) = field.strip_prefix("verdict.") {
                        return result
                            .verdict(metric)
                            .map(|v| FieldValue::Text(v.as_str().to_string()));
                    }
                    result.raw.metrics.get(field).map(metric_value)
                }
            }
        }
    }
}

fn metric_value(value: &MetricValue) -> FieldValue {
    match value.as_f64() {
        Some(n) => FieldValue::Number(n, value.to_string()),
        None => FieldValue::Text(value.to_string()),
    }
}

fn text_of(field: &FieldValue) -> &str {
    match field {
        FieldValue::Text(s) | FieldValue::Number(_, s) => s,
    }
}

fn equals(field: &FieldValue, operand: &str) -> bool {
    if let FieldValue::Number(n, _) = field {
        if let Some(operand) = parse_operand(operand) {
            return *n == operand;
        }
    }
    fold(text_of(field)) == fold(operand.trim())
}

/// Case folding shared by `contains` and `equals`.
pub(super) fn fold(s: &str) -> String {
    s.to_lowercase()
}

/// Numbers as is; RFC 3339 timestamps as Unix seconds.
fn parse_operand(operand: &str) -> Option<f64> {
    let operand = operand.trim();
    if let Ok(n) = operand.parse::<f64>() {
        return n.is_finite().then_some(n);
    }
    DateTime::parse_from_rfc3339(operand)
        .ok()
        .map(|ts| ts.timestamp() as f64)
}

fn compare(op: FilterOperator, value: f64, operand: f64) -> bool {
    match op {
        FilterOperator::Greater => value > operand,
        FilterOperator::GreaterOrEqual => value >= operand,
        FilterOperator::Less => value < operand,
        FilterOperator::LessOrEqual => value <= operand,
        FilterOperator::Contains | FilterOperator::Equals | FilterOperator::NotEquals => false,
    }
}
