//! Typed ordering of health rows.

use std::cmp::Ordering;

use super::engine::{fold, resolve, FieldValue};
use crate::health::{HealthRow, Verdict};

/// Sort key for one row.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    /// Numbers order before text when a field mixes both.
    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        }
    }
}

/// Sort rows by `field`, stable, in place.
///
/// Accepts the same field names as filters. `severity` and `verdict.<metric>`
/// order by badness, numbers and timestamps numerically, text case-insensitively.
/// Rows where the field cannot be resolved go last in either direction.
pub fn sort(rows: &mut Vec<HealthRow>, field: &str, descending: bool) {
    let mut keyed: Vec<(Option<SortKey>, HealthRow)> = rows
        .drain(..)
        .map(|row| (sort_key(&row, field), row))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.compare(b);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    rows.extend(keyed.into_iter().map(|(_, row)| row));
}

fn sort_key(row: &HealthRow, field: &str) -> Option<SortKey> {
    if field == "severity" {
        let result = row.result.as_ref()?;
        return Some(SortKey::Number(f64::from(result.severity.rank())));
    }
    if let Some(metric) = field.strip_prefix("verdict.") {
        let verdict = row.result.as_ref()?.verdict(metric)?;
        return Some(SortKey::Number(verdict_rank(verdict)));
    }

    match resolve(row, field)? {
        FieldValue::Number(n, _) if n.is_nan() => None,
        FieldValue::Number(n, _) => Some(SortKey::Number(n)),
        FieldValue::Text(s) => Some(SortKey::Text(fold(&s))),
    }
}

/// Unknown ranks between OK and WARN: worth a look, not an alert.
fn verdict_rank(verdict: Verdict) -> f64 {
    match verdict {
        Verdict::Ok => 0.0,
        Verdict::Unknown => 0.5,
        Verdict::Warn => 1.0,
        Verdict::Crit => 2.0,
    }
}
