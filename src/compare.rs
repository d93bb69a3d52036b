//! Verification bridge to the comparison engine.
//!
//! The facade verifies records by handing two already-materialized logical
//! snapshots plus a display name to a [`Comparer`]. The crate ships a
//! structural default; test suites with their own comparison engine plug it
//! in through the trait.

use serde_json::Value;

use crate::error::ComparisonError;

/// A rule relaxing the comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareRule {
    /// Ignore any object field with this name, at any depth.
    IgnoreField(String),
    /// Allow numeric fields with this name to differ by up to `epsilon`.
    Tolerance {
        /// The field name the tolerance applies to.
        field: String,
        /// Maximum allowed absolute difference.
        epsilon: f64,
    },
}

/// Structural comparison contract.
pub trait Comparer: Send + Sync {
    /// Compares two logical snapshots, failing with a descriptive
    /// [`ComparisonError::Mismatch`] naming `target` when they differ.
    fn compare(
        &self,
        actual: &Value,
        expected: &Value,
        target: &str,
        rules: &[CompareRule],
    ) -> Result<(), ComparisonError>;
}

/// Default deep-equality comparer.
///
/// Walks both snapshots in parallel and collects one diff line per
/// mismatching path.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralComparer;

impl Comparer for StructuralComparer {
    fn compare(
        &self,
        actual: &Value,
        expected: &Value,
        target: &str,
        rules: &[CompareRule],
    ) -> Result<(), ComparisonError> {
        let mut diffs = Vec::new();
        walk("$", actual, expected, rules, &mut diffs);

        if diffs.is_empty() {
            Ok(())
        } else {
            Err(ComparisonError::Mismatch {
                target: target.to_string(),
                diffs,
            })
        }
    }
}

fn ignored(field: &str, rules: &[CompareRule]) -> bool {
    rules
        .iter()
        .any(|rule| matches!(rule, CompareRule::IgnoreField(name) if name == field))
}

fn tolerance(field: &str, rules: &[CompareRule]) -> Option<f64> {
    rules.iter().find_map(|rule| match rule {
        CompareRule::Tolerance { field: name, epsilon } if name == field => Some(*epsilon),
        _ => None,
    })
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn walk(path: &str, actual: &Value, expected: &Value, rules: &[CompareRule], diffs: &mut Vec<String>) {
    match (actual, expected) {
        (Value::Object(a), Value::Object(e)) => {
            for (key, expected_value) in e {
                if ignored(key, rules) {
                    continue;
                }
                let child = format!("{path}.{key}");
                match a.get(key) {
                    Some(actual_value) => walk(&child, actual_value, expected_value, rules, diffs),
                    None => diffs.push(format!("{child}: missing in actual")),
                }
            }
            for key in a.keys() {
                if !ignored(key, rules) && !e.contains_key(key) {
                    diffs.push(format!("{path}.{key}: unexpected in actual"));
                }
            }
        }
        (Value::Array(a), Value::Array(e)) => {
            if a.len() != e.len() {
                diffs.push(format!(
                    "{path}: length mismatch, expected {}, actual {}",
                    e.len(),
                    a.len()
                ));
                return;
            }
            for (index, (actual_item, expected_item)) in a.iter().zip(e).enumerate() {
                walk(
                    &format!("{path}[{index}]"),
                    actual_item,
                    expected_item,
                    rules,
                    diffs,
                );
            }
        }
        (Value::Number(a), Value::Number(e)) => {
            if let Some(epsilon) = tolerance(last_segment(path), rules) {
                let (Some(a), Some(e)) = (a.as_f64(), e.as_f64()) else {
                    diffs.push(format!("{path}: non-comparable numbers"));
                    return;
                };
                if (a - e).abs() > epsilon {
                    diffs.push(format!(
                        "{path}: expected {e} ± {epsilon}, actual {a}"
                    ));
                }
            } else if a != e {
                diffs.push(format!("{path}: expected {e}, actual {a}"));
            }
        }
        (a, e) => {
            if a != e {
                diffs.push(format!("{path}: expected {e}, actual {a}"));
            }
        }
    }
}
