//! Decision Record
//!
//! The immutable input to the ledger, produced by a policy evaluator, plus
//! its canonical byte encoding. The canonical encoding is the hashing
//! contract: compact JSON with object keys sorted at every depth and the
//! constraint set in sorted order. Field insertion order never affects it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::Result;

/// Result of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Allowed,
    Blocked,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Blocked => "blocked",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single policy decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    pub action: String,
    pub constraints: BTreeSet<String>,
    pub outcome: Outcome,
    pub reason: String,
}

impl DecisionRecord {
    pub fn new<I, S>(
        timestamp_ms: i64,
        action: impl Into<String>,
        constraints: I,
        outcome: Outcome,
        reason: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            timestamp_ms,
            action: action.into(),
            constraints: constraints.into_iter().map(Into::into).collect(),
            outcome,
            reason: reason.into(),
        }
    }

    pub fn allowed<I, S>(
        timestamp_ms: i64,
        action: impl Into<String>,
        constraints: I,
        reason: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(timestamp_ms, action, constraints, Outcome::Allowed, reason)
    }

    pub fn blocked<I, S>(
        timestamp_ms: i64,
        action: impl Into<String>,
        constraints: I,
        reason: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(timestamp_ms, action, constraints, Outcome::Blocked, reason)
    }

    /// Canonical encoding used as hash input.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let value = serde_json::to_value(self)?;
        let mut out = String::new();
        write_canonical(&value, &mut out)?;
        Ok(out.into_bytes())
    }

    /// Short one-line description for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} -> {} ({} constraints)",
            self.action,
            self.outcome,
            self.constraints.len()
        )
    }
}

/// Compact JSON with object keys sorted recursively.
pub fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_encoding_is_key_sorted() {
        let record = DecisionRecord::blocked(
            1_700_000_000_000,
            "export_customer_data",
            ["pii", "gdpr"],
            "PII export requires approval",
        );
        let canonical = String::from_utf8(record.canonical_bytes().unwrap()).unwrap();

        assert_eq!(
            canonical,
            r#"{"action":"export_customer_data","constraints":["gdpr","pii"],"outcome":"blocked","reason":"PII export requires approval","timestamp":1700000000000}"#
        );
    }

    #[test]
    fn test_constraint_order_does_not_matter() {
        let a = DecisionRecord::allowed(1, "read", ["b", "a", "c"], "ok");
        let b = DecisionRecord::allowed(1, "read", ["c", "b", "a"], "ok");
        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
    }

    #[test]
    fn test_write_canonical_sorts_nested_objects() {
        let value = json!({"z": {"b": 1, "a": [ {"y": 2, "x": 1} ]}, "a": null});
        let mut out = String::new();
        write_canonical(&value, &mut out).unwrap();
        assert_eq!(out, r#"{"a":null,"z":{"a":[{"x":1,"y":2}],"b":1}}"#);
    }

    #[test]
    fn test_outcome_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Outcome::Allowed).unwrap(), "\"allowed\"");
        let parsed: Outcome = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(parsed, Outcome::Blocked);
    }

    #[test]
    fn test_record_deserializes_from_wire_names() {
        let record: DecisionRecord = serde_json::from_value(json!({
            "timestamp": 42,
            "action": "deploy",
            "constraints": ["change-window"],
            "outcome": "allowed",
            "reason": "inside window"
        }))
        .unwrap();
        assert_eq!(record.timestamp_ms, 42);
        assert_eq!(record.summary(), "deploy -> allowed (1 constraints)");
    }
}
