//! Prop predicates and the literal values they compare against.
//!
//! In a rule document a condition is written in one of three forms:
//!
//! - a literal (`"primary"`, `2`, `true`) -- the prop equals it
//! - an array of literals -- the prop equals one of them
//! - `{ "is": "present" | "absent" | "any" }`

use migr8_core::ast::{format_number, PropValue};
use serde::{Deserialize, Serialize};

/// A literal prop value as written in a rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Literal {
    /// Literal equality against a source prop. Expressions and spreads
    /// never equal anything.
    pub fn matches(&self, value: &PropValue) -> bool {
        match (self, value) {
            (Literal::Str(a), PropValue::Str(b)) => a == b,
            (Literal::Number(a), PropValue::Number(b)) => a == b,
            (Literal::Bool(a), PropValue::Bool(b)) => a == b,
            _ => false,
        }
    }

    /// The attribute value as it should be written into JSX: `"text"`,
    /// `{2}` or `{true}`.
    pub fn to_jsx_value(&self) -> String {
        match self {
            Literal::Str(s) if !s.contains('"') && !s.contains('\n') => format!("\"{}\"", s),
            Literal::Str(s) => format!("{{{}}}", serde_json::Value::String(s.clone())),
            Literal::Number(n) => format!("{{{}}}", format_number(*n)),
            Literal::Bool(b) => format!("{{{}}}", b),
        }
    }

    pub fn into_prop_value(self) -> PropValue {
        match self {
            Literal::Str(s) => PropValue::Str(s),
            Literal::Number(n) => PropValue::Number(n),
            Literal::Bool(b) => PropValue::Bool(b),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Number(n) => f.write_str(&format_number(*n)),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum Condition {
    Equals(Literal),
    OneOf(Vec<Literal>),
    Present,
    Absent,
    /// Don't care.
    Any,
}

impl Condition {
    /// Evaluate against the named prop of one element (`None` when the
    /// element does not carry it). `has_spread` is true when the element
    /// spreads props whose names are unknown statically; such an element
    /// cannot be shown to lack a prop.
    pub fn holds(&self, value: Option<&PropValue>, has_spread: bool) -> bool {
        match self {
            Condition::Any => true,
            Condition::Present => value.is_some(),
            Condition::Absent => value.is_none() && !has_spread,
            Condition::Equals(lit) => value.is_some_and(|v| lit.matches(v)),
            Condition::OneOf(lits) => value.is_some_and(|v| lits.iter().any(|l| l.matches(v))),
        }
    }
}

// ── Document form ────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCondition {
    Literal(Literal),
    OneOf(Vec<Literal>),
    Keyword { is: String },
}

impl TryFrom<RawCondition> for Condition {
    type Error = String;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawCondition::Literal(lit) => Condition::Equals(lit),
            RawCondition::OneOf(lits) => Condition::OneOf(lits),
            RawCondition::Keyword { is } => match is.as_str() {
                "present" => Condition::Present,
                "absent" => Condition::Absent,
                "any" => Condition::Any,
                other => {
                    return Err(format!(
                        "unknown condition '{}', expected present, absent or any",
                        other
                    ))
                }
            },
        })
    }
}

impl From<Condition> for RawCondition {
    fn from(c: Condition) -> Self {
        match c {
            Condition::Equals(lit) => RawCondition::Literal(lit),
            Condition::OneOf(lits) => RawCondition::OneOf(lits),
            Condition::Present => RawCondition::Keyword {
                is: "present".to_string(),
            },
            Condition::Absent => RawCondition::Keyword {
                is: "absent".to_string(),
            },
            Condition::Any => RawCondition::Keyword {
                is: "any".to_string(),
            },
        }
    }
}
