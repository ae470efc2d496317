/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PampacError;

/// The feature map of an annotation or document
pub type Features = BTreeMap<String, FeatureValue>;

/// A key with a constraint on its value, as used by [`crate::Parser::ann()`] and friends
pub type FeatureConstraint = (String, FeatureOperator);

/// A feature value. This is a closed variant over the JSON value model, it (de)serializes to plain JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(untagged)]
pub enum FeatureValue {
    ///No value
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Value is an ordered list
    List(Vec<FeatureValue>),
    /// Value is a mapping with string keys
    Map(BTreeMap<String, FeatureValue>),
}

impl FeatureValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view on the value, both integers and floats qualify
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FeatureValue]> {
        match self {
            Self::List(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Tests the value against an operator, see [`FeatureOperator::test()`]
    pub fn test(&self, operator: &FeatureOperator) -> bool {
        operator.test(Some(self))
    }
}

impl fmt::Display for FeatureValue {
    /// Strings are printed without quotes, all other values as JSON
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::List(_) | Self::Map(_) => {
                let value: serde_json::Value = self.clone().into();
                write!(f, "{}", value)
            }
        }
    }
}

impl From<&str> for FeatureValue {
    fn from(item: &str) -> Self {
        Self::String(item.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(item: String) -> Self {
        Self::String(item)
    }
}

impl From<&String> for FeatureValue {
    fn from(item: &String) -> Self {
        Self::String(item.clone())
    }
}

impl From<f64> for FeatureValue {
    fn from(item: f64) -> Self {
        Self::Float(item)
    }
}

impl From<f32> for FeatureValue {
    fn from(item: f32) -> Self {
        Self::Float(item as f64)
    }
}

impl From<i64> for FeatureValue {
    fn from(item: i64) -> Self {
        Self::Int(item)
    }
}

impl From<i32> for FeatureValue {
    fn from(item: i32) -> Self {
        Self::Int(item as i64)
    }
}

impl From<u32> for FeatureValue {
    fn from(item: u32) -> Self {
        Self::Int(item as i64)
    }
}

impl From<usize> for FeatureValue {
    /// Values beyond the range of i64 are stored as floats
    fn from(item: usize) -> Self {
        match i64::try_from(item) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Float(item as f64),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(item: bool) -> Self {
        Self::Bool(item)
    }
}

impl From<Vec<FeatureValue>> for FeatureValue {
    fn from(item: Vec<FeatureValue>) -> Self {
        Self::List(item)
    }
}

impl From<BTreeMap<String, FeatureValue>> for FeatureValue {
    fn from(item: BTreeMap<String, FeatureValue>) -> Self {
        Self::Map(item)
    }
}

impl<T> From<Option<T>> for FeatureValue
where
    T: Into<FeatureValue>,
{
    fn from(item: Option<T>) -> Self {
        match item {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<serde_json::Value> for FeatureValue {
    fn from(item: serde_json::Value) -> Self {
        match item {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(v) => Self::Bool(v),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Self::Int(v)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(v) => Self::String(v),
            serde_json::Value::Array(v) => Self::List(v.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(v) => {
                Self::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<FeatureValue> for serde_json::Value {
    fn from(item: FeatureValue) -> Self {
        match item {
            FeatureValue::Null => serde_json::Value::Null,
            FeatureValue::Bool(v) => serde_json::Value::Bool(v),
            FeatureValue::Int(v) => serde_json::Value::from(v),
            FeatureValue::Float(v) => serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FeatureValue::String(v) => serde_json::Value::String(v),
            FeatureValue::List(v) => {
                serde_json::Value::Array(v.into_iter().map(Into::into).collect())
            }
            FeatureValue::Map(v) => {
                serde_json::Value::Object(v.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

// These PartialEq implementation allow for more direct comparisons

impl PartialEq<str> for FeatureValue {
    fn eq(&self, other: &str) -> bool {
        match self {
            Self::String(v) => v == other,
            _ => false,
        }
    }
}

impl PartialEq<&str> for FeatureValue {
    fn eq(&self, other: &&str) -> bool {
        match self {
            Self::String(v) => v == *other,
            _ => false,
        }
    }
}

impl PartialEq<FeatureValue> for str {
    fn eq(&self, other: &FeatureValue) -> bool {
        match other {
            FeatureValue::String(v) => v.as_str() == self,
            _ => false,
        }
    }
}

impl PartialEq<f64> for FeatureValue {
    fn eq(&self, other: &f64) -> bool {
        match self {
            Self::Float(v) => v == other,
            _ => false,
        }
    }
}

impl PartialEq<i64> for FeatureValue {
    fn eq(&self, other: &i64) -> bool {
        match self {
            Self::Int(v) => v == other,
            _ => false,
        }
    }
}

impl PartialEq<bool> for FeatureValue {
    fn eq(&self, other: &bool) -> bool {
        match self {
            Self::Bool(v) => v == other,
            _ => false,
        }
    }
}

/// Expresses a constraint on a feature value, used when matching annotations by their features.
/// The operator is tested against an optional value: `None` means the feature is absent.
#[derive(Debug, Clone)]
pub enum FeatureOperator {
    /// The feature is present, with whatever value
    Any,
    /// The feature is present and its value is null
    Null,
    Equals(FeatureValue),
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
    LessThan(f64),
    LessThanOrEqual(f64),
    /// The value is a string matching the regular expression (unanchored)
    Regex(Regex),
    /// The value is a list containing this element
    HasElement(FeatureValue),
    Not(Box<FeatureOperator>),
    And(Vec<FeatureOperator>),
    Or(Vec<FeatureOperator>),
}

impl FeatureOperator {
    /// Shortcut to construct [`Self::Equals`]
    pub fn equals(value: impl Into<FeatureValue>) -> Self {
        Self::Equals(value.into())
    }

    /// Compiles a regular expression into a [`Self::Regex`] operator
    pub fn regex(pattern: &str) -> Result<Self, PampacError> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| PampacError::RegexError(e, "FeatureOperator::regex"))
    }

    /// Negates an operator
    pub fn not(operator: FeatureOperator) -> Self {
        Self::Not(Box::new(operator))
    }

    pub fn test(&self, value: Option<&FeatureValue>) -> bool {
        match self {
            Self::Not(operator) => !operator.test(value),
            Self::And(operators) => operators.iter().all(|op| op.test(value)),
            Self::Or(operators) => operators.iter().any(|op| op.test(value)),
            _ => match value {
                None => false,
                Some(value) => self.test_value(value),
            },
        }
    }

    fn test_value(&self, value: &FeatureValue) -> bool {
        match self {
            Self::Any => true,
            Self::Null => value.is_null(),
            Self::Equals(reference) => {
                if let (Some(a), Some(b)) = (value.as_f64(), reference.as_f64()) {
                    // integers and floats compare numerically
                    a == b
                } else {
                    value == reference
                }
            }
            Self::GreaterThan(x) => value.as_f64().map_or(false, |v| v > *x),
            Self::GreaterThanOrEqual(x) => value.as_f64().map_or(false, |v| v >= *x),
            Self::LessThan(x) => value.as_f64().map_or(false, |v| v < *x),
            Self::LessThanOrEqual(x) => value.as_f64().map_or(false, |v| v <= *x),
            Self::Regex(regex) => value.as_str().map_or(false, |s| regex.is_match(s)),
            Self::HasElement(element) => value
                .as_list()
                .map_or(false, |list| list.iter().any(|v| v == element)),
            Self::Not(_) | Self::And(_) | Self::Or(_) => self.test(Some(value)),
        }
    }
}

/// Tests whether all constraints hold for the given features
pub fn test_features(features: &Features, constraints: &[FeatureConstraint]) -> bool {
    constraints
        .iter()
        .all(|(key, operator)| operator.test(features.get(key)))
}
