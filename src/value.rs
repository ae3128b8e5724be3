//! Result values, candidate lists and probe sources.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::checks::CheckDefinition;
use crate::detector::Detector;
use crate::error::{DetectionError, Result};

/// Resolved outcome of a check.
///
/// Property and prefix checks report the first supported variant by name;
/// everything else is a plain flag. Serializes as a bare JSON boolean or string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CheckValue {
    Flag(bool),
    Variant(String),
}

impl CheckValue {
    /// Whether the value counts as "supported" for class annotation.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Variant(name) => !name.is_empty(),
        }
    }

    /// The supported variant name, if any.
    #[must_use]
    pub fn variant(&self) -> Option<&str> {
        match self {
            Self::Variant(name) => Some(name),
            Self::Flag(_) => None,
        }
    }
}

impl Default for CheckValue {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl From<bool> for CheckValue {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<Option<&str>> for CheckValue {
    fn from(found: Option<&str>) -> Self {
        match found {
            Some(name) => Self::Variant(name.to_string()),
            None => Self::Flag(false),
        }
    }
}

impl fmt::Display for CheckValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Variant(name) => write!(f, "{name}"),
        }
    }
}

/// Ordered CSS property name candidates, most standard first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Candidates(Vec<String>);

impl Candidates {
    /// Builds candidates from a JSON string (space-delimited) or array of strings.
    pub fn from_json(context: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(list) => Ok(Self::from(list.as_str())),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        DetectionError::unexpected_json(
                            context,
                            "a string or an array of strings",
                            item,
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Self),
            other => Err(DetectionError::unexpected_json(
                context,
                "a string or an array of strings",
                other,
            )),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Candidates {
    fn from(list: &str) -> Self {
        Self(list.split_whitespace().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Candidates {
    fn from(list: Vec<String>) -> Self {
        Self(list)
    }
}

impl From<&[&str]> for Candidates {
    fn from(list: &[&str]) -> Self {
        Self(list.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Candidates {
    fn from(list: [&str; N]) -> Self {
        Self::from(&list[..])
    }
}

/// Closure form of a probe; receives the detector so it can reuse the primitives.
///
/// Only the primitives are visible: a computed probe cannot read other
/// checks' results.
pub type ProbeFn = Box<dyn Fn(&Detector) -> CheckValue>;

/// Source of a check's value, resolved once through [`Probe::resolve`].
pub enum Probe {
    /// Precomputed value.
    Literal(CheckValue),
    /// A table-driven definition evaluated by the detector.
    Check(CheckDefinition),
    /// Caller-supplied computation.
    Computed(ProbeFn),
}

impl Probe {
    /// Wraps a closure returning anything convertible into a [`CheckValue`].
    pub fn computed<F, V>(f: F) -> Self
    where
        F: Fn(&Detector) -> V + 'static,
        V: Into<CheckValue>,
    {
        Self::Computed(Box::new(move |detector| f(detector).into()))
    }

    pub fn resolve(&self, detector: &Detector) -> CheckValue {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Check(definition) => detector.evaluate(definition),
            Self::Computed(f) => f(detector),
        }
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Check(definition) => f.debug_tuple("Check").field(definition).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<bool> for Probe {
    fn from(flag: bool) -> Self {
        Self::Literal(CheckValue::Flag(flag))
    }
}

impl From<CheckValue> for Probe {
    fn from(value: CheckValue) -> Self {
        Self::Literal(value)
    }
}

impl From<CheckDefinition> for Probe {
    fn from(definition: CheckDefinition) -> Self {
        Self::Check(definition)
    }
}
