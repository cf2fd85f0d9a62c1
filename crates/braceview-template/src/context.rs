/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Context value types.
//!
//! A [`Context`] maps keys to either a [`Scalar`] (used by conditionals and
//! value placeholders) or a list of [`Row`]s (used by loop blocks). Keeping the
//! two apart in [`ContextValue`] means a loop never iterates a scalar and a
//! placeholder never prints a list.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::{TemplateError, TemplateResult};

/// A single printable value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    /// A string value.
    String(String),

    /// A numeric value.
    Number(Number),

    /// A boolean value.
    Bool(bool),

    /// A null/missing value.
    #[default]
    Null,
}

impl Scalar {
    /// Check if this value is "truthy" for conditional evaluation.
    ///
    /// - `Null` is falsy
    /// - Booleans are themselves
    /// - Numbers are truthy unless zero
    /// - Strings are truthy unless empty or `"0"`
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Scalar::String(s) => !s.is_empty() && s != "0",
        }
    }

    /// Render this value as a string for output.
    ///
    /// `true` prints as `1`; `false` and `Null` print as nothing.
    pub fn render(&self) -> String {
        match self {
            Scalar::String(s) => s.clone(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Bool(true) => "1".to_string(),
            Scalar::Bool(false) | Scalar::Null => String::new(),
        }
    }

    fn from_json(key: &str, value: Value) -> TemplateResult<Self> {
        match value {
            Value::Null => Ok(Scalar::Null),
            Value::Bool(b) => Ok(Scalar::Bool(b)),
            Value::Number(n) => Ok(Scalar::Number(n)),
            Value::String(s) => Ok(Scalar::String(s)),
            Value::Array(_) | Value::Object(_) => Err(TemplateError::InvalidContext {
                message: format!("value for '{key}' must be a scalar"),
            }),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<f64> for Scalar {
    /// Non-finite floats have no JSON number form and become `Null`.
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Scalar::Null, Scalar::Number)
    }
}

/// One row of loop data: an ordered map of keys to scalars.
pub type Row = IndexMap<String, Scalar>;

/// A value bound to a context key.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// A printable value for conditionals and placeholders.
    Scalar(Scalar),

    /// Loop data; each row is substituted into one copy of the loop body.
    Rows(Vec<Row>),
}

impl ContextValue {
    /// Truthiness used by conditional blocks. Row lists are truthy when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            ContextValue::Scalar(s) => s.is_truthy(),
            ContextValue::Rows(rows) => !rows.is_empty(),
        }
    }

    /// The scalar, if this is one.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            ContextValue::Scalar(s) => Some(s),
            ContextValue::Rows(_) => None,
        }
    }

    /// The rows, if this is loop data.
    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            ContextValue::Rows(rows) => Some(rows),
            ContextValue::Scalar(_) => None,
        }
    }
}

macro_rules! scalar_context_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ContextValue {
                fn from(value: $ty) -> Self {
                    ContextValue::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_context_value!(Scalar, &str, String, bool, i64, u64, i32, f64);

impl From<Vec<Row>> for ContextValue {
    fn from(rows: Vec<Row>) -> Self {
        ContextValue::Rows(rows)
    }
}

/// The data bound to placeholders during a render, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: IndexMap<String, ContextValue>,
}

impl Context {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder form of [`Context::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get the value for a key.
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    /// Check whether a key is bound.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate over bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy every binding from `other` that this context does not already have.
    pub fn merge_missing(&mut self, other: &Context) {
        for (key, value) in &other.values {
            if !self.values.contains_key(key) {
                self.values.insert(key.clone(), value.clone());
            }
        }
    }

    /// Build a context from a JSON object.
    ///
    /// Top-level scalars become [`ContextValue::Scalar`]; arrays of objects
    /// whose fields are all scalars become [`ContextValue::Rows`]. Anything
    /// else (nested objects, arrays of scalars) is rejected.
    pub fn from_json(value: Value) -> TemplateResult<Self> {
        let Value::Object(map) = value else {
            return Err(TemplateError::InvalidContext {
                message: "context must be a JSON object".to_string(),
            });
        };

        let mut context = Context::new();
        for (key, value) in map {
            let value = match value {
                Value::Array(items) => ContextValue::Rows(rows_from_json(&key, items)?),
                other => ContextValue::Scalar(Scalar::from_json(&key, other)?),
            };
            context.values.insert(key, value);
        }
        Ok(context)
    }

    /// Build a context from any serializable value whose shape is a map.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> TemplateResult<Self> {
        let json = serde_json::to_value(value).map_err(|e| TemplateError::InvalidContext {
            message: e.to_string(),
        })?;
        Self::from_json(json)
    }
}

fn rows_from_json(key: &str, items: Vec<Value>) -> TemplateResult<Vec<Row>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => fields
                .into_iter()
                .map(|(field, value)| {
                    let scalar = Scalar::from_json(&format!("{key}[{index}].{field}"), value)?;
                    Ok((field, scalar))
                })
                .collect(),
            _ => Err(TemplateError::InvalidContext {
                message: format!("'{key}[{index}]' must be an object of scalars"),
            }),
        })
        .collect()
}

impl<K: Into<String>, V: Into<ContextValue>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Context::new();
        for (key, value) in iter {
            context.insert(key, value);
        }
        context
    }
}

/// Build a [`Row`] from key/value pairs.
pub fn row<K: Into<String>, V: Into<Scalar>>(pairs: impl IntoIterator<Item = (K, V)>) -> Row {
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
