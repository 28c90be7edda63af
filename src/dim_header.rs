//! Per-index ("dynamic") header values of the higher dimensions.
//!
//! A dimension header maps metadata keys to one value per index of its
//! dimension. Each value is kept in one of two forms: the long form lists
//! every element, while the short form only stores the `start` and
//! `increment` of an arithmetic sequence. User-defined keys additionally
//! wrap the value with a description.

use crate::error::{NiftiMrsError, Result};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Per-index header of one higher dimension, by metadata key.
pub type DimensionHeader = BTreeMap<String, HeaderValue>;

/// A per-index header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// One explicit value per index.
    Long(Vec<Value>),
    /// The arithmetic sequence `start + i * increment`.
    Short {
        /// Value at index 0.
        start: Number,
        /// Difference between consecutive indices.
        increment: Number,
    },
    /// A user-defined value along with its description.
    UserDefined {
        /// The wrapped value, in long or short form.
        value: Box<HeaderValue>,
        /// Description of the user-defined key.
        description: String,
    },
}

impl HeaderValue {
    /// Create a short form value.
    pub fn short<S, I>(start: S, increment: I) -> Self
    where
        S: Into<Number>,
        I: Into<Number>,
    {
        HeaderValue::Short {
            start: start.into(),
            increment: increment.into(),
        }
    }

    /// Wrap a value as user-defined.
    pub fn user_defined(value: HeaderValue, description: &str) -> Self {
        HeaderValue::UserDefined {
            value: Box::new(value),
            description: description.to_owned(),
        }
    }

    /// Interpret a JSON value found under `key` of a dimension header.
    pub fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(HeaderValue::Long(items.clone())),
            Value::Object(map) => {
                if let (Some(start), Some(increment)) = (map.get("start"), map.get("increment")) {
                    match (start, increment) {
                        (Value::Number(start), Value::Number(increment)) => {
                            Ok(HeaderValue::Short {
                                start: start.clone(),
                                increment: increment.clone(),
                            })
                        }
                        _ => Err(NiftiMrsError::BadDynamicHeaderFormat(
                            key.to_owned(),
                            "`start` and `increment` must be numbers".to_owned(),
                        )),
                    }
                } else if let Some(inner) = map.get("Value") {
                    let description = map
                        .get("Description")
                        .and_then(Value::as_str)
                        .ok_or_else(|| NiftiMrsError::MalformedUserField(key.to_owned()))?;
                    let inner = HeaderValue::from_value(key, inner)?;
                    if let HeaderValue::UserDefined { .. } = inner {
                        return Err(NiftiMrsError::BadDynamicHeaderFormat(
                            key.to_owned(),
                            "user-defined values cannot be nested".to_owned(),
                        ));
                    }
                    Ok(HeaderValue::user_defined(inner, description))
                } else {
                    Err(NiftiMrsError::BadDynamicHeaderFormat(
                        key.to_owned(),
                        "object must contain `start` and `increment`".to_owned(),
                    ))
                }
            }
            _ => Err(NiftiMrsError::BadDynamicHeaderFormat(
                key.to_owned(),
                "must be a list or an object with `start` and `increment`".to_owned(),
            )),
        }
    }

    /// Convert into the JSON representation.
    pub fn to_value(&self) -> Value {
        match self {
            HeaderValue::Long(items) => Value::Array(items.clone()),
            HeaderValue::Short { start, increment } => {
                let mut map = Map::new();
                let _ = map.insert("start".to_owned(), Value::Number(start.clone()));
                let _ = map.insert("increment".to_owned(), Value::Number(increment.clone()));
                Value::Object(map)
            }
            HeaderValue::UserDefined { value, description } => {
                let mut map = Map::new();
                let _ = map.insert("Value".to_owned(), value.to_value());
                let _ = map.insert("Description".to_owned(), Value::String(description.clone()));
                Value::Object(map)
            }
        }
    }

    /// Whether the (possibly wrapped) value is in short form.
    pub fn is_short(&self) -> bool {
        match self {
            HeaderValue::Short { .. } => true,
            HeaderValue::Long(_) => false,
            HeaderValue::UserDefined { value, .. } => value.is_short(),
        }
    }

    /// Number of explicit elements, `None` for the short form.
    pub fn explicit_len(&self) -> Option<usize> {
        match self {
            HeaderValue::Long(items) => Some(items.len()),
            HeaderValue::Short { .. } => None,
            HeaderValue::UserDefined { value, .. } => value.explicit_len(),
        }
    }

    /// Expand to `elements` explicit values.
    ///
    /// Long form values are returned unchanged.
    pub fn to_long_form(&self, elements: usize) -> HeaderValue {
        match self {
            HeaderValue::Long(_) => self.clone(),
            HeaderValue::Short { start, increment } => {
                HeaderValue::Long(expand(start, increment, elements))
            }
            HeaderValue::UserDefined { value, description } => HeaderValue::UserDefined {
                value: Box::new(value.to_long_form(elements)),
                description: description.clone(),
            },
        }
    }

    /// Compress to the short form if the values form an arithmetic sequence
    /// which expands back to exactly the same values.
    ///
    /// Values which cannot be compressed are returned unchanged.
    pub fn to_short_form(&self) -> HeaderValue {
        match self {
            HeaderValue::Long(items) => match compress(items) {
                Some((start, increment)) => HeaderValue::Short { start, increment },
                None => self.clone(),
            },
            HeaderValue::Short { .. } => self.clone(),
            HeaderValue::UserDefined { value, description } => HeaderValue::UserDefined {
                value: Box::new(value.to_short_form()),
                description: description.clone(),
            },
        }
    }

    /// The explicit values of this header value along a dimension of size `elements`.
    pub fn values(&self, elements: usize) -> Vec<Value> {
        match self.to_long_form(elements) {
            HeaderValue::Long(items) => items,
            HeaderValue::UserDefined { value, .. } => value.values(elements),
            HeaderValue::Short { .. } => Vec::new(),
        }
    }

    /// Pick the elements at the given indices of a dimension of size
    /// `elements`, keeping the short form if this value was in short form
    /// and the selection is still an arithmetic sequence.
    pub(crate) fn select(&self, elements: usize, indices: &[usize]) -> Result<HeaderValue> {
        let items = self.values(elements);
        let picked = indices
            .iter()
            .map(|&i| {
                items
                    .get(i)
                    .cloned()
                    .ok_or_else(|| NiftiMrsError::IndexOutOfRange(i, items.len()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.rebuild(picked))
    }

    /// Append the values of `other` to the values of `self`, where each
    /// side covers a dimension of the given size. The short form is
    /// attempted only if `self` was in short form.
    pub(crate) fn concat(
        &self,
        elements: usize,
        other: &HeaderValue,
        other_elements: usize,
    ) -> Result<HeaderValue> {
        match (self, other) {
            (HeaderValue::UserDefined { .. }, HeaderValue::UserDefined { .. }) => {}
            (HeaderValue::UserDefined { .. }, _) | (_, HeaderValue::UserDefined { .. }) => {
                return Err(NiftiMrsError::TagMismatch(
                    "cannot merge a user-defined header value with a standard one".to_owned(),
                ));
            }
            _ => {}
        }
        let mut items = self.values(elements);
        items.extend(other.values(other_elements));
        Ok(self.rebuild(items))
    }

    /// Rebuild a value of the same kind as `self` out of explicit items.
    fn rebuild(&self, items: Vec<Value>) -> HeaderValue {
        let long = HeaderValue::Long(items);
        let rebuilt = if self.is_short() {
            long.to_short_form()
        } else {
            long
        };
        match self {
            HeaderValue::UserDefined { description, .. } => {
                HeaderValue::user_defined(rebuilt, description)
            }
            _ => rebuilt,
        }
    }
}

/// Convert a whole dimension header to JSON.
pub fn header_to_value(header: &DimensionHeader) -> Value {
    Value::Object(
        header
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect(),
    )
}

/// Interpret a JSON object as a dimension header.
pub fn header_from_value(key: &str, value: &Value) -> Result<DimensionHeader> {
    let map = value
        .as_object()
        .ok_or_else(|| NiftiMrsError::WrongType(key.to_owned(), "object".to_owned()))?;
    map.iter()
        .map(|(k, v)| Ok((k.clone(), HeaderValue::from_value(k, v)?)))
        .collect()
}

fn number_as_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(::std::f64::NAN)
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}

fn expand(start: &Number, increment: &Number, elements: usize) -> Vec<Value> {
    let ints = start.as_i64().zip(increment.as_i64());
    let (start_f, increment_f) = (number_as_f64(start), number_as_f64(increment));
    (0..elements)
        .map(|i| {
            ints.and_then(|(start, increment)| {
                (i as i64)
                    .checked_mul(increment)
                    .and_then(|step| start.checked_add(step))
            })
            // elements outside the i64 range continue as floats
            .map_or_else(|| float_value(start_f + i as f64 * increment_f), Value::from)
        })
        .collect()
}

fn compress(items: &[Value]) -> Option<(Number, Number)> {
    if items.len() < 2 {
        return None;
    }
    let ints: Option<Vec<i64>> = items.iter().map(Value::as_i64).collect();
    if let Some(ints) = ints {
        let increment = ints[1].checked_sub(ints[0])?;
        let arithmetic = ints
            .windows(2)
            .all(|w| w[1].checked_sub(w[0]) == Some(increment));
        return if arithmetic {
            Some((ints[0].into(), increment.into()))
        } else {
            None
        };
    }

    let floats: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
    let floats = floats?;
    let start = floats[0];
    let increment = floats[1] - floats[0];
    let exact = floats
        .iter()
        .enumerate()
        .all(|(i, &v)| start + i as f64 * increment == v);
    if exact {
        Some((Number::from_f64(start)?, Number::from_f64(increment)?))
    } else {
        None
    }
}
