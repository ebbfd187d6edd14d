//! Request payload validation.
//!
//! Payloads are read as a raw JSON object so that a missing field, an
//! explicit `null` and a wrongly typed value each get their own message.
//! Errors are collected per field and returned together as a 400 body of
//! the form `{"field": ["message", ...]}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use zebrands_core::Price;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_STRING: &str = "Not a valid string.";

/// Field-keyed validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single error on a single field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`, if any.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collected errors if any field failed validation.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Rules for a text field.
#[derive(Debug, Clone, Copy)]
pub struct TextField {
    pub name: &'static str,
    pub max_length: usize,
    pub allow_blank: bool,
}

impl TextField {
    #[must_use]
    pub const fn new(name: &'static str, max_length: usize) -> Self {
        Self {
            name,
            max_length,
            allow_blank: false,
        }
    }

    #[must_use]
    pub const fn blank_allowed(mut self) -> Self {
        self.allow_blank = true;
        self
    }
}

/// A JSON object body awaiting validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Read a text field.
    ///
    /// Numbers are accepted and converted to their decimal text; surrounding
    /// whitespace is trimmed before the blank and length checks. Returns
    /// `None` when the field is absent or invalid (recording an error for
    /// the latter, and for the former when `required`).
    pub fn text(
        &self,
        field: TextField,
        required: bool,
        errors: &mut ValidationErrors,
    ) -> Option<String> {
        let value = match self.0.get(field.name) {
            None => {
                if required {
                    errors.add(field.name, REQUIRED);
                }
                return None;
            }
            Some(Value::Null) => {
                errors.add(field.name, NOT_NULL);
                return None;
            }
            Some(Value::String(s)) => s.trim().to_owned(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => {
                errors.add(field.name, NOT_STRING);
                return None;
            }
        };

        if value.is_empty() && !field.allow_blank {
            errors.add(field.name, NOT_BLANK);
            return None;
        }
        if value.chars().count() > field.max_length {
            errors.add(
                field.name,
                format!(
                    "Ensure this field has no more than {} characters.",
                    field.max_length
                ),
            );
            return None;
        }
        Some(value)
    }

    /// Read a decimal price given as a JSON string or number.
    pub fn price(
        &self,
        name: &'static str,
        required: bool,
        errors: &mut ValidationErrors,
    ) -> Option<Price> {
        let parsed = match self.0.get(name) {
            None => {
                if required {
                    errors.add(name, REQUIRED);
                }
                return None;
            }
            Some(Value::Null) => {
                errors.add(name, NOT_NULL);
                return None;
            }
            Some(Value::String(s)) => Price::parse(s),
            Some(Value::Number(n)) => Price::parse(&n.to_string()),
            Some(_) => Err(zebrands_core::PriceError::Invalid),
        };

        parsed
            .map_err(|e| errors.add(name, e.to_string()))
            .ok()
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
