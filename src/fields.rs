//! Field-by-field reading of JSON request bodies.
//!
//! Each field is converted on its own so that a body with several bad
//! fields reports every one of them under its own name. `null` and `""`
//! count as absent.

use serde_json::{Map, Value};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::{field_errors, AppError, FieldErrors};

pub struct FieldReader {
    object: Map<String, Value>,
    errors: FieldErrors,
}

impl FieldReader {
    pub fn new(body: Value) -> Result<Self, AppError> {
        match body {
            Value::Object(object) => Ok(Self {
                object,
                errors: FieldErrors::new(),
            }),
            _ => Err(AppError::invalid("body", "The body must be a JSON object.")),
        }
    }

    pub fn fail(&mut self, name: &str, message: String) {
        self.errors.entry(name.to_string()).or_default().push(message);
    }

    pub fn has_error(&self, name: &str) -> bool {
        self.errors.contains_key(name)
    }

    fn present(&self, name: &str) -> Option<&Value> {
        match self.object.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(value) => Some(value),
        }
    }

    fn required(&mut self, name: &str) -> Option<Value> {
        let value = self.present(name).cloned();
        if value.is_none() {
            self.fail(name, format!("The {} field is required.", name));
        }
        value
    }

    pub fn string(&mut self, name: &str) -> Option<String> {
        match self.present(name).cloned() {
            None => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => {
                self.fail(name, format!("The {} must be a string.", name));
                None
            }
        }
    }

    /// Missing or mistyped values come back empty; the error is recorded.
    pub fn required_string(&mut self, name: &str) -> String {
        match self.required(name) {
            Some(Value::String(s)) => s,
            Some(_) => {
                self.fail(name, format!("The {} must be a string.", name));
                String::new()
            }
            None => String::new(),
        }
    }

    /// Accepts `true`, `false`, `1`, `0`, `"1"`, `"0"`, `"true"` and `"false"`.
    pub fn boolean(&mut self, name: &str, default: bool) -> bool {
        let parsed = match self.present(name) {
            None => return default,
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Some(Value::String(s)) => match s.as_str() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            Some(_) => None,
        };
        parsed.unwrap_or_else(|| {
            self.fail(name, format!("The {} field must be true or false.", name));
            default
        })
    }

    /// Integers and integral strings that fit an `i32`.
    pub fn required_integer(&mut self, name: &str) -> i32 {
        let parsed = match self.required(name) {
            None => return 0,
            Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse::<i32>().ok(),
            Some(_) => None,
        };
        parsed.unwrap_or_else(|| {
            self.fail(name, format!("The {} must be an integer.", name));
            0
        })
    }

    /// One of a closed set of labels; numbers are compared by their text.
    pub fn required_choice<T: FromStr>(&mut self, name: &str) -> Option<T> {
        let label = match self.required(name)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        let parsed = label.parse::<T>().ok();
        if parsed.is_none() {
            self.fail(name, format!("The selected {} is invalid.", name));
        }
        parsed
    }

    /// An array of identifiers. Absent gives `None`.
    pub fn uuid_list(&mut self, name: &str) -> Option<Vec<Uuid>> {
        let items = match self.object.get(name) {
            None | Some(Value::Null) => return None,
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                self.fail(name, format!("The {} must be an array.", name));
                return None;
            }
        };
        let ids: Option<Vec<Uuid>> = items
            .iter()
            .map(|item| item.as_str().and_then(|s| Uuid::parse_str(s).ok()))
            .collect();
        if ids.is_none() {
            self.fail(name, format!("The selected {} is invalid.", name));
        }
        ids
    }

    /// Runs the request's `Validate` rules for fields that read cleanly and
    /// returns every collected error at once.
    pub fn finish<T: Validate>(mut self, request: T) -> Result<T, AppError> {
        if let Err(e) = request.validate() {
            for (field, messages) in field_errors(&e) {
                self.errors.entry(field).or_insert(messages);
            }
        }
        if self.errors.is_empty() {
            Ok(request)
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}
