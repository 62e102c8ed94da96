//! Structural validation of untyped provider payloads.
//!
//! Provider responses arrive as `serde_json::Value`. A [`ResponseValidator`]
//! reads them field by field: required fields that are missing or mistyped
//! are recorded as errors, optional fields that are absent, `null` or
//! mistyped read as `None`. [`ResponseValidator::finish`] fails when any
//! error was recorded, so a partially valid record is never returned.
//!
//! Field paths are dotted (`data.items`); numbers may be JSON numbers or
//! numeric strings, and must be finite.

use serde_json::Value;
use thiserror::Error;

/// Aggregated, human-readable shape errors for one payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context}: {}", .errors.join("; "))]
pub struct ValidationErrors {
    pub context: String,
    pub errors: Vec<String>,
}

impl ValidationErrors {
    pub fn single(context: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            errors: vec![error.into()],
        }
    }
}

/// Field-by-field reader that accumulates errors instead of failing fast.
#[derive(Debug)]
pub struct ResponseValidator {
    context: String,
    prefix: Vec<String>,
    errors: Vec<String>,
}

impl ResponseValidator {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            prefix: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Records a custom error at the current scope.
    pub fn error(&mut self, message: impl AsRef<str>) {
        let scoped = self.qualify(message.as_ref());
        self.errors.push(scoped);
    }

    /// Runs `read` with `segment` prepended to every reported path.
    pub fn nested<T>(&mut self, segment: impl Into<String>, read: impl FnOnce(&mut Self) -> T) -> T {
        self.prefix.push(segment.into());
        let value = read(self);
        self.prefix.pop();
        value
    }

    pub fn required<'v>(&mut self, parent: &'v Value, path: &str) -> Option<&'v Value> {
        match lookup(parent, path) {
            Some(value) if !value.is_null() => Some(value),
            _ => {
                self.error(format!("{path}: missing required field"));
                None
            }
        }
    }

    pub fn required_str(&mut self, parent: &Value, path: &str) -> Option<String> {
        let value = self.required(parent, path)?;
        match value.as_str() {
            Some(text) => Some(text.to_owned()),
            None => {
                self.error(format!("{path}: expected string, got {}", type_name(value)));
                None
            }
        }
    }

    pub fn optional_str(&mut self, parent: &Value, path: &str) -> Option<String> {
        lookup(parent, path)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    pub fn required_f64(&mut self, parent: &Value, path: &str) -> Option<f64> {
        let value = self.required(parent, path)?;
        match as_finite_f64(value) {
            Some(number) => Some(number),
            None => {
                self.error(format!(
                    "{path}: expected finite number, got {}",
                    type_name(value)
                ));
                None
            }
        }
    }

    pub fn optional_f64(&mut self, parent: &Value, path: &str) -> Option<f64> {
        lookup(parent, path).and_then(as_finite_f64)
    }

    pub fn required_u64(&mut self, parent: &Value, path: &str) -> Option<u64> {
        let number = self.required_f64(parent, path)?;
        if number < 0.0 || number.fract() != 0.0 {
            self.error(format!("{path}: expected non-negative integer, got {number}"));
            return None;
        }
        Some(number as u64)
    }

    pub fn optional_u64(&mut self, parent: &Value, path: &str) -> Option<u64> {
        self.optional_f64(parent, path)
            .filter(|number| *number >= 0.0 && number.fract() == 0.0)
            .map(|number| number as u64)
    }

    pub fn required_array<'v>(&mut self, parent: &'v Value, path: &str) -> Option<&'v [Value]> {
        let value = self.required(parent, path)?;
        match value.as_array() {
            Some(items) => Some(items.as_slice()),
            None => {
                self.error(format!("{path}: expected array, got {}", type_name(value)));
                None
            }
        }
    }

    pub fn required_object<'v>(&mut self, parent: &'v Value, path: &str) -> Option<&'v Value> {
        let value = self.required(parent, path)?;
        if value.is_object() {
            Some(value)
        } else {
            self.error(format!("{path}: expected object, got {}", type_name(value)));
            None
        }
    }

    /// Fails if any error was recorded; otherwise returns what `build` assembles
    /// from the values that were read.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        if !self.errors.is_empty() {
            return Err(ValidationErrors {
                context: self.context,
                errors: self.errors,
            });
        }

        build().ok_or_else(|| ValidationErrors::single(self.context, "incomplete record"))
    }

    fn qualify(&self, message: &str) -> String {
        if self.prefix.is_empty() {
            message.to_owned()
        } else {
            format!("{}.{message}", self.prefix.join("."))
        }
    }
}

fn lookup<'v>(parent: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(parent, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        })
}

fn as_finite_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_nested_fields_and_numeric_strings() {
        let body = json!({"data": {"value": "1.25", "symbol": "BONK", "items": [1, 2]}});
        let mut validator = ResponseValidator::new("price");

        let value = validator.required_f64(&body, "data.value");
        let symbol = validator.required_str(&body, "data.symbol");
        let items = validator.required_array(&body, "data.items").map(<[Value]>::len);

        let record = validator
            .finish(|| Some((value?, symbol?, items?)))
            .expect("payload is valid");
        assert_eq!(record, (1.25, String::from("BONK"), 2));
    }

    #[test]
    fn optional_fields_are_lenient() {
        let body = json!({"price": 2.0, "volume": null, "mcap": "n/a"});
        let mut validator = ResponseValidator::new("price");

        assert_eq!(validator.optional_f64(&body, "volume"), None);
        assert_eq!(validator.optional_f64(&body, "mcap"), None);
        assert_eq!(validator.optional_f64(&body, "missing"), None);
        assert!(!validator.has_errors());
    }

    #[test]
    fn required_failures_aggregate_and_fail_atomically() {
        let body = json!({"data": {"value": "abc", "items": {}}});
        let mut validator = ResponseValidator::new("birdeye price");

        let value = validator.required_f64(&body, "data.value");
        let items = validator.required_array(&body, "data.items");
        let name = validator.required_str(&body, "data.name");
        let _ = (value, items, name);

        let error = validator
            .finish(|| Some(()))
            .expect_err("invalid payload must fail");
        assert_eq!(error.context, "birdeye price");
        assert_eq!(error.errors.len(), 3);
        assert!(error.to_string().contains("data.name: missing required field"));
    }

    #[test]
    fn nested_scope_prefixes_paths() {
        let body = json!({"items": [{"balance": 1.0}, {}]});
        let mut validator = ResponseValidator::new("holders");
        let items = validator.required_array(&body, "items").unwrap_or_default();

        for (index, item) in items.iter().enumerate() {
            validator.nested(format!("items[{index}]"), |v| v.required_f64(item, "balance"));
        }

        let error = validator.finish(|| Some(())).expect_err("second item is invalid");
        assert_eq!(error.errors, vec!["items[1].balance: missing required field"]);
    }

    #[test]
    fn non_finite_and_fractional_integers_are_rejected() {
        let body = json!({"count": 1.5, "price": "NaN"});
        let mut validator = ResponseValidator::new("x");

        assert_eq!(validator.required_u64(&body, "count"), None);
        assert_eq!(validator.required_f64(&body, "price"), None);
        assert_eq!(validator.finish(|| Some(())).map_err(|e| e.errors.len()), Err(2));
    }
}
