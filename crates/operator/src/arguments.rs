//! Operator arguments and typed extraction helpers.
//!
//! Arguments arrive as a string-keyed map of JSON values. Only strings,
//! booleans and numbers are meaningful; unknown keys are ignored and a value
//! of the wrong type is an argument error naming the key.

use crate::error::{OperatorError, Result};
use serde_json::Value;

/// Free-form operator arguments.
pub type Arguments = serde_json::Map<String, Value>;

/// Required boolean argument.
pub fn get_bool(args: &Arguments, key: &str) -> Result<bool> {
    match args.get(key) {
        None => Err(not_provided(key)),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(wrong_type(key, "bool", other)),
    }
}

/// Required non-empty string argument.
pub fn get_string(args: &Arguments, key: &str) -> Result<String> {
    match get_optional_string(args, key)? {
        None => Err(not_provided(key)),
        Some(s) if s.is_empty() => Err(OperatorError::argument(format!(
            "argument {key} cannot be empty"
        ))),
        Some(s) => Ok(s),
    }
}

/// Optional string argument; empty strings are returned as-is.
pub fn get_optional_string(args: &Arguments, key: &str) -> Result<Option<String>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(wrong_type(key, "string", other)),
    }
}

/// Optional numeric argument, read as a float.
pub fn get_optional_f64(args: &Arguments, key: &str) -> Result<Option<f64>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| wrong_type(key, "number", &Value::Number(n.clone()))),
        Some(other) => Err(wrong_type(key, "number", other)),
    }
}

fn not_provided(key: &str) -> OperatorError {
    OperatorError::argument(format!(
        "argument {key} not provided, could not use the operator"
    ))
}

fn wrong_type(key: &str, expected: &str, got: &Value) -> OperatorError {
    OperatorError::argument(format!(
        "could not parse {key} argument as {expected}, argument provided: {got}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_get_bool() {
        let a = args(json!({"maintenance": true, "other": "x"}));
        assert!(get_bool(&a, "maintenance").unwrap());

        let err = get_bool(&a, "missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument missing not provided, could not use the operator"
        );

        let err = get_bool(&a, "other").unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"could not parse other argument as bool, argument provided: "x""#
        );
    }

    #[test]
    fn test_get_string_rejects_empty() {
        let a = args(json!({"solution": ""}));
        assert_eq!(
            get_string(&a, "solution").unwrap_err().to_string(),
            "argument solution cannot be empty"
        );
    }

    #[test]
    fn test_get_optional_string_keeps_empty() {
        let a = args(json!({"resource_id": ""}));
        assert_eq!(
            get_optional_string(&a, "resource_id").unwrap(),
            Some(String::new())
        );
        assert_eq!(get_optional_string(&a, "node_id").unwrap(), None);
    }

    #[test]
    fn test_get_optional_f64_accepts_integers() {
        let a = args(json!({"timeout": 30, "bad": "30"}));
        assert_eq!(get_optional_f64(&a, "timeout").unwrap(), Some(30.0));
        assert!(get_optional_f64(&a, "bad").is_err());
    }
}
