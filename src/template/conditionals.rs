//! Expression evaluation for conditional commands
//!
//! `IFTRUE` and `IF` evaluate expressions like `mood == 'happy' and count > 2`
//! against the run's variables. Variables are strings; values that look like
//! integers, floats or booleans are exposed with those types so comparisons
//! behave the way authors expect.

use super::errors::CommandError;
use minijinja::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Evaluate a conditional expression against the run variables
///
/// Supports:
/// - Variable access: `mood`, `count`
/// - Comparison: `==`, `!=`, `<`, `>`, `<=`, `>=`
/// - Boolean: `and`, `or`, `not`
/// - Literals: `'string'`, `"string"`, numbers, `true`, `false`
/// - Parentheses: `(expr)`
pub fn evaluate_condition(
    expr: &str,
    variables: &HashMap<String, String>,
) -> Result<bool, CommandError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(false);
    }

    let env = minijinja::Environment::new();

    // Wrap the expression in a template that outputs true/false
    let template_str = format!("{{% if {expr} %}}true{{% else %}}false{{% endif %}}");

    let template = env
        .template_from_str(&template_str)
        .map_err(|e| CommandError::expression(format!("invalid expression syntax: {}", e)))?;

    let result = template
        .render(variables_to_value(variables))
        .map_err(|e| CommandError::expression(e.to_string()))?;

    Ok(result == "true")
}

/// Expose variables with their most specific scalar type
fn variables_to_value(variables: &HashMap<String, String>) -> Value {
    let map: BTreeMap<String, Value> = variables
        .iter()
        .map(|(k, v)| (k.clone(), typed_value(v)))
        .collect();
    Value::from_iter(map)
}

fn typed_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed == "true" {
        Value::from(true)
    } else if trimmed == "false" {
        Value::from(false)
    } else if let Ok(n) = trimmed.parse::<i64>() {
        Value::from(n)
    } else if let Ok(n) = trimmed.parse::<f64>() {
        Value::from(n)
    } else {
        Value::from(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_condition_is_false() {
        let v = HashMap::new();
        assert!(!evaluate_condition("", &v).unwrap());
        assert!(!evaluate_condition("  ", &v).unwrap());
    }

    #[test]
    fn test_literals() {
        let v = HashMap::new();
        assert!(evaluate_condition("true", &v).unwrap());
        assert!(!evaluate_condition("false", &v).unwrap());
        assert!(evaluate_condition("1 < 2", &v).unwrap());
    }

    #[test]
    fn test_string_equality() {
        let v = vars(&[("mood", "happy")]);
        assert!(evaluate_condition("mood == 'happy'", &v).unwrap());
        assert!(!evaluate_condition("mood == 'sad'", &v).unwrap());
        assert!(evaluate_condition("mood != 'sad'", &v).unwrap());
    }

    #[test]
    fn test_numeric_variables_compare_as_numbers() {
        let v = vars(&[("count", "10")]);
        assert!(evaluate_condition("count > 9", &v).unwrap());
        assert!(!evaluate_condition("count < 2", &v).unwrap());
    }

    #[test]
    fn test_boolean_operators() {
        let v = vars(&[("a", "true"), ("b", "false")]);
        assert!(evaluate_condition("a and not b", &v).unwrap());
        assert!(evaluate_condition("b or a", &v).unwrap());
        assert!(!evaluate_condition("(a and b) or false", &v).unwrap());
    }

    #[test]
    fn test_undefined_variable_is_falsy() {
        let v = HashMap::new();
        assert!(!evaluate_condition("missing", &v).unwrap());
    }

    #[test]
    fn test_syntax_error() {
        let v = HashMap::new();
        let err = evaluate_condition("a ==", &v).unwrap_err();
        assert!(matches!(err, CommandError::Expression { .. }));
    }
}
