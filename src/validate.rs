//! Input filters applied before anything reaches the engine.

use serde_json::Value;
use thiserror::Error;

use crate::functions::numeric::try_eval_to_f64;
use crate::parse_expression;
use crate::syntax::{free_symbols, Expr};

/// Every identifier an expression may contain.
pub const ALLOWED_TOKENS: [&str; 29] = [
  "x", "y", //
  "sin", "cos", "tan", "asin", "acos", "atan", //
  "csc", "sec", "cot", "acsc", "asec", "acot", //
  "sinh", "cosh", "tanh", "asinh", "acosh", "atanh", //
  "csch", "sech", "coth", //
  "exp", "log", "sqrt", "abs", //
  "pi", "E",
];

/// Case-insensitive substrings that reject an expression outright.
pub const FORBIDDEN_SUBSTRINGS: [&str; 9] = [
  "__",
  "import",
  "eval",
  "exec",
  "lambda",
  "open",
  "subprocess",
  "os.",
  "sys.",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Maximal runs of ASCII letters and underscores.
fn alphabetic_tokens(expr: &str) -> impl Iterator<Item = &str> {
  expr
    .split(|c: char| !(c.is_ascii_alphabetic() || c == '_'))
    .filter(|t| !t.is_empty())
}

/// Token filter for an expression string. Not a parser: malformed input
/// made only of allowed tokens passes.
pub fn validate_expression_str(
  expr: &str,
  max_len: usize,
) -> Result<(), ValidationError> {
  if expr.len() > max_len {
    return Err(ValidationError("Expression is too long".to_string()));
  }
  let lowered = expr.to_lowercase();
  if FORBIDDEN_SUBSTRINGS.iter().any(|f| lowered.contains(f)) {
    return Err(ValidationError(
      "Expression contains forbidden tokens".to_string(),
    ));
  }
  match alphabetic_tokens(expr).find(|t| !ALLOWED_TOKENS.contains(t)) {
    Some(token) => Err(ValidationError(format!("Unknown token: {token}"))),
    None => Ok(()),
  }
}

/// Like [`validate_expression_str`], for a raw JSON field.
pub fn validate_expression(
  value: &Value,
  max_len: usize,
) -> Result<&str, ValidationError> {
  let Value::String(expr) = value else {
    return Err(ValidationError("Expression must be a string".to_string()));
  };
  validate_expression_str(expr, max_len)?;
  Ok(expr.as_str())
}

/// Accept a JSON number, or a string that reduces to a finite constant.
pub fn validate_numeric(value: &Value, name: &str) -> Result<Expr, ValidationError> {
  let rejected = || {
    ValidationError(format!(
      "{name} must be numeric (supports pi, E and basic operations)"
    ))
  };
  match value {
    Value::Number(n) => {
      if let Some(i) = n.as_i64() {
        return Ok(Expr::Integer(i as i128));
      }
      n.as_f64()
        .filter(|v| v.is_finite())
        .map(Expr::Real)
        .ok_or_else(rejected)
    }
    Value::String(s) => {
      let expr = parse_expression(s.trim()).map_err(|_| rejected())?;
      if !free_symbols(&expr).is_empty() || try_eval_to_f64(&expr).is_none() {
        return Err(rejected());
      }
      Ok(expr)
    }
    _ => Err(rejected()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  const MAX: usize = 512;

  #[test]
  fn rejects_injection_attempts() {
    for input in [
      "__import__('os')",
      "eval(x)",
      "EXEC(y)",
      "lambda: x",
      "open(x)",
      "os.system",
      "sys.exit",
    ] {
      assert_eq!(
        validate_expression_str(input, MAX),
        Err(ValidationError("Expression contains forbidden tokens".into())),
        "{input}"
      );
    }
  }

  #[test]
  fn accepts_allowed_tokens() {
    for input in ["x**2 + y**2", "sin(x)*cos(y)", "exp(-x^2)/sqrt(pi)", "E*x"] {
      assert_eq!(validate_expression_str(input, MAX), Ok(()), "{input}");
    }
  }

  #[test]
  fn reports_first_unknown_token() {
    assert_eq!(
      validate_expression_str("x + foo(y) + bar", MAX),
      Err(ValidationError("Unknown token: foo".into()))
    );
  }

  #[test]
  fn token_match_is_case_sensitive() {
    assert_eq!(
      validate_expression_str("Sin(x)", MAX),
      Err(ValidationError("Unknown token: Sin".into()))
    );
  }

  #[test]
  fn malformed_but_token_valid_passes() {
    assert_eq!(validate_expression_str("sin(x", MAX), Ok(()));
  }

  #[test]
  fn rejects_non_strings_and_long_input() {
    assert_eq!(
      validate_expression(&json!(3), MAX),
      Err(ValidationError("Expression must be a string".into()))
    );
    assert_eq!(
      validate_expression_str(&"x+".repeat(10), 8),
      Err(ValidationError("Expression is too long".into()))
    );
  }

  #[test]
  fn numeric_fields() {
    assert_eq!(validate_numeric(&json!(3), "x0"), Ok(Expr::Integer(3)));
    assert_eq!(validate_numeric(&json!(0.5), "x0"), Ok(Expr::Real(0.5)));
    assert!(validate_numeric(&json!("pi/2"), "x0").is_ok());
    assert!(validate_numeric(&json!(" 2*E + 1 "), "x0").is_ok());
    assert_eq!(
      validate_numeric(&json!("x"), "y0"),
      Err(ValidationError(
        "y0 must be numeric (supports pi, E and basic operations)".into()
      ))
    );
    assert!(validate_numeric(&json!("1/0"), "x0").is_err());
    assert!(validate_numeric(&json!(null), "x0").is_err());
  }
}
