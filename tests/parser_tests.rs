use multivar::{parse, parse_constraint, parse_expression};

#[cfg(test)]
mod tests {
  use multivar::functions::numeric::try_eval_to_f64;
  use multivar::Rule;

  use super::*;

  fn show(input: &str) -> String {
    parse_expression(input).unwrap().to_string()
  }

  #[test]
  fn test_parse_calculation() {
    let pair = parse("1 + 2").unwrap().next().unwrap();
    assert_eq!(pair.as_rule(), Rule::Program);
  }

  #[test]
  fn test_parse_symbolic_calculation() {
    let pair = parse("x + 2*y").unwrap().next().unwrap();
    assert_eq!(pair.as_rule(), Rule::Program);
  }

  #[test]
  fn test_parse_function_call() {
    let pair = parse("sin(x*y)").unwrap().next().unwrap();
    assert_eq!(pair.as_rule(), Rule::Program);
  }

  #[test]
  fn test_reject_unbalanced_parens() {
    assert!(parse("sin(x").is_err());
    assert!(parse("(x + y").is_err());
  }

  #[test]
  fn test_reject_dangling_operator() {
    assert!(parse("x +").is_err());
    assert!(parse("* y").is_err());
  }

  #[test]
  fn test_reject_empty_input() {
    assert!(parse("").is_err());
    assert!(parse("   ").is_err());
  }

  #[test]
  fn test_caret_is_power() {
    assert_eq!(show("x^2"), show("x**2"));
    assert_eq!(show("x^2"), "x**2");
  }

  #[test]
  fn test_power_is_right_associative() {
    assert_eq!(show("2**3**2"), "512");
  }

  #[test]
  fn test_unary_minus_binds_looser_than_power() {
    assert_eq!(show("-x**2"), "-x**2");
    assert_eq!(show("--x"), "x");
  }

  #[test]
  fn test_constant_folding() {
    assert_eq!(show("1 + 2*3"), "7");
    assert_eq!(show("6/4"), "3/2");
    assert_eq!(show("0.5 + 0.25"), "0.75");
  }

  #[test]
  fn test_like_terms_collect() {
    assert_eq!(show("x + x"), "2*x");
    assert_eq!(show("x*y - y*x"), "0");
    assert_eq!(show("x*x"), "x**2");
  }

  #[test]
  fn test_canonical_term_order() {
    assert_eq!(show("y**2 + x**2"), "x**2 + y**2");
    assert_eq!(show("1 + x"), "x + 1");
  }

  #[test]
  fn test_division_prints_as_fraction() {
    assert_eq!(show("x*y/2"), "x*y/2");
    assert_eq!(show("1/x"), "1/x");
  }

  #[test]
  fn test_sqrt_and_constants() {
    assert_eq!(show("sqrt(x)"), "sqrt(x)");
    assert_eq!(show("sqrt(4)"), "2");
    assert_eq!(show("E**x"), "exp(x)");
    assert_eq!(show("sin(pi)"), "0");
  }

  #[test]
  fn test_unknown_function_is_an_error() {
    assert!(parse_expression("foo(x)").is_err());
    assert!(parse_expression("sin + 1").is_err());
  }

  #[test]
  fn test_large_square_root_stays_symbolic() {
    let expr = parse_expression("sqrt(999999999989/999999999959)").unwrap();
    let v = try_eval_to_f64(&expr).unwrap();
    assert!((v - 1.0).abs() < 1e-9);
  }

  #[test]
  fn test_power_overflow_degrades_to_float() {
    let expr = parse_expression("(-2)**127").unwrap();
    assert_eq!(try_eval_to_f64(&expr), Some(-(2f64.powi(127))));
    assert!(parse_expression("(-2)**127 + 1").is_ok());
  }

  #[test]
  fn test_scientific_notation() {
    assert_eq!(show("1e3"), "1000");
    assert_eq!(show("2.5e-1"), "0.25");
  }

  #[test]
  fn test_constraint_forms() {
    assert_eq!(
      parse_constraint("x**2 + y**2 = 1").unwrap(),
      parse_expression("x**2 + y**2 - 1").unwrap()
    );
    assert_eq!(
      parse_constraint("x + y - 1").unwrap(),
      parse_expression("x + y - 1").unwrap()
    );
    assert!(parse_constraint("x = y = 1").is_err());
  }
}
