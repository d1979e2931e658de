use multivar::functions::calculus::{
  adaptive_simpson, definite_integral, differentiate, finite_on_rectangle,
  integrate, limit_at, numeric_double_integral, Limit,
};
use multivar::functions::latex::to_latex;
use multivar::functions::numeric::{clean_float, eval_xy, identify, try_eval_to_f64};
use multivar::functions::solve::solve_system;
use multivar::parse_expression;
use multivar::syntax::Expr;

/// Parse, panicking on malformed test input.
fn e(input: &str) -> Expr {
  parse_expression(input).unwrap()
}

mod engine_tests {
  use super::*;

  mod calculus;
  mod printing;
  mod solve;
}
