//! Floating-point evaluation of expression trees.

use crate::functions::arithmetic::{negate, sqrt};
use crate::syntax::{Expr, Num};

/// Evaluate `expr` with the given symbol bindings.
///
/// Unbound symbols and domain errors evaluate to NaN, so callers only need
/// `is_finite()` to decide whether a value is usable.
pub fn eval_with(expr: &Expr, bindings: &[(&str, f64)]) -> f64 {
  match expr {
    Expr::Integer(n) => *n as f64,
    Expr::Rational(n, d) => *n as f64 / *d as f64,
    Expr::Real(v) => *v,
    Expr::Constant(c) => c.value(),
    Expr::Symbol(name) => bindings
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| *v)
      .unwrap_or(f64::NAN),
    Expr::Plus(terms) => terms.iter().map(|t| eval_with(t, bindings)).sum(),
    Expr::Times(factors) => {
      factors.iter().map(|f| eval_with(f, bindings)).product()
    }
    Expr::Power(base, exp) => {
      let b = eval_with(base, bindings);
      match exp.as_ref() {
        Expr::Integer(n) if n.unsigned_abs() <= i32::MAX as u128 => {
          b.powi(*n as i32)
        }
        Expr::Rational(1, 2) => b.sqrt(),
        _ => b.powf(eval_with(exp, bindings)),
      }
    }
    Expr::Call(func, arg) => func.apply(eval_with(arg, bindings)),
  }
}

/// Evaluate an expression with no free symbols.
pub fn try_eval_to_f64(expr: &Expr) -> Option<f64> {
  let v = eval_with(expr, &[]);
  if v.is_finite() { Some(v) } else { None }
}

/// Evaluate at a point of the `(x, y)` plane.
pub fn eval_xy(expr: &Expr, x: f64, y: f64) -> f64 {
  eval_with(expr, &[("x", x), ("y", y)])
}

/// Snap values that are within `tol` of an integer, and flush `-0.0`.
pub fn clean_float(v: f64, tol: f64) -> f64 {
  if !v.is_finite() {
    return v;
  }
  let r = v.round();
  let snapped = if (v - r).abs() <= tol { r } else { v };
  if snapped == 0.0 { 0.0 } else { snapped }
}

fn small_rational(v: f64) -> Option<(i128, i128)> {
  for q in 1..=12i128 {
    let p = (v * q as f64).round();
    if p.abs() > 1e12 {
      return None;
    }
    if (v - p / q as f64).abs() < 1e-9 {
      return Some((p as i128, q));
    }
  }
  None
}

/// Recognize a float as `p/q` or `±sqrt(p/q)` with small denominators,
/// falling back to the float itself.
pub fn identify(v: f64) -> Expr {
  if !v.is_finite() {
    return Expr::Real(v);
  }
  if let Some((p, q)) = small_rational(v) {
    return Num::rational(p, q).to_expr();
  }
  if let Some((p, q)) = small_rational(v * v) {
    if p > 0 {
      let root = sqrt(Num::rational(p, q).to_expr());
      return if v < 0.0 { negate(root) } else { root };
    }
  }
  Expr::Real(v)
}

/// `n` evenly spaced samples over `[lo, hi]`, endpoints included.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
  match n {
    0 => Vec::new(),
    1 => vec![lo],
    _ => {
      let step = (hi - lo) / (n - 1) as f64;
      (0..n).map(|i| lo + step * i as f64).collect()
    }
  }
}
