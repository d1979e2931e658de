//! Symbolic differentiation and integration, numeric quadrature and
//! one-variable limits.

use crate::functions::arithmetic::{
  call, divide, expand, negate, plus, power, sqrt, subtract, times,
};
use crate::functions::numeric::{clean_float, eval_xy, linspace};
use crate::syntax::{is_constant_wrt, substitute_variable, Expr, Func, Num};

/// d/dvar of `expr`.
pub fn differentiate(expr: &Expr, var: &str) -> Expr {
  if is_constant_wrt(expr, var) {
    return Expr::Integer(0);
  }
  match expr {
    Expr::Symbol(_) => Expr::Integer(1),
    Expr::Plus(terms) => {
      plus(terms.iter().map(|t| differentiate(t, var)).collect())
    }
    Expr::Times(factors) => {
      // Product rule over n factors
      let mut terms = Vec::new();
      for (i, factor) in factors.iter().enumerate() {
        let d = differentiate(factor, var);
        if d.is_zero() {
          continue;
        }
        let mut others: Vec<Expr> = factors
          .iter()
          .enumerate()
          .filter(|(j, _)| *j != i)
          .map(|(_, f)| f.clone())
          .collect();
        others.push(d);
        terms.push(times(others));
      }
      plus(terms)
    }
    Expr::Power(base, exp) => {
      let base = base.as_ref();
      let exp = exp.as_ref();
      if is_constant_wrt(exp, var) {
        // n * b^(n-1) * b'
        times(vec![
          exp.clone(),
          power(base.clone(), plus(vec![exp.clone(), Expr::Integer(-1)])),
          differentiate(base, var),
        ])
      } else if is_constant_wrt(base, var) {
        // a^g * log(a) * g'
        times(vec![
          expr.clone(),
          call(Func::Log, base.clone()),
          differentiate(exp, var),
        ])
      } else {
        // b^e * (e' log(b) + e b'/b)
        times(vec![
          expr.clone(),
          plus(vec![
            times(vec![differentiate(exp, var), call(Func::Log, base.clone())]),
            times(vec![
              exp.clone(),
              differentiate(base, var),
              power(base.clone(), Expr::Integer(-1)),
            ]),
          ]),
        ])
      }
    }
    Expr::Call(func, arg) => {
      let du = differentiate(arg, var);
      times(vec![outer_derivative(*func, arg), du])
    }
    _ => Expr::Integer(0),
  }
}

fn square(u: &Expr) -> Expr {
  power(u.clone(), Expr::Integer(2))
}

fn reciprocal(u: Expr) -> Expr {
  power(u, Expr::Integer(-1))
}

/// f'(u) for the named functions.
fn outer_derivative(func: Func, u: &Expr) -> Expr {
  let one = || Expr::Integer(1);
  let f = |g: Func| call(g, u.clone());
  match func {
    Func::Sin => f(Func::Cos),
    Func::Cos => negate(f(Func::Sin)),
    Func::Tan => plus(vec![square(&f(Func::Tan)), one()]),
    Func::Csc => negate(times(vec![f(Func::Cot), f(Func::Csc)])),
    Func::Sec => times(vec![f(Func::Tan), f(Func::Sec)]),
    Func::Cot => negate(plus(vec![square(&f(Func::Cot)), one()])),
    Func::Asin => reciprocal(sqrt(subtract(one(), square(u)))),
    Func::Acos => negate(reciprocal(sqrt(subtract(one(), square(u))))),
    Func::Atan => reciprocal(plus(vec![square(u), one()])),
    Func::Acsc => negate(reciprocal(times(vec![
      square(u),
      sqrt(subtract(one(), reciprocal(square(u)))),
    ]))),
    Func::Asec => reciprocal(times(vec![
      square(u),
      sqrt(subtract(one(), reciprocal(square(u)))),
    ])),
    Func::Acot => negate(reciprocal(plus(vec![square(u), one()]))),
    Func::Sinh => f(Func::Cosh),
    Func::Cosh => f(Func::Sinh),
    Func::Tanh => subtract(one(), square(&f(Func::Tanh))),
    Func::Csch => negate(times(vec![f(Func::Coth), f(Func::Csch)])),
    Func::Sech => negate(times(vec![f(Func::Tanh), f(Func::Sech)])),
    Func::Coth => subtract(one(), square(&f(Func::Coth))),
    Func::Asinh => reciprocal(sqrt(plus(vec![square(u), one()]))),
    Func::Acosh => {
      reciprocal(sqrt(plus(vec![square(u), Expr::Integer(-1)])))
    }
    Func::Atanh => reciprocal(subtract(one(), square(u))),
    Func::Exp => f(Func::Exp),
    Func::Log => reciprocal(u.clone()),
    Func::Abs => times(vec![u.clone(), reciprocal(f(Func::Abs))]),
  }
}

/// Coefficient `a` when `u = a*var + b` with `a` a nonzero constant.
fn linear_coefficient(u: &Expr, var: &str) -> Option<Expr> {
  let a = differentiate(u, var);
  if a.is_zero() || !is_constant_wrt(&a, var) {
    return None;
  }
  Some(a)
}

/// Antiderivative of `expr` with respect to `var`, without the constant.
///
/// Returns `None` when no rule applies.
pub fn integrate(expr: &Expr, var: &str) -> Option<Expr> {
  if is_constant_wrt(expr, var) {
    return Some(times(vec![expr.clone(), Expr::symbol(var)]));
  }
  match expr {
    Expr::Plus(terms) => {
      let parts: Option<Vec<Expr>> =
        terms.iter().map(|t| integrate(t, var)).collect();
      parts.map(plus)
    }
    Expr::Times(factors) => {
      let (consts, deps): (Vec<Expr>, Vec<Expr>) = factors
        .iter()
        .cloned()
        .partition(|f| is_constant_wrt(f, var));
      let constant = times(consts);
      let dependent = times(deps.clone());
      let inner = if deps.len() == 1 {
        integrate_factor(&deps[0], var)
      } else {
        None
      }
      .or_else(|| integrate_expanded(&dependent, var))
      .or_else(|| integrate_by_parts(&deps, var))?;
      Some(times(vec![constant, inner]))
    }
    _ => integrate_factor(expr, var)
      .or_else(|| integrate_expanded(expr, var)),
  }
}

fn integrate_expanded(expr: &Expr, var: &str) -> Option<Expr> {
  let expanded = expand(expr);
  if expanded == *expr {
    return None;
  }
  integrate(&expanded, var)
}

/// Antiderivatives of single non-constant factors.
fn integrate_factor(expr: &Expr, var: &str) -> Option<Expr> {
  match expr {
    // ∫ x dx = x^2/2
    Expr::Symbol(_) => Some(divide(square(expr), Expr::Integer(2))),
    Expr::Power(base, exp) => {
      let (base, exp) = (base.as_ref(), exp.as_ref());
      if is_constant_wrt(exp, var) {
        if let Some(result) = integrate_trig_power(base, exp, var) {
          return Some(result);
        }
        if let Some(result) = integrate_inverse_quadratic(base, exp, var) {
          return Some(result);
        }
        // ∫ (a x + b)^n dx
        let a = linear_coefficient(base, var)?;
        if *exp == Expr::Integer(-1) {
          return Some(divide(call(Func::Log, base.clone()), a));
        }
        let n1 = plus(vec![exp.clone(), Expr::Integer(1)]);
        return Some(divide(
          power(base.clone(), n1.clone()),
          times(vec![n1, a]),
        ));
      }
      if is_constant_wrt(base, var) {
        // ∫ c^(a x + b) dx = c^(a x + b) / (a log c)
        let a = linear_coefficient(exp, var)?;
        return Some(divide(
          expr.clone(),
          times(vec![a, call(Func::Log, base.clone())]),
        ));
      }
      None
    }
    Expr::Call(func, arg) => {
      let u = arg.as_ref().clone();
      let a = linear_coefficient(&u, var)?;
      let f = |g: Func| call(g, u.clone());
      let anti = match func {
        Func::Sin => negate(f(Func::Cos)),
        Func::Cos => f(Func::Sin),
        Func::Tan => negate(call(Func::Log, f(Func::Cos))),
        Func::Cot => call(Func::Log, f(Func::Sin)),
        Func::Sinh => f(Func::Cosh),
        Func::Cosh => f(Func::Sinh),
        Func::Tanh => call(Func::Log, f(Func::Cosh)),
        Func::Exp => f(Func::Exp),
        Func::Log => subtract(times(vec![u.clone(), f(Func::Log)]), u.clone()),
        _ => return None,
      };
      Some(divide(anti, a))
    }
    _ => None,
  }
}

/// sin^2, cos^2, sec^2 and csc^2 of a linear argument.
fn integrate_trig_power(base: &Expr, exp: &Expr, var: &str) -> Option<Expr> {
  if *exp != Expr::Integer(2) {
    return None;
  }
  let Expr::Call(func, arg) = base else {
    return None;
  };
  let u = arg.as_ref().clone();
  let a = linear_coefficient(&u, var)?;
  let x = Expr::symbol(var);
  let double = call(Func::Sin, times(vec![Expr::Integer(2), u.clone()]));
  match func {
    // x/2 - sin(2u)/(4a)
    Func::Sin => Some(subtract(
      divide(x, Expr::Integer(2)),
      divide(double, times(vec![Expr::Integer(4), a])),
    )),
    // x/2 + sin(2u)/(4a)
    Func::Cos => Some(plus(vec![
      divide(x, Expr::Integer(2)),
      divide(double, times(vec![Expr::Integer(4), a])),
    ])),
    Func::Sec => Some(divide(call(Func::Tan, u), a)),
    Func::Csc => Some(negate(divide(call(Func::Cot, u), a))),
    _ => None,
  }
}

/// ∫ 1/(x^2 + c) dx = atan(x/sqrt(c))/sqrt(c) for a positive constant c.
fn integrate_inverse_quadratic(
  base: &Expr,
  exp: &Expr,
  var: &str,
) -> Option<Expr> {
  if *exp != Expr::Integer(-1) {
    return None;
  }
  let Expr::Plus(terms) = base else {
    return None;
  };
  if terms.len() != 2 {
    return None;
  }
  let x = Expr::symbol(var);
  if terms[0] != square(&x) || !is_constant_wrt(&terms[1], var) {
    return None;
  }
  let c = Num::from_expr(&terms[1])?;
  if c.is_negative() || c.is_zero() {
    return None;
  }
  let root = sqrt(c.to_expr());
  Some(divide(call(Func::Atan, divide(x, root.clone())), root))
}

fn is_polynomial_in(expr: &Expr, var: &str) -> bool {
  if is_constant_wrt(expr, var) {
    return true;
  }
  match expr {
    Expr::Symbol(_) => true,
    Expr::Plus(items) | Expr::Times(items) => {
      items.iter().all(|e| is_polynomial_in(e, var))
    }
    Expr::Power(base, exp) => {
      matches!(exp.as_ref(), Expr::Integer(n) if *n > 0)
        && is_polynomial_in(base, var)
    }
    _ => false,
  }
}

fn is_repeatable_factor(expr: &Expr, var: &str) -> bool {
  match expr {
    Expr::Call(
      Func::Exp | Func::Sin | Func::Cos | Func::Sinh | Func::Cosh,
      arg,
    ) => linear_coefficient(arg, var).is_some(),
    _ => false,
  }
}

/// ∫ p(x) g(x) dx for a polynomial p and an exp/sin/cos-type factor g,
/// by repeated integration by parts.
fn integrate_by_parts(deps: &[Expr], var: &str) -> Option<Expr> {
  let idx = deps.iter().position(|f| is_repeatable_factor(f, var))?;
  let others: Vec<Expr> = deps
    .iter()
    .enumerate()
    .filter(|(i, _)| *i != idx)
    .map(|(_, f)| f.clone())
    .collect();
  let mut p = times(others);
  if !is_polynomial_in(&p, var) {
    return None;
  }
  let mut g = integrate_factor(&deps[idx], var)?;
  let mut terms = Vec::new();
  let mut sign = 1i128;
  for _ in 0..12 {
    terms.push(times(vec![Expr::Integer(sign), p.clone(), g.clone()]));
    p = differentiate(&p, var);
    if p.is_zero() {
      return Some(plus(terms));
    }
    g = integrate(&g, var)?;
    sign = -sign;
  }
  None
}

/// True if the tree contains a term the engine cannot give a value to,
/// such as `log(0)` or `1/0`.
pub fn is_degenerate(expr: &Expr) -> bool {
  match expr {
    Expr::Real(v) => !v.is_finite(),
    Expr::Call(Func::Log, arg) if arg.is_zero() => true,
    Expr::Power(base, exp) => {
      (base.is_zero()
        && Num::from_expr(exp).is_some_and(|e| e.is_negative()))
        || is_degenerate(base)
        || is_degenerate(exp)
    }
    Expr::Plus(items) | Expr::Times(items) => items.iter().any(is_degenerate),
    Expr::Call(_, arg) => is_degenerate(arg),
    _ => false,
  }
}

/// ∫_lo^hi expr d(var) via an antiderivative: F(hi) - F(lo).
pub fn definite_integral(
  expr: &Expr,
  var: &str,
  lo: &Expr,
  hi: &Expr,
) -> Option<Expr> {
  let anti = integrate(expr, var)?;
  let at_hi = substitute_variable(&anti, var, hi);
  let at_lo = substitute_variable(&anti, var, lo);
  let result = subtract(at_hi, at_lo);
  if is_degenerate(&result) {
    return None;
  }
  Some(result)
}

/// Collect the subexpressions whose zeros make `expr` blow up: bases under
/// a negative power, `log` arguments, and the sin/cos behind tan, sec,
/// csc and cot.
fn singular_parts(expr: &Expr, out: &mut Vec<Expr>) {
  match expr {
    Expr::Power(base, exp) => {
      if Num::from_expr(exp).is_some_and(|e| e.is_negative()) {
        out.push(base.as_ref().clone());
      }
      singular_parts(base, out);
      singular_parts(exp, out);
    }
    Expr::Call(func, arg) => {
      match func {
        Func::Log | Func::Coth | Func::Csch => out.push(arg.as_ref().clone()),
        Func::Tan | Func::Sec => out.push(call(Func::Cos, arg.as_ref().clone())),
        Func::Csc | Func::Cot => out.push(call(Func::Sin, arg.as_ref().clone())),
        _ => {}
      }
      singular_parts(arg, out);
    }
    Expr::Plus(items) | Expr::Times(items) => {
      items.iter().for_each(|item| singular_parts(item, out))
    }
    _ => {}
  }
}

const REGION_GRID: usize = 64;

/// True when `f(x, y)` has no pole on the closed rectangle, judged on a
/// grid: every sample of `f` must be finite, and no singular part may hit
/// zero or change sign between neighbouring samples.
pub fn finite_on_rectangle(
  expr: &Expr,
  (ax, bx): (f64, f64),
  (ay, by): (f64, f64),
) -> bool {
  let xs = linspace(ax, bx, REGION_GRID + 1);
  let ys = linspace(ay, by, REGION_GRID + 1);
  let sample = |e: &Expr| -> Vec<Vec<f64>> {
    xs.iter()
      .map(|&x| ys.iter().map(|&y| eval_xy(e, x, y)).collect())
      .collect()
  };

  if sample(expr).iter().flatten().any(|v| !v.is_finite()) {
    return false;
  }

  let mut parts = Vec::new();
  singular_parts(expr, &mut parts);
  parts.iter().all(|part| {
    let grid = sample(part);
    let crosses = |a: f64, b: f64| a == 0.0 || b == 0.0 || (a < 0.0) != (b < 0.0);
    for i in 0..grid.len() {
      for j in 0..grid[i].len() {
        let v = grid[i][j];
        if !v.is_finite() || v == 0.0 {
          return false;
        }
        if i + 1 < grid.len() && crosses(v, grid[i + 1][j]) {
          return false;
        }
        if j + 1 < grid[i].len() && crosses(v, grid[i][j + 1]) {
          return false;
        }
      }
    }
    true
  })
}

/// Adaptive Simpson's quadrature
pub fn adaptive_simpson(
  f: &dyn Fn(f64) -> Option<f64>,
  a: f64,
  b: f64,
  tol: f64,
  max_depth: u32,
) -> Option<f64> {
  let fa = f(a)?;
  let fb = f(b)?;
  let m = (a + b) / 2.0;
  let fm = f(m)?;
  let whole = (b - a) / 6.0 * (fa + 4.0 * fm + fb);
  adaptive_simpson_rec(f, a, b, tol, whole, fa, fm, fb, max_depth)
}

#[allow(clippy::too_many_arguments)]
fn adaptive_simpson_rec(
  f: &dyn Fn(f64) -> Option<f64>,
  a: f64,
  b: f64,
  tol: f64,
  whole: f64,
  fa: f64,
  fm: f64,
  fb: f64,
  depth: u32,
) -> Option<f64> {
  let m = (a + b) / 2.0;
  let m1 = (a + m) / 2.0;
  let m2 = (m + b) / 2.0;
  let fm1 = f(m1)?;
  let fm2 = f(m2)?;
  let h = b - a;
  let left = h / 12.0 * (fa + 4.0 * fm1 + fm);
  let right = h / 12.0 * (fm + 4.0 * fm2 + fb);
  let refined = left + right;
  let error = (refined - whole) / 15.0;

  if depth == 0 || error.abs() < tol {
    Some(refined + error)
  } else {
    let left_result =
      adaptive_simpson_rec(f, a, m, tol / 2.0, left, fa, fm1, fm, depth - 1)?;
    let right_result =
      adaptive_simpson_rec(f, m, b, tol / 2.0, right, fm, fm2, fb, depth - 1)?;
    Some(left_result + right_result)
  }
}

/// ∫_ax^bx ∫_ay^by f(x, y) dy dx by nested adaptive Simpson.
pub fn numeric_double_integral(
  f: &dyn Fn(f64, f64) -> f64,
  (ax, bx): (f64, f64),
  (ay, by): (f64, f64),
) -> Option<f64> {
  let finite = |v: f64| if v.is_finite() { Some(v) } else { None };
  let inner = |x: f64| {
    adaptive_simpson(&|y: f64| finite(f(x, y)), ay, by, 1e-10, 12)
  };
  adaptive_simpson(&inner, ax, bx, 1e-9, 12).and_then(finite)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
  Finite(f64),
  PosInfinity,
  NegInfinity,
  Undefined,
}

impl Limit {
  /// Collapse to a float so limits can be nested.
  pub fn as_f64(self) -> f64 {
    match self {
      Limit::Finite(v) => v,
      Limit::PosInfinity => f64::INFINITY,
      Limit::NegInfinity => f64::NEG_INFINITY,
      Limit::Undefined => f64::NAN,
    }
  }
}

const APPROACH_STEPS: [f64; 5] = [1e-3, 1e-4, 1e-5, 1e-6, 1e-7];

fn one_sided(values: &[f64]) -> Limit {
  let last = values[values.len() - 1];
  let prev = values[values.len() - 2];
  if last.is_nan() {
    Limit::Undefined
  } else if last == f64::INFINITY || (last > 1e6 && last > prev) {
    Limit::PosInfinity
  } else if last == f64::NEG_INFINITY || (last < -1e6 && last < prev) {
    Limit::NegInfinity
  } else if (last - prev).abs() <= 1e-4 * last.abs().max(1.0) {
    Limit::Finite(last)
  } else {
    Limit::Undefined
  }
}

/// Two-sided limit of `f` at `a`.
///
/// A finite value at `a` itself is taken as the limit; otherwise `f` is
/// sampled on both sides at shrinking distances.
pub fn limit_at(f: &dyn Fn(f64) -> f64, a: f64) -> Limit {
  let direct = f(a);
  if direct.is_finite() {
    return Limit::Finite(direct);
  }
  let right: Vec<f64> = APPROACH_STEPS.iter().map(|h| f(a + h)).collect();
  let left: Vec<f64> = APPROACH_STEPS.iter().map(|h| f(a - h)).collect();
  match (one_sided(&left), one_sided(&right)) {
    (Limit::Finite(l), Limit::Finite(r))
      if (l - r).abs() <= 1e-4 * l.abs().max(1.0) =>
    {
      Limit::Finite(clean_float((l + r) / 2.0, 1e-6))
    }
    (Limit::PosInfinity, Limit::PosInfinity) => Limit::PosInfinity,
    (Limit::NegInfinity, Limit::NegInfinity) => Limit::NegInfinity,
    _ => Limit::Undefined,
  }
}
