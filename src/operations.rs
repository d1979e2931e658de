//! One function per service operation, returning typed results. Input
//! strings are assumed to have passed `validate` already.

use std::fmt;

use crate::functions::arithmetic::{plus, times};
use crate::functions::calculus::{
  definite_integral, differentiate, finite_on_rectangle, integrate, limit_at,
  numeric_double_integral, Limit,
};
use crate::functions::numeric::{
  clean_float, eval_with, eval_xy, linspace, try_eval_to_f64,
};
use crate::functions::solve::{solve_system, Solution};
use crate::syntax::{
  fmt_real, free_symbols, split_fraction, substitute_variable, Expr, Func, Num,
};
use crate::{parse_constraint, parse_expression, CalcError};

pub const X: &str = "x";
pub const Y: &str = "y";
pub const LAMBDA: &str = "lambda";

/// Seed coordinates for the numeric critical-point search.
pub const SEED_GRID: [f64; 5] = [-2.0, -1.0, 0.0, 1.0, 2.0];

/// Threshold on the Hessian determinant below which the test is
/// inconclusive.
pub const DETERMINANT_TOL: f64 = 1e-10;

fn substitute_point(expr: &Expr, x0: &Expr, y0: &Expr) -> Expr {
  substitute_variable(&substitute_variable(expr, X, x0), Y, y0)
}

// ─── Partials / gradient ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Derivatives {
  pub function: Expr,
  pub fx: Expr,
  pub fy: Expr,
}

impl Derivatives {
  pub fn partials_text(&self) -> String {
    format!("df/dx = {}, df/dy = {}", self.fx, self.fy)
  }

  pub fn gradient_text(&self) -> String {
    format!("({}, {})", self.fx, self.fy)
  }
}

pub fn partials(expression: &str) -> Result<Derivatives, CalcError> {
  let function = parse_expression(expression)?;
  let fx = differentiate(&function, X);
  let fy = differentiate(&function, Y);
  Ok(Derivatives { function, fx, fy })
}

pub fn gradient(expression: &str) -> Result<Derivatives, CalcError> {
  partials(expression)
}

// ─── Evaluate ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
  pub function: Expr,
  pub x0: Expr,
  pub y0: Expr,
  /// f(x0, y0) before numeric reduction.
  pub exact: Expr,
  /// `None` when the value is not a finite real number.
  pub value: Option<f64>,
}

impl Evaluation {
  /// The printed numeric value, or the exact form when there is none.
  pub fn result_text(&self) -> String {
    match self.value {
      Some(v) => fmt_real(v),
      None => self.exact.to_string(),
    }
  }

  /// The value as an expression, for typesetting.
  pub fn value_expr(&self) -> Expr {
    match self.value {
      Some(v) => Num::Real(v).to_expr(),
      None => self.exact.clone(),
    }
  }
}

pub fn evaluate(
  expression: &str,
  x0: &Expr,
  y0: &Expr,
) -> Result<Evaluation, CalcError> {
  let function = parse_expression(expression)?;
  let exact = substitute_point(&function, x0, y0);
  let unbound = free_symbols(&exact);
  if !unbound.is_empty() {
    let names: Vec<&str> = unbound.iter().map(String::as_str).collect();
    return Err(CalcError::EvaluationError(format!(
      "cannot evaluate, unknown symbols: {}",
      names.join(", ")
    )));
  }
  let value = try_eval_to_f64(&exact).map(|v| clean_float(v, 1e-12));
  Ok(Evaluation {
    function,
    x0: x0.clone(),
    y0: y0.clone(),
    exact,
    value,
  })
}

// ─── Double integral ─────────────────────────────────────────────────

/// `[ax, bx] x [ay, by]`
#[derive(Debug, Clone, PartialEq)]
pub struct RectLimits {
  pub ax: Expr,
  pub bx: Expr,
  pub ay: Expr,
  pub by: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DoubleIntegral {
  Definite {
    function: Expr,
    limits: RectLimits,
    /// ∫_ay^by f dy, when an antiderivative was found.
    inner: Option<Expr>,
    /// Exact value, or the quadrature result as a `Real`.
    value: Expr,
    approx: f64,
    numeric: bool,
  },
  Indefinite {
    function: Expr,
    inner: Expr,
    outer: Expr,
  },
}

fn limit_f64(expr: &Expr) -> Result<f64, CalcError> {
  try_eval_to_f64(expr).ok_or_else(|| {
    CalcError::EvaluationError(format!("limit {expr} is not a finite number"))
  })
}

/// Iterated integral, `y` inside and `x` outside.
pub fn double_integral(
  expression: &str,
  limits: Option<RectLimits>,
) -> Result<DoubleIntegral, CalcError> {
  let function = parse_expression(expression)?;
  let Some(limits) = limits else {
    let inner = integrate(&function, Y).ok_or_else(|| {
      CalcError::IntegrationError(format!(
        "no antiderivative of {function} with respect to y"
      ))
    })?;
    let outer = integrate(&inner, X).ok_or_else(|| {
      CalcError::IntegrationError(format!(
        "no antiderivative of {inner} with respect to x"
      ))
    })?;
    return Ok(DoubleIntegral::Indefinite {
      function,
      inner,
      outer,
    });
  };

  let bounds_x = (limit_f64(&limits.ax)?, limit_f64(&limits.bx)?);
  let bounds_y = (limit_f64(&limits.ay)?, limit_f64(&limits.by)?);
  let inner = definite_integral(&function, Y, &limits.ay, &limits.by);
  // F(b) - F(a) is only valid when nothing blows up between the limits.
  let exact = inner
    .as_ref()
    .filter(|_| finite_on_rectangle(&function, bounds_x, bounds_y))
    .and_then(|i| definite_integral(i, X, &limits.ax, &limits.bx))
    .and_then(|v| try_eval_to_f64(&v).map(|approx| (v, approx)));

  let (value, approx, numeric) = match exact {
    Some((v, approx)) => (v, approx, false),
    None => {
      let approx = numeric_double_integral(
        &|x: f64, y: f64| eval_xy(&function, x, y),
        bounds_x,
        bounds_y,
      )
      .map(|v| clean_float(v, 1e-9))
      .ok_or_else(|| {
        CalcError::IntegrationError(format!(
          "the integral of {function} does not converge over the region"
        ))
      })?;
      (Expr::Real(approx), approx, true)
    }
  };

  Ok(DoubleIntegral::Definite {
    function,
    limits,
    inner,
    value,
    approx,
    numeric,
  })
}

// ─── Lagrange multipliers ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LagrangePoint {
  pub x: Expr,
  pub y: Expr,
  pub lambda: Expr,
  pub x_value: f64,
  pub y_value: f64,
  pub lambda_value: f64,
  pub f_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lagrange {
  pub function: Expr,
  pub constraint: Expr,
  pub lagrangian: Expr,
  pub lx: Expr,
  pub ly: Expr,
  pub llambda: Expr,
  pub points: Vec<LagrangePoint>,
}

impl Lagrange {
  pub fn result_text(&self) -> String {
    let points: Vec<String> = self
      .points
      .iter()
      .map(|p| format!("(x={}, y={}, lambda={})", p.x, p.y, p.lambda))
      .collect();
    format!("[{}]", points.join(", "))
  }
}

fn lagrange_seeds() -> Vec<Vec<f64>> {
  let mut seeds = Vec::new();
  for sx in SEED_GRID {
    for sy in SEED_GRID {
      for sl in [-1.0, 1.0] {
        seeds.push(vec![sx, sy, sl]);
      }
    }
  }
  seeds
}

/// Extrema of `expression` subject to `constraint`, either `g(x, y)` or
/// an equation `lhs = rhs`.
pub fn lagrange(expression: &str, constraint: &str) -> Result<Lagrange, CalcError> {
  let function = parse_expression(expression)?;
  let constraint = parse_constraint(constraint)?;
  let lambda = Expr::symbol(LAMBDA);
  let lagrangian = plus(vec![function.clone(), times(vec![lambda, constraint.clone()])]);
  let lx = differentiate(&lagrangian, X);
  let ly = differentiate(&lagrangian, Y);
  let llambda = differentiate(&lagrangian, LAMBDA);

  let system = [lx.clone(), ly.clone(), constraint.clone()];
  let solutions = solve_system(&system, &[X, Y, LAMBDA], &lagrange_seeds());
  if solutions.is_empty() {
    return Err(CalcError::NoSolution("No critical points found".to_string()));
  }

  let points = solutions
    .into_iter()
    .map(|Solution { values, numeric }| {
      let f_value = Some(eval_with(&function, &[(X, numeric[0]), (Y, numeric[1])]))
        .filter(|v| v.is_finite())
        .map(|v| clean_float(v, 1e-12));
      let mut values = values.into_iter();
      LagrangePoint {
        x: values.next().unwrap_or(Expr::Integer(0)),
        y: values.next().unwrap_or(Expr::Integer(0)),
        lambda: values.next().unwrap_or(Expr::Integer(0)),
        x_value: numeric[0],
        y_value: numeric[1],
        lambda_value: numeric[2],
        f_value,
      }
    })
    .collect();

  Ok(Lagrange {
    function,
    constraint,
    lagrangian,
    lx,
    ly,
    llambda,
    points,
  })
}

// ─── Unconstrained optimization ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
  LocalMinimum,
  LocalMaximum,
  Inconclusive,
  Saddle,
}

impl Classification {
  /// Second-derivative test.
  pub fn from_hessian(fxx: f64, determinant: f64) -> Self {
    if determinant > DETERMINANT_TOL && fxx > 0.0 {
      Classification::LocalMinimum
    } else if determinant > DETERMINANT_TOL && fxx < 0.0 {
      Classification::LocalMaximum
    } else if determinant.abs() <= DETERMINANT_TOL {
      Classification::Inconclusive
    } else {
      Classification::Saddle
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Classification::LocalMinimum => "Local minimum",
      Classification::LocalMaximum => "Local maximum",
      Classification::Inconclusive => "Inconclusive test",
      Classification::Saddle => "Saddle point",
    }
  }

  pub fn color(self) -> &'static str {
    match self {
      Classification::LocalMinimum => "green",
      Classification::LocalMaximum => "blue",
      Classification::Inconclusive => "orange",
      Classification::Saddle => "red",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriticalPoint {
  pub x: f64,
  pub y: f64,
  pub f: f64,
  pub classification: Classification,
  pub determinant: f64,
  pub fxx: f64,
  pub fyy: f64,
  pub fxy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Optimization {
  pub function: Expr,
  pub fx: Expr,
  pub fy: Expr,
  pub fxx: Expr,
  pub fyy: Expr,
  pub fxy: Expr,
  pub points: Vec<CriticalPoint>,
}

pub fn optimize(expression: &str) -> Result<Optimization, CalcError> {
  let function = parse_expression(expression)?;
  let fx = differentiate(&function, X);
  let fy = differentiate(&function, Y);
  let fxx = differentiate(&fx, X);
  let fyy = differentiate(&fy, Y);
  let fxy = differentiate(&fx, Y);

  let seeds: Vec<Vec<f64>> = SEED_GRID
    .iter()
    .flat_map(|&sx| SEED_GRID.iter().map(move |&sy| vec![sx, sy]))
    .collect();
  let solutions = solve_system(&[fx.clone(), fy.clone()], &[X, Y], &seeds);

  let points = solutions
    .iter()
    .filter_map(|s| {
      let (px, py) = (s.numeric[0], s.numeric[1]);
      let at = |e: &Expr| Some(eval_xy(e, px, py)).filter(|v| v.is_finite());
      let fxx_v = at(&fxx)?;
      let fyy_v = at(&fyy)?;
      let fxy_v = at(&fxy)?;
      let f_v = at(&function)?;
      let determinant = fxx_v * fyy_v - fxy_v * fxy_v;
      Some(CriticalPoint {
        x: px,
        y: py,
        f: clean_float(f_v, 1e-12),
        classification: Classification::from_hessian(fxx_v, determinant),
        determinant,
        fxx: fxx_v,
        fyy: fyy_v,
        fxy: fxy_v,
      })
    })
    .collect();

  Ok(Optimization {
    function,
    fx,
    fy,
    fxx,
    fyy,
    fxy,
    points,
  })
}

// ─── Domain, range and limit ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitOutcome {
  Value(f64),
  Infinity,
  NegInfinity,
  Undefined,
}

impl fmt::Display for LimitOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LimitOutcome::Value(v) => write!(f, "{v:?}"),
      LimitOutcome::Infinity => write!(f, "infinity"),
      LimitOutcome::NegInfinity => write!(f, "-infinity"),
      LimitOutcome::Undefined => write!(f, "undefined"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainAnalysis {
  pub function: Expr,
  /// Product of the non-constant denominators, if any.
  pub denominator: Option<Expr>,
  pub log_arguments: Vec<Expr>,
  pub sqrt_arguments: Vec<Expr>,
  pub range: Option<(f64, f64)>,
  pub limit: Option<LimitOutcome>,
}

pub const RANGE_SAMPLES: usize = 60;
pub const RANGE_BOUND: f64 = 10.0;

fn push_unique(list: &mut Vec<Expr>, item: Expr) {
  if !list.contains(&item) {
    list.push(item);
  }
}

fn denominator_factors(expr: &Expr, out: &mut Vec<Expr>) {
  match expr {
    Expr::Plus(terms) => {
      for t in terms {
        denominator_factors(t, out);
      }
    }
    Expr::Times(_) | Expr::Power(..) => {
      let factors = match expr {
        Expr::Times(fs) => fs.as_slice(),
        _ => std::slice::from_ref(expr),
      };
      let (_, _, den) = split_fraction(factors);
      for d in den {
        if !free_symbols(&d).is_empty() {
          push_unique(out, d);
        }
      }
    }
    _ => {}
  }
}

/// Denominator of the expression brought over a common denominator,
/// numeric factors dropped.
pub fn denominator(expr: &Expr) -> Option<Expr> {
  let mut factors = Vec::new();
  denominator_factors(expr, &mut factors);
  if factors.is_empty() {
    None
  } else {
    Some(times(factors))
  }
}

fn collect_arguments(expr: &Expr, logs: &mut Vec<Expr>, roots: &mut Vec<Expr>) {
  match expr {
    Expr::Call(func, arg) => {
      if *func == Func::Log {
        push_unique(logs, *arg.clone());
      }
      collect_arguments(arg, logs, roots);
    }
    Expr::Power(base, exp) => {
      // Even roots: x**(1/2), x**(-3/2), ...
      if let Expr::Rational(_, 2) = exp.as_ref() {
        if !free_symbols(base).is_empty() {
          push_unique(roots, *base.clone());
        }
      }
      collect_arguments(base, logs, roots);
      collect_arguments(exp, logs, roots);
    }
    Expr::Plus(items) | Expr::Times(items) => {
      for item in items {
        collect_arguments(item, logs, roots);
      }
    }
    _ => {}
  }
}

/// Finite min/max of `f` over a `RANGE_SAMPLES`² grid on
/// `[-RANGE_BOUND, RANGE_BOUND]²`.
pub fn estimate_range(function: &Expr) -> Option<(f64, f64)> {
  let grid = linspace(-RANGE_BOUND, RANGE_BOUND, RANGE_SAMPLES);
  let mut range: Option<(f64, f64)> = None;
  for &y in &grid {
    for &x in &grid {
      let v = eval_xy(function, x, y);
      if !v.is_finite() {
        continue;
      }
      range = Some(match range {
        Some((lo, hi)) => (lo.min(v), hi.max(v)),
        None => (v, v),
      });
    }
  }
  range
}

/// Compare the iterated limits `lim_y lim_x f` and `lim_x lim_y f`.
pub fn iterated_limit(function: &Expr, x0: f64, y0: f64) -> LimitOutcome {
  let f = |x: f64, y: f64| eval_xy(function, x, y);
  let x_then_y = limit_at(
    &|y: f64| limit_at(&|x: f64| f(x, y), x0).as_f64(),
    y0,
  );
  let y_then_x = limit_at(
    &|x: f64| limit_at(&|y: f64| f(x, y), y0).as_f64(),
    x0,
  );
  let both = [x_then_y, y_then_x];
  if both.contains(&Limit::PosInfinity) {
    return LimitOutcome::Infinity;
  }
  if both.contains(&Limit::NegInfinity) {
    return LimitOutcome::NegInfinity;
  }
  match (x_then_y, y_then_x) {
    (Limit::Finite(a), Limit::Finite(b))
      if (a - b).abs() <= 1e-9 * a.abs().max(1.0) =>
    {
      LimitOutcome::Value(clean_float(a, 1e-9))
    }
    _ => LimitOutcome::Undefined,
  }
}

pub fn analyze_domain(
  expression: &str,
  point: Option<(f64, f64)>,
) -> Result<DomainAnalysis, CalcError> {
  let function = parse_expression(expression)?;
  let mut log_arguments = Vec::new();
  let mut sqrt_arguments = Vec::new();
  collect_arguments(&function, &mut log_arguments, &mut sqrt_arguments);
  Ok(DomainAnalysis {
    denominator: denominator(&function),
    log_arguments,
    sqrt_arguments,
    range: estimate_range(&function),
    limit: point.map(|(x0, y0)| iterated_limit(&function, x0, y0)),
    function,
  })
}
