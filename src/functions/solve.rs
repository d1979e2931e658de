//! Solving square systems `eqs = 0`: exactly when every equation is
//! linear, by multi-start Newton iteration otherwise.

use crate::functions::arithmetic::{negate, plus};
use crate::functions::calculus::differentiate;
use crate::functions::numeric::{clean_float, eval_with, identify};
use crate::syntax::{substitute_variable, Expr, Num};

const NEWTON_MAX_STEPS: usize = 100;
const NEWTON_STEP_TOL: f64 = 1e-12;
const RESIDUAL_TOL: f64 = 1e-9;
const DEDUPE_TOL: f64 = 1e-6;

/// One solution of a system, ordered like the variables it was solved for.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
  pub values: Vec<Expr>,
  pub numeric: Vec<f64>,
}

/// Solve `equations[i] = 0` for `vars`.
///
/// Linear systems are solved exactly. Singular linear systems and anything
/// nonlinear are handed to Newton's method from every point in `seeds`,
/// keeping converged roots that are at least `1e-6` apart. Newton stops on
/// a singular Jacobian, so a singular linear system yields an empty list. Solutions come back sorted by
/// coordinates.
pub fn solve_system(
  equations: &[Expr],
  vars: &[&str],
  seeds: &[Vec<f64>],
) -> Vec<Solution> {
  let jacobian: Vec<Vec<Expr>> = equations
    .iter()
    .map(|eq| vars.iter().map(|v| differentiate(eq, v)).collect())
    .collect();

  let mut solutions = match linear_system(equations, vars, &jacobian) {
    Some((matrix, rhs)) => match solve_exact(matrix, rhs) {
      Some(solution) => vec![solution],
      None => newton_all(equations, vars, &jacobian, seeds),
    },
    None => newton_all(equations, vars, &jacobian, seeds),
  };
  solutions.sort_by(|a, b| {
    a.numeric
      .iter()
      .zip(&b.numeric)
      .map(|(x, y)| x.total_cmp(y))
      .find(|o| o.is_ne())
      .unwrap_or(std::cmp::Ordering::Equal)
  });
  solutions
}

/// `(A, b)` with `A v = b` when every partial derivative is a number.
fn linear_system(
  equations: &[Expr],
  vars: &[&str],
  jacobian: &[Vec<Expr>],
) -> Option<(Vec<Vec<Num>>, Vec<Num>)> {
  let matrix: Option<Vec<Vec<Num>>> = jacobian
    .iter()
    .map(|row| row.iter().map(Num::from_expr).collect())
    .collect();
  let matrix = matrix?;
  let rhs: Option<Vec<Num>> = equations
    .iter()
    .map(|eq| {
      let at_origin = vars.iter().fold(eq.clone(), |acc, v| {
        substitute_variable(&acc, v, &Expr::Integer(0))
      });
      Num::from_expr(&negate(at_origin))
    })
    .collect();
  Some((matrix, rhs?))
}

/// Gauss-Jordan elimination over exact numbers.
fn solve_exact(mut matrix: Vec<Vec<Num>>, mut rhs: Vec<Num>) -> Option<Solution> {
  let n = rhs.len();
  for k in 0..n {
    let pivot_row = (k..n).find(|&i| !matrix[i][k].is_zero())?;
    if pivot_row != k {
      matrix.swap(k, pivot_row);
      rhs.swap(k, pivot_row);
    }
    let pivot = matrix[k][k];
    for j in k..n {
      matrix[k][j] = matrix[k][j] / pivot;
    }
    rhs[k] = rhs[k] / pivot;
    for i in 0..n {
      if i == k || matrix[i][k].is_zero() {
        continue;
      }
      let factor = matrix[i][k];
      for j in k..n {
        matrix[i][j] = matrix[i][j] - factor * matrix[k][j];
      }
      rhs[i] = rhs[i] - factor * rhs[k];
    }
  }
  let values: Vec<Expr> = rhs.iter().map(|v| v.to_expr()).collect();
  let numeric = rhs.iter().map(|v| clean_float(v.to_f64(), 0.0)).collect();
  Some(Solution { values, numeric })
}

/// Solve `a x = b` by partial pivoting. `None` for a singular matrix.
fn solve_dense(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
  let n = b.len();
  for k in 0..n {
    let pivot_row = (k..n)
      .max_by(|&i, &j| a[i][k].abs().total_cmp(&a[j][k].abs()))?;
    if a[pivot_row][k].abs() < 1e-14 {
      return None;
    }
    a.swap(k, pivot_row);
    b.swap(k, pivot_row);
    for i in (k + 1)..n {
      let factor = a[i][k] / a[k][k];
      for j in k..n {
        a[i][j] -= factor * a[k][j];
      }
      b[i] -= factor * b[k];
    }
  }
  let mut x = vec![0.0; n];
  for i in (0..n).rev() {
    let tail: f64 = ((i + 1)..n).map(|j| a[i][j] * x[j]).sum();
    x[i] = (b[i] - tail) / a[i][i];
  }
  Some(x)
}

fn newton(
  equations: &[Expr],
  vars: &[&str],
  jacobian: &[Vec<Expr>],
  seed: &[f64],
) -> Option<Vec<f64>> {
  let mut point = seed.to_vec();
  let eval_all = |exprs: &[Expr], point: &[f64]| -> Vec<f64> {
    let bindings: Vec<(&str, f64)> =
      vars.iter().copied().zip(point.iter().copied()).collect();
    exprs.iter().map(|e| eval_with(e, &bindings)).collect()
  };

  for _ in 0..NEWTON_MAX_STEPS {
    let residual = eval_all(equations, &point);
    if residual.iter().any(|v| !v.is_finite()) {
      return None;
    }
    let jac: Vec<Vec<f64>> =
      jacobian.iter().map(|row| eval_all(row, &point)).collect();
    if jac.iter().flatten().any(|v| !v.is_finite()) {
      return None;
    }
    let step = solve_dense(jac, residual.iter().map(|r| -r).collect())?;
    for (p, s) in point.iter_mut().zip(&step) {
      *p += s;
    }
    if step.iter().all(|s| s.abs() < NEWTON_STEP_TOL) {
      break;
    }
  }

  let residual = eval_all(equations, &point);
  if residual.iter().all(|r| r.abs() < RESIDUAL_TOL) {
    Some(point)
  } else {
    None
  }
}

fn newton_all(
  equations: &[Expr],
  vars: &[&str],
  jacobian: &[Vec<Expr>],
  seeds: &[Vec<f64>],
) -> Vec<Solution> {
  let mut roots: Vec<Vec<f64>> = Vec::new();
  for seed in seeds {
    let Some(root) = newton(equations, vars, jacobian, seed) else {
      continue;
    };
    let duplicate = roots.iter().any(|r| {
      r.iter().zip(&root).all(|(a, b)| (a - b).abs() < DEDUPE_TOL)
    });
    if !duplicate {
      roots.push(root);
    }
  }
  roots
    .into_iter()
    .map(|root| {
      let values: Vec<Expr> = root
        .iter()
        .map(|v| identify(clean_float(*v, 1e-9)))
        .collect();
      let numeric = root.iter().map(|v| clean_float(*v, 1e-9)).collect();
      Solution { values, numeric }
    })
    .collect()
}

/// `lhs - rhs`, the form every equation is solved in.
pub fn equation_to_zero_form(lhs: Expr, rhs: Expr) -> Expr {
  plus(vec![lhs, negate(rhs)])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dense_solver_rejects_singular_matrix() {
    let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
    assert_eq!(solve_dense(a, vec![1.0, 2.0]), None);
  }

  #[test]
  fn dense_solver_pivots() {
    let a = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
    assert_eq!(solve_dense(a, vec![3.0, 5.0]), Some(vec![5.0, 3.0]));
  }
}
