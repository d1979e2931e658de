use super::*;

fn grid() -> Vec<Vec<f64>> {
  let mut seeds = Vec::new();
  for x in [-2.0, -1.0, 0.0, 1.0, 2.0] {
    for y in [-2.0, -1.0, 0.0, 1.0, 2.0] {
      seeds.push(vec![x, y]);
    }
  }
  seeds
}

#[test]
fn linear_system_is_exact() {
  let eqs = [e("x + y - 3"), e("x - y - 1")];
  let sols = solve_system(&eqs, &["x", "y"], &[]);
  assert_eq!(sols.len(), 1);
  assert_eq!(sols[0].values, vec![e("2"), e("1")]);
  assert_eq!(sols[0].numeric, vec![2.0, 1.0]);
}

#[test]
fn linear_system_with_rational_solution() {
  let eqs = [e("2*x - 1"), e("3*y + x")];
  let sols = solve_system(&eqs, &["x", "y"], &[]);
  assert_eq!(sols.len(), 1);
  assert_eq!(sols[0].values, vec![e("1/2"), e("-1/6")]);
}

#[test]
fn singular_linear_system_has_no_isolated_solution() {
  let eqs = [e("x + y - 1"), e("2*x + 2*y - 2")];
  assert!(solve_system(&eqs, &["x", "y"], &grid()).is_empty());
}

#[test]
fn quadratic_roots_from_several_seeds() {
  let seeds = vec![vec![-3.0], vec![0.5], vec![3.0], vec![2.5]];
  let sols = solve_system(&[e("x**2 - 4")], &["x"], &seeds);
  let values: Vec<Expr> = sols.iter().map(|s| s.values[0].clone()).collect();
  assert_eq!(values, vec![e("-2"), e("2")]);
}

#[test]
fn circle_meets_diagonal() {
  let eqs = [e("x**2 + y**2 - 1"), e("x - y")];
  let sols = solve_system(&eqs, &["x", "y"], &grid());
  assert_eq!(sols.len(), 2);
  assert_eq!(sols[0].values, vec![e("-sqrt(2)/2"), e("-sqrt(2)/2")]);
  assert_eq!(sols[1].values, vec![e("sqrt(2)/2"), e("sqrt(2)/2")]);
}

#[test]
fn inconsistent_nonlinear_system() {
  let eqs = [e("x**2 + y**2 + 1"), e("x - y")];
  assert!(solve_system(&eqs, &["x", "y"], &grid()).is_empty());
}
