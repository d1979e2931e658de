//! Canonicalizing constructors for `Expr`.
//!
//! Every tree the engine produces goes through `plus`, `times`, `power` and
//! `call`. They flatten nested sums/products, fold numbers (exactly while
//! everything is rational), collect like terms and like bases, and sort
//! operands so that equal expressions compare equal.

use crate::syntax::{cmp_factors, cmp_terms, Constant, Expr, Func, Num};

/// Plus[args...]
pub fn plus(args: Vec<Expr>) -> Expr {
  let mut flat: Vec<Expr> = Vec::new();
  for arg in args {
    match arg {
      Expr::Plus(inner) => flat.extend(inner),
      other => flat.push(other),
    }
  }

  let mut number = Num::int(0);
  // (rest, coefficient) pairs; `rest` is never numeric
  let mut collected: Vec<(Expr, Num)> = Vec::new();
  for term in flat {
    if let Some(n) = Num::from_expr(&term) {
      number = number + n;
      continue;
    }
    let (coeff, rest) = term.as_coeff_mul();
    match collected.iter_mut().find(|(r, _)| *r == rest) {
      Some((_, c)) => *c = *c + coeff,
      None => collected.push((rest, coeff)),
    }
  }

  let mut terms: Vec<Expr> = collected
    .into_iter()
    .filter(|(_, c)| !c.is_zero())
    .map(|(rest, c)| times(vec![c.to_expr(), rest]))
    .collect();
  terms.sort_by(cmp_terms);

  if !number.is_zero() || terms.is_empty() {
    terms.push(number.to_expr());
  }

  match terms.len() {
    0 => Expr::Integer(0),
    1 => terms.remove(0),
    _ => Expr::Plus(terms),
  }
}

/// Times[args...]
pub fn times(args: Vec<Expr>) -> Expr {
  let mut flat: Vec<Expr> = Vec::new();
  for arg in args {
    match arg {
      Expr::Times(inner) => flat.extend(inner),
      other => flat.push(other),
    }
  }

  let mut coeff = Num::int(1);
  // (base, exponent) pairs with like bases merged
  let mut bases: Vec<(Expr, Expr)> = Vec::new();
  // exp(a)*exp(b) -> exp(a + b)
  let mut exp_args: Vec<Expr> = Vec::new();
  for factor in flat {
    if let Some(n) = Num::from_expr(&factor) {
      coeff = coeff * n;
      continue;
    }
    if let Expr::Call(Func::Exp, arg) = &factor {
      exp_args.push(*arg.clone());
      continue;
    }
    let (base, exp) = factor.as_base_exp();
    match bases.iter_mut().find(|(b, _)| *b == base) {
      Some((_, e)) => *e = plus(vec![e.clone(), exp]),
      None => bases.push((base, exp)),
    }
  }

  if coeff.is_zero() {
    return coeff.to_expr();
  }

  let mut factors: Vec<Expr> = Vec::new();
  if !exp_args.is_empty() {
    let merged = if exp_args.len() == 1 {
      call(Func::Exp, exp_args.remove(0))
    } else {
      call(Func::Exp, plus(exp_args))
    };
    match Num::from_expr(&merged) {
      Some(n) => coeff = coeff * n,
      None => bases.push((merged, Expr::Integer(1))),
    }
  }
  for (base, exp) in bases {
    let built = power(base, exp);
    match built {
      Expr::Times(inner) => {
        for f in inner {
          match Num::from_expr(&f) {
            Some(n) => coeff = coeff * n,
            None => factors.push(f),
          }
        }
      }
      other => match Num::from_expr(&other) {
        Some(n) => coeff = coeff * n,
        None => factors.push(other),
      },
    }
  }

  if coeff.is_zero() {
    return coeff.to_expr();
  }

  // 2*(x + 1) -> 2*x + 2
  if factors.len() == 1 && !coeff.is_one() {
    if let Expr::Plus(terms) = &factors[0] {
      return plus(
        terms
          .iter()
          .map(|t| times(vec![coeff.to_expr(), t.clone()]))
          .collect(),
      );
    }
  }

  factors.sort_by(cmp_factors);
  if !coeff.is_one() {
    factors.insert(0, coeff.to_expr());
  }

  match factors.len() {
    0 => Expr::Integer(1),
    1 => factors.remove(0),
    _ => Expr::Times(factors),
  }
}

const SQRT_TRIAL_LIMIT: i128 = 1_000_000;

/// Split `n` into `(outside, inside)` with `sqrt(n) = outside * sqrt(inside)`.
///
/// Trial factors stop at `SQRT_TRIAL_LIMIT`; a square of a larger prime
/// stays inside unless the whole remainder is a perfect square.
pub fn simplify_sqrt_parts(n: i128) -> (i128, i128) {
  if n == 0 {
    return (0, 1);
  }
  if n < 0 {
    return (1, n);
  }
  let mut outside = 1i128;
  let mut inside = n;
  let mut factor = 2i128;
  while factor <= SQRT_TRIAL_LIMIT && factor * factor <= inside {
    while inside % (factor * factor) == 0 {
      inside /= factor * factor;
      outside *= factor;
    }
    factor += 1;
  }
  if let Some(root) = exact_isqrt(inside) {
    return (outside * root, 1);
  }
  (outside, inside)
}

fn exact_isqrt(n: i128) -> Option<i128> {
  let guess = (n as f64).sqrt().round() as i128;
  (guess - 1..=guess + 1).find(|r| *r > 0 && r.checked_mul(*r) == Some(n))
}

fn rational_sqrt(n: i128, d: i128) -> Option<Expr> {
  if n < 0 || d <= 0 || n > 1_000_000_000_000 || d > 1_000_000_000_000 {
    return None;
  }
  // sqrt(n/d) = sqrt(n*d)/d
  let (outside, inside) = simplify_sqrt_parts(n.checked_mul(d)?);
  let coeff = Num::rational(outside, d);
  if inside == 1 {
    return Some(coeff.to_expr());
  }
  // Built by hand: going through `times` would come straight back here.
  let root = Expr::Power(
    Box::new(Expr::Integer(inside)),
    Box::new(Expr::Rational(1, 2)),
  );
  if coeff.is_one() {
    Some(root)
  } else {
    Some(Expr::Times(vec![coeff.to_expr(), root]))
  }
}

fn numeric_power(base: Num, exp: Num) -> Option<Expr> {
  match (base, exp) {
    (Num::Real(_), _) | (_, Num::Real(_)) => {
      Some(Expr::Real(base.to_f64().powf(exp.to_f64())))
    }
    (_, Num::Rational(e, 1)) => {
      if base.is_zero() && e < 0 {
        return None;
      }
      Some(base.powi(e).to_expr())
    }
    (Num::Rational(n, d), Num::Rational(1, 2)) => rational_sqrt(n, d),
    (Num::Rational(n, d), Num::Rational(-1, 2)) if n > 0 => {
      rational_sqrt(d, n)
    }
    _ => None,
  }
}

/// Power[base, exp]
pub fn power(base: Expr, exp: Expr) -> Expr {
  if exp.is_zero() {
    return Expr::Integer(1);
  }
  if exp == Expr::Integer(1) {
    return base;
  }
  if base == Expr::Integer(1) {
    return Expr::Integer(1);
  }
  if let (Some(b), Some(e)) = (Num::from_expr(&base), Num::from_expr(&exp)) {
    if b.is_zero() && !e.is_negative() {
      return Expr::Integer(0);
    }
    if let Some(result) = numeric_power(b, e) {
      return result;
    }
  }

  match (&base, &exp) {
    (Expr::Constant(Constant::E), _) => call(Func::Exp, exp),
    (Expr::Power(inner_base, inner_exp), Expr::Integer(_)) => power(
      *inner_base.clone(),
      times(vec![*inner_exp.clone(), exp.clone()]),
    ),
    (Expr::Times(factors), Expr::Integer(_)) => times(
      factors
        .iter()
        .map(|f| power(f.clone(), exp.clone()))
        .collect(),
    ),
    (Expr::Call(Func::Exp, arg), Expr::Integer(_)) => {
      call(Func::Exp, times(vec![*arg.clone(), exp.clone()]))
    }
    _ => Expr::Power(Box::new(base), Box::new(exp)),
  }
}

fn is_multiple_of_pi(arg: &Expr) -> Option<Num> {
  match arg {
    Expr::Constant(Constant::Pi) => Some(Num::int(1)),
    Expr::Times(factors) if factors.len() == 2 => {
      match (Num::from_expr(&factors[0]), &factors[1]) {
        (Some(c @ Num::Rational(..)), Expr::Constant(Constant::Pi)) => Some(c),
        _ => None,
      }
    }
    _ => None,
  }
}

/// Exact values at the handful of special points worth keeping symbolic.
fn exact_call(func: Func, arg: &Expr) -> Option<Expr> {
  if arg.is_zero() {
    return match func {
      Func::Sin
      | Func::Tan
      | Func::Asin
      | Func::Atan
      | Func::Sinh
      | Func::Tanh
      | Func::Asinh
      | Func::Atanh
      | Func::Abs => Some(Expr::Integer(0)),
      Func::Cos | Func::Sec | Func::Cosh | Func::Sech | Func::Exp => {
        Some(Expr::Integer(1))
      }
      _ => None,
    };
  }
  if let Some(k) = is_multiple_of_pi(arg) {
    if let Num::Rational(n, d) = k {
      match (func, d) {
        (Func::Sin, 1) | (Func::Tan, 1) => return Some(Expr::Integer(0)),
        (Func::Cos, 1) => {
          return Some(Expr::Integer(if n % 2 == 0 { 1 } else { -1 }));
        }
        (Func::Sin, 2) => {
          return Some(Expr::Integer(if n.rem_euclid(4) == 1 { 1 } else { -1 }));
        }
        (Func::Cos, 2) => return Some(Expr::Integer(0)),
        _ => {}
      }
    }
  }
  match (func, arg) {
    (Func::Log, Expr::Integer(1)) => Some(Expr::Integer(0)),
    (Func::Log, Expr::Constant(Constant::E)) => Some(Expr::Integer(1)),
    (Func::Log, Expr::Call(Func::Exp, inner)) => Some(*inner.clone()),
    (Func::Exp, Expr::Call(Func::Log, inner)) => Some(*inner.clone()),
    (Func::Exp, Expr::Integer(1)) => Some(Expr::Constant(Constant::E)),
    (Func::Abs, _) => {
      Num::from_expr(arg).map(|n| n.abs().to_expr()).or_else(|| {
        if let Expr::Constant(_) = arg {
          Some(arg.clone())
        } else {
          None
        }
      })
    }
    _ => None,
  }
}

/// f(arg) for one of the named functions.
pub fn call(func: Func, arg: Expr) -> Expr {
  if let Some(exact) = exact_call(func, &arg) {
    return exact;
  }
  if let Expr::Real(v) = arg {
    return Expr::Real(func.apply(v));
  }
  Expr::Call(func, Box::new(arg))
}

pub fn negate(expr: Expr) -> Expr {
  times(vec![Expr::Integer(-1), expr])
}

pub fn subtract(lhs: Expr, rhs: Expr) -> Expr {
  plus(vec![lhs, negate(rhs)])
}

pub fn divide(lhs: Expr, rhs: Expr) -> Expr {
  times(vec![lhs, power(rhs, Expr::Integer(-1))])
}

pub fn sqrt(expr: Expr) -> Expr {
  power(expr, Expr::Rational(1, 2))
}

fn multiply_out(lhs: &[Expr], rhs: &[Expr]) -> Vec<Expr> {
  let mut out = Vec::with_capacity(lhs.len() * rhs.len());
  for a in lhs {
    for b in rhs {
      out.push(times(vec![a.clone(), b.clone()]));
    }
  }
  out
}

fn as_terms(expr: Expr) -> Vec<Expr> {
  match expr {
    Expr::Plus(terms) => terms,
    other => vec![other],
  }
}

/// Distribute products over sums and expand small integer powers of sums.
pub fn expand(expr: &Expr) -> Expr {
  match expr {
    Expr::Plus(terms) => plus(terms.iter().map(expand).collect()),
    Expr::Times(factors) => {
      let mut acc = vec![Expr::Integer(1)];
      for f in factors {
        acc = multiply_out(&acc, &as_terms(expand(f)));
      }
      plus(acc)
    }
    Expr::Power(base, exp) => {
      let base = expand(base);
      match (&base, exp.as_ref()) {
        (Expr::Plus(terms), Expr::Integer(n)) if (2..=8).contains(n) => {
          let mut acc = terms.clone();
          for _ in 1..*n {
            acc = multiply_out(&acc, terms);
          }
          plus(acc)
        }
        _ => power(base, *exp.clone()),
      }
    }
    Expr::Call(f, arg) => call(*f, expand(arg)),
    _ => expr.clone(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn square_factors_come_out() {
    assert_eq!(simplify_sqrt_parts(12), (2, 3));
    assert_eq!(simplify_sqrt_parts(49), (7, 1));
    assert_eq!(simplify_sqrt_parts(-4), (1, -4));
  }

  #[test]
  fn square_of_a_large_prime() {
    let p = 1_000_003i128;
    assert_eq!(simplify_sqrt_parts(4 * p * p), (2 * p, 1));
  }

  #[test]
  fn large_radicand_keeps_its_leftover() {
    let n = 999_999_999_989i128 * 999_999_999_959;
    let (outside, inside) = simplify_sqrt_parts(n);
    assert_eq!(outside * outside * inside, n);
  }
}
