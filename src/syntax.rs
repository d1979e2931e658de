use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use pest::iterators::Pair;

use crate::functions::arithmetic::{call, divide, negate, plus, power, subtract, times};
use crate::{CalcError, Rule};

/// Exact or floating-point number used while folding constants.
///
/// Rationals are kept reduced with a positive denominator. Any overflow of
/// the `i128` parts degrades to `Real`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
  Rational(i128, i128),
  Real(f64),
}

pub fn gcd(a: i128, b: i128) -> i128 {
  let mut a = a.abs();
  let mut b = b.abs();
  while b != 0 {
    let t = b;
    b = a % b;
    a = t;
  }
  a
}

impl Num {
  pub fn int(n: i128) -> Self {
    Num::Rational(n, 1)
  }

  pub fn rational(n: i128, d: i128) -> Self {
    if d == 0 {
      return Num::Real(n as f64 / 0.0);
    }
    if n == i128::MIN || d == i128::MIN {
      return Num::Real(n as f64 / d as f64);
    }
    let g = gcd(n, d).max(1);
    let (n, d) = (n / g, d / g);
    if d < 0 {
      match (n.checked_neg(), d.checked_neg()) {
        (Some(n), Some(d)) => Num::Rational(n, d),
        _ => Num::Real(n as f64 / d as f64),
      }
    } else {
      Num::Rational(n, d)
    }
  }

  pub fn from_expr(expr: &Expr) -> Option<Self> {
    match expr {
      Expr::Integer(n) => Some(Num::int(*n)),
      Expr::Rational(n, d) => Some(Num::Rational(*n, *d)),
      Expr::Real(f) => Some(Num::Real(*f)),
      _ => None,
    }
  }

  pub fn to_expr(self) -> Expr {
    match self {
      Num::Rational(n, 1) => Expr::Integer(n),
      Num::Rational(n, d) => Expr::Rational(n, d),
      Num::Real(f) => Expr::Real(f),
    }
  }

  pub fn to_f64(self) -> f64 {
    match self {
      Num::Rational(n, d) => n as f64 / d as f64,
      Num::Real(f) => f,
    }
  }

  pub fn is_zero(&self) -> bool {
    match self {
      Num::Rational(n, _) => *n == 0,
      Num::Real(f) => *f == 0.0,
    }
  }

  pub fn is_one(&self) -> bool {
    matches!(self, Num::Rational(1, 1))
  }

  pub fn is_negative(&self) -> bool {
    match self {
      Num::Rational(n, _) => *n < 0,
      Num::Real(f) => *f < 0.0,
    }
  }

  pub fn is_integer(&self) -> bool {
    matches!(self, Num::Rational(_, 1))
  }

  pub fn abs(self) -> Self {
    match self {
      Num::Rational(n, d) => match n.checked_abs() {
        Some(n) => Num::Rational(n, d),
        None => Num::Real((n as f64 / d as f64).abs()),
      },
      Num::Real(f) => Num::Real(f.abs()),
    }
  }

  /// Exact integer power where possible.
  pub fn powi(self, exp: i128) -> Self {
    match self {
      Num::Rational(n, d) => {
        let (n, d) = if exp < 0 { (d, n) } else { (n, d) };
        if n == 0 && exp < 0 {
          return Num::Real(f64::INFINITY);
        }
        let e = exp.unsigned_abs();
        if e > u32::MAX as u128 {
          return Num::Real((n as f64 / d as f64).powf(exp.abs() as f64));
        }
        match (n.checked_pow(e as u32), d.checked_pow(e as u32)) {
          (Some(pn), Some(pd)) => Num::rational(pn, pd),
          _ => Num::Real((n as f64 / d as f64).powf(e as f64)),
        }
      }
      Num::Real(f) => Num::Real(f.powf(exp as f64)),
    }
  }
}

impl std::ops::Add for Num {
  type Output = Self;

  fn add(self, rhs: Self) -> Self {
    match (self, rhs) {
      (Num::Rational(a, b), Num::Rational(c, d)) => {
        let sum = a
          .checked_mul(d)
          .zip(c.checked_mul(b))
          .and_then(|(l, r)| l.checked_add(r))
          .zip(b.checked_mul(d));
        match sum {
          Some((n, den)) => Num::rational(n, den),
          None => Num::Real(self.to_f64() + rhs.to_f64()),
        }
      }
      _ => Num::Real(self.to_f64() + rhs.to_f64()),
    }
  }
}

impl std::ops::Mul for Num {
  type Output = Self;

  fn mul(self, rhs: Self) -> Self {
    match (self, rhs) {
      (Num::Rational(a, b), Num::Rational(c, d)) => {
        match a.checked_mul(c).zip(b.checked_mul(d)) {
          Some((n, den)) => Num::rational(n, den),
          None => Num::Real(self.to_f64() * rhs.to_f64()),
        }
      }
      _ => Num::Real(self.to_f64() * rhs.to_f64()),
    }
  }
}

impl std::ops::Neg for Num {
  type Output = Self;

  fn neg(self) -> Self {
    self * Num::int(-1)
  }
}

impl std::ops::Sub for Num {
  type Output = Self;

  fn sub(self, rhs: Self) -> Self {
    self + (-rhs)
  }
}

impl std::ops::Div for Num {
  type Output = Self;

  fn div(self, rhs: Self) -> Self {
    match (self, rhs) {
      (Num::Rational(a, b), Num::Rational(c, d)) if c != 0 => {
        match a.checked_mul(d).zip(b.checked_mul(c)) {
          Some((n, den)) => Num::rational(n, den),
          None => Num::Real(self.to_f64() / rhs.to_f64()),
        }
      }
      _ => Num::Real(self.to_f64() / rhs.to_f64()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Constant {
  Pi,
  E,
}

impl Constant {
  pub fn value(self) -> f64 {
    match self {
      Constant::Pi => std::f64::consts::PI,
      Constant::E => std::f64::consts::E,
    }
  }
}

/// The one-argument functions accepted by the input language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Func {
  Sin,
  Cos,
  Tan,
  Asin,
  Acos,
  Atan,
  Csc,
  Sec,
  Cot,
  Acsc,
  Asec,
  Acot,
  Sinh,
  Cosh,
  Tanh,
  Asinh,
  Acosh,
  Atanh,
  Csch,
  Sech,
  Coth,
  Exp,
  Log,
  Abs,
}

impl Func {
  pub const ALL: [Func; 24] = [
    Func::Sin,
    Func::Cos,
    Func::Tan,
    Func::Asin,
    Func::Acos,
    Func::Atan,
    Func::Csc,
    Func::Sec,
    Func::Cot,
    Func::Acsc,
    Func::Asec,
    Func::Acot,
    Func::Sinh,
    Func::Cosh,
    Func::Tanh,
    Func::Asinh,
    Func::Acosh,
    Func::Atanh,
    Func::Csch,
    Func::Sech,
    Func::Coth,
    Func::Exp,
    Func::Log,
    Func::Abs,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Func::Sin => "sin",
      Func::Cos => "cos",
      Func::Tan => "tan",
      Func::Asin => "asin",
      Func::Acos => "acos",
      Func::Atan => "atan",
      Func::Csc => "csc",
      Func::Sec => "sec",
      Func::Cot => "cot",
      Func::Acsc => "acsc",
      Func::Asec => "asec",
      Func::Acot => "acot",
      Func::Sinh => "sinh",
      Func::Cosh => "cosh",
      Func::Tanh => "tanh",
      Func::Asinh => "asinh",
      Func::Acosh => "acosh",
      Func::Atanh => "atanh",
      Func::Csch => "csch",
      Func::Sech => "sech",
      Func::Coth => "coth",
      Func::Exp => "exp",
      Func::Log => "log",
      Func::Abs => "abs",
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    Func::ALL.iter().copied().find(|f| f.name() == name)
  }

  pub fn apply(self, v: f64) -> f64 {
    match self {
      Func::Sin => v.sin(),
      Func::Cos => v.cos(),
      Func::Tan => v.tan(),
      Func::Asin => v.asin(),
      Func::Acos => v.acos(),
      Func::Atan => v.atan(),
      Func::Csc => 1.0 / v.sin(),
      Func::Sec => 1.0 / v.cos(),
      Func::Cot => v.cos() / v.sin(),
      Func::Acsc => (1.0 / v).asin(),
      Func::Asec => (1.0 / v).acos(),
      Func::Acot => (1.0 / v).atan(),
      Func::Sinh => v.sinh(),
      Func::Cosh => v.cosh(),
      Func::Tanh => v.tanh(),
      Func::Asinh => v.asinh(),
      Func::Acosh => v.acosh(),
      Func::Atanh => v.atanh(),
      Func::Csch => 1.0 / v.sinh(),
      Func::Sech => 1.0 / v.cosh(),
      Func::Coth => v.cosh() / v.sinh(),
      Func::Exp => v.exp(),
      Func::Log => v.ln(),
      Func::Abs => v.abs(),
    }
  }
}

/// Canonical expression tree.
///
/// Values are only built through the constructors in
/// `functions::arithmetic`, which flatten, fold numbers, collect like terms
/// and sort operands. Structural equality therefore doubles as algebraic
/// equality for the forms the engine produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Integer(i128),
  /// Reduced, denominator > 1.
  Rational(i128, i128),
  Real(f64),
  Symbol(String),
  Constant(Constant),
  Plus(Vec<Expr>),
  Times(Vec<Expr>),
  Power(Box<Expr>, Box<Expr>),
  Call(Func, Box<Expr>),
}

impl Expr {
  pub fn symbol(name: &str) -> Self {
    Expr::Symbol(name.to_string())
  }

  pub fn is_number(&self) -> bool {
    matches!(self, Expr::Integer(_) | Expr::Rational(..) | Expr::Real(_))
  }

  pub fn is_zero(&self) -> bool {
    Num::from_expr(self).is_some_and(|n| n.is_zero())
  }

  /// Split off the numeric coefficient of a product: `-3*x*y` -> `(-3, x*y)`.
  pub fn as_coeff_mul(&self) -> (Num, Expr) {
    match self {
      Expr::Times(factors) => match Num::from_expr(&factors[0]) {
        Some(c) => {
          let rest: Vec<Expr> = factors[1..].to_vec();
          let rest = if rest.len() == 1 {
            rest.into_iter().next().unwrap_or(Expr::Integer(1))
          } else {
            Expr::Times(rest)
          };
          (c, rest)
        }
        None => (Num::int(1), self.clone()),
      },
      _ => match Num::from_expr(self) {
        Some(n) => (n, Expr::Integer(1)),
        None => (Num::int(1), self.clone()),
      },
    }
  }

  /// Split a power into base and exponent; everything else is `self^1`.
  pub fn as_base_exp(&self) -> (Expr, Expr) {
    match self {
      Expr::Power(base, exp) => (*base.clone(), *exp.clone()),
      _ => (self.clone(), Expr::Integer(1)),
    }
  }

  /// True for expressions printed with a leading minus sign.
  pub fn is_negative_term(&self) -> bool {
    match self {
      Expr::Integer(_) | Expr::Rational(..) | Expr::Real(_) => {
        Num::from_expr(self).is_some_and(|n| n.is_negative())
      }
      Expr::Times(factors) => {
        Num::from_expr(&factors[0]).is_some_and(|n| n.is_negative())
      }
      _ => false,
    }
  }
}

pub fn is_constant_wrt(expr: &Expr, var: &str) -> bool {
  match expr {
    Expr::Symbol(name) => name != var,
    Expr::Integer(_) | Expr::Rational(..) | Expr::Real(_) | Expr::Constant(_) => {
      true
    }
    Expr::Plus(items) | Expr::Times(items) => {
      items.iter().all(|e| is_constant_wrt(e, var))
    }
    Expr::Power(base, exp) => {
      is_constant_wrt(base, var) && is_constant_wrt(exp, var)
    }
    Expr::Call(_, arg) => is_constant_wrt(arg, var),
  }
}

pub fn free_symbols(expr: &Expr) -> BTreeSet<String> {
  let mut out = BTreeSet::new();
  collect_symbols(expr, &mut out);
  out
}

fn collect_symbols(expr: &Expr, out: &mut BTreeSet<String>) {
  match expr {
    Expr::Symbol(name) => {
      out.insert(name.clone());
    }
    Expr::Plus(items) | Expr::Times(items) => {
      for item in items {
        collect_symbols(item, out);
      }
    }
    Expr::Power(base, exp) => {
      collect_symbols(base, out);
      collect_symbols(exp, out);
    }
    Expr::Call(_, arg) => collect_symbols(arg, out),
    _ => {}
  }
}

/// Replace every occurrence of `var` and re-canonicalize bottom-up.
pub fn substitute_variable(expr: &Expr, var: &str, value: &Expr) -> Expr {
  match expr {
    Expr::Symbol(name) if name == var => value.clone(),
    Expr::Plus(items) => plus(
      items
        .iter()
        .map(|e| substitute_variable(e, var, value))
        .collect(),
    ),
    Expr::Times(items) => times(
      items
        .iter()
        .map(|e| substitute_variable(e, var, value))
        .collect(),
    ),
    Expr::Power(base, exp) => power(
      substitute_variable(base, var, value),
      substitute_variable(exp, var, value),
    ),
    Expr::Call(f, arg) => call(*f, substitute_variable(arg, var, value)),
    _ => expr.clone(),
  }
}

/// Build an `Expr` from a `Rule::Expression` pair.
pub fn pair_to_expr(pair: Pair<Rule>) -> Result<Expr, CalcError> {
  match pair.as_rule() {
    Rule::Program => {
      let inner = pair.into_inner().next().ok_or(CalcError::EmptyInput)?;
      pair_to_expr(inner)
    }
    Rule::Expression => {
      let mut inner = pair.into_inner();
      let first = inner.next().ok_or(CalcError::EmptyInput)?;
      let mut acc = pair_to_expr(first)?;
      while let Some(op) = inner.next() {
        let rhs = match inner.next() {
          Some(p) => pair_to_expr(p)?,
          None => break,
        };
        acc = if op.as_str() == "-" {
          subtract(acc, rhs)
        } else {
          plus(vec![acc, rhs])
        };
      }
      Ok(acc)
    }
    Rule::Term => {
      let mut inner = pair.into_inner();
      let first = inner.next().ok_or(CalcError::EmptyInput)?;
      let mut acc = pair_to_expr(first)?;
      while let Some(op) = inner.next() {
        let rhs = match inner.next() {
          Some(p) => pair_to_expr(p)?,
          None => break,
        };
        acc = if op.as_str() == "/" {
          divide(acc, rhs)
        } else {
          times(vec![acc, rhs])
        };
      }
      Ok(acc)
    }
    Rule::Unary => {
      let mut negative = false;
      let mut result = None;
      for p in pair.into_inner() {
        match p.as_rule() {
          Rule::Sign => {
            if p.as_str() == "-" {
              negative = !negative;
            }
          }
          _ => result = Some(pair_to_expr(p)?),
        }
      }
      let result = result.ok_or(CalcError::EmptyInput)?;
      Ok(if negative { negate(result) } else { result })
    }
    Rule::Power => {
      let mut inner = pair.into_inner();
      let base = pair_to_expr(inner.next().ok_or(CalcError::EmptyInput)?)?;
      match inner.next() {
        Some(exp) => Ok(power(base, pair_to_expr(exp)?)),
        None => Ok(base),
      }
    }
    Rule::Call => {
      let mut inner = pair.into_inner();
      let name = inner.next().ok_or(CalcError::EmptyInput)?.as_str();
      let arg = pair_to_expr(inner.next().ok_or(CalcError::EmptyInput)?)?;
      if name == "sqrt" {
        return Ok(power(arg, Expr::Rational(1, 2)));
      }
      match Func::from_name(name) {
        Some(f) => Ok(call(f, arg)),
        None => Err(CalcError::EvaluationError(format!(
          "{name} is not a function"
        ))),
      }
    }
    Rule::Identifier => match pair.as_str() {
      "pi" => Ok(Expr::Constant(Constant::Pi)),
      "E" => Ok(Expr::Constant(Constant::E)),
      name if name == "sqrt" || Func::from_name(name).is_some() => Err(
        CalcError::EvaluationError(format!("{name} needs an argument")),
      ),
      name => Ok(Expr::symbol(name)),
    },
    Rule::Number => {
      let text = pair.as_str();
      let is_float = text.contains(['.', 'e', 'E']);
      if !is_float {
        if let Ok(n) = text.parse::<i128>() {
          return Ok(Expr::Integer(n));
        }
      }
      text.parse::<f64>().map(Expr::Real).map_err(|_| {
        CalcError::EvaluationError(format!("invalid number literal {text}"))
      })
    }
    other => Err(CalcError::EvaluationError(format!(
      "unexpected syntax node {other:?}"
    ))),
  }
}

// ─── Ordering ────────────────────────────────────────────────────────

fn monomial_degrees(expr: &Expr) -> Option<Vec<(String, i128)>> {
  match expr {
    Expr::Symbol(name) => Some(vec![(name.clone(), 1)]),
    Expr::Power(base, exp) => match (base.as_ref(), exp.as_ref()) {
      (Expr::Symbol(name), Expr::Integer(n)) if *n > 0 => {
        Some(vec![(name.clone(), *n)])
      }
      _ => None,
    },
    Expr::Times(factors) => {
      let mut out = Vec::new();
      for f in factors {
        if f.is_number() {
          continue;
        }
        out.extend(monomial_degrees(f)?);
      }
      Some(out)
    }
    _ => None,
  }
}

fn degree_of(degrees: &[(String, i128)], name: &str) -> i128 {
  degrees
    .iter()
    .filter(|(n, _)| n == name)
    .map(|(_, d)| *d)
    .sum()
}

/// Order of terms inside a sum: lexicographic monomials first (higher
/// powers of earlier symbols first), then everything else by text.
pub fn cmp_terms(a: &Expr, b: &Expr) -> Ordering {
  let (_, ra) = a.as_coeff_mul();
  let (_, rb) = b.as_coeff_mul();
  match (monomial_degrees(&ra), monomial_degrees(&rb)) {
    (Some(da), Some(db)) => {
      let mut names: BTreeSet<&str> = BTreeSet::new();
      names.extend(da.iter().map(|(n, _)| n.as_str()));
      names.extend(db.iter().map(|(n, _)| n.as_str()));
      for name in names {
        let ord = degree_of(&db, name).cmp(&degree_of(&da, name));
        if ord != Ordering::Equal {
          return ord;
        }
      }
      ra.to_string().cmp(&rb.to_string())
    }
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => ra.to_string().cmp(&rb.to_string()),
  }
}

fn factor_rank(expr: &Expr) -> u8 {
  match expr {
    Expr::Integer(_) | Expr::Rational(..) | Expr::Real(_) => 0,
    Expr::Constant(_) => 1,
    Expr::Symbol(_) => 2,
    Expr::Call(..) => 3,
    Expr::Power(base, _) => match factor_rank(base) {
      0 => 1,
      r => r,
    },
    Expr::Plus(_) => 4,
    Expr::Times(_) => 5,
  }
}

/// Order of factors inside a product: numbers, constants, symbols,
/// function calls, then sums. Ties are broken by the printed base.
pub fn cmp_factors(a: &Expr, b: &Expr) -> Ordering {
  factor_rank(a).cmp(&factor_rank(b)).then_with(|| {
    let (ba, _) = a.as_base_exp();
    let (bb, _) = b.as_base_exp();
    ba.to_string().cmp(&bb.to_string())
  })
}

// ─── Printing ────────────────────────────────────────────────────────

/// Format a float the way the service reports numbers: integral values
/// without a fractional part, everything else in shortest round-trip form.
pub fn fmt_real(v: f64) -> String {
  if v.is_nan() {
    "nan".to_string()
  } else if v.is_infinite() {
    if v > 0.0 { "oo".to_string() } else { "-oo".to_string() }
  } else if v == v.trunc() && v.abs() < 1e15 {
    format!("{}", v as i64)
  } else {
    format!("{v:?}")
  }
}

fn needs_parens_as_base(expr: &Expr) -> bool {
  match expr {
    Expr::Plus(_) | Expr::Times(_) | Expr::Power(..) | Expr::Rational(..) => {
      true
    }
    _ => expr.is_negative_term(),
  }
}

fn fmt_factor(expr: &Expr) -> String {
  match expr {
    Expr::Plus(_) => format!("({expr})"),
    _ => expr.to_string(),
  }
}

/// Split a product into numerator and denominator factor lists plus the
/// sign-free rational coefficient.
pub fn split_fraction(factors: &[Expr]) -> (Num, Vec<Expr>, Vec<Expr>) {
  let mut coeff = Num::int(1);
  let mut num = Vec::new();
  let mut den = Vec::new();
  for f in factors {
    if let Some(n) = Num::from_expr(f) {
      coeff = coeff * n;
      continue;
    }
    match f {
      Expr::Power(base, exp) => match Num::from_expr(exp) {
        Some(e) if e.is_negative() => {
          den.push(power(*base.clone(), (-e).to_expr()));
        }
        _ => num.push(f.clone()),
      },
      _ => num.push(f.clone()),
    }
  }
  (coeff, num, den)
}

fn fmt_product(factors: &[Expr]) -> String {
  let (coeff, num, den) = split_fraction(factors);
  let negative = coeff.is_negative();
  let coeff = coeff.abs();
  let (c_num, c_den) = match coeff {
    Num::Rational(n, d) => (Expr::Integer(n), Expr::Integer(d)),
    Num::Real(f) => (Expr::Real(f), Expr::Integer(1)),
  };

  let mut num_parts: Vec<String> = Vec::new();
  if c_num != Expr::Integer(1) || num.is_empty() {
    num_parts.push(c_num.to_string());
  }
  num_parts.extend(num.iter().map(fmt_factor));
  let mut out = num_parts.join("*");

  let mut den_parts: Vec<Expr> = Vec::new();
  if c_den != Expr::Integer(1) {
    den_parts.push(c_den);
  }
  den_parts.extend(den);
  if !den_parts.is_empty() {
    if den_parts.len() == 1 {
      let d = &den_parts[0];
      if matches!(d, Expr::Times(_)) {
        out = format!("{out}/({d})");
      } else {
        out = format!("{out}/{}", fmt_factor(d));
      }
    } else {
      let joined: Vec<String> = den_parts.iter().map(fmt_factor).collect();
      out = format!("{out}/({})", joined.join("*"));
    }
  }
  if negative { format!("-{out}") } else { out }
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Expr::Integer(n) => write!(f, "{n}"),
      Expr::Rational(n, d) => write!(f, "{n}/{d}"),
      Expr::Real(v) => write!(f, "{}", fmt_real(*v)),
      Expr::Symbol(name) => write!(f, "{name}"),
      Expr::Constant(Constant::Pi) => write!(f, "pi"),
      Expr::Constant(Constant::E) => write!(f, "E"),
      Expr::Plus(terms) => {
        for (i, term) in terms.iter().enumerate() {
          if i == 0 {
            write!(f, "{term}")?;
          } else if term.is_negative_term() {
            write!(f, " - {}", negate(term.clone()))?;
          } else {
            write!(f, " + {term}")?;
          }
        }
        Ok(())
      }
      Expr::Times(factors) => write!(f, "{}", fmt_product(factors)),
      Expr::Power(base, exp) => {
        match exp.as_ref() {
          Expr::Rational(1, 2) => return write!(f, "sqrt({base})"),
          Expr::Integer(-1) | Expr::Rational(-1, 2) => {
            return write!(f, "{}", fmt_product(&[self.clone()]));
          }
          _ => {}
        }
        if let Some(e) = Num::from_expr(exp) {
          if e.is_negative() {
            return write!(f, "{}", fmt_product(&[self.clone()]));
          }
        }
        let base_str = if needs_parens_as_base(base) {
          format!("({base})")
        } else {
          base.to_string()
        };
        let exp_str = match exp.as_ref() {
          Expr::Integer(n) if *n >= 0 => n.to_string(),
          Expr::Symbol(_) | Expr::Constant(_) | Expr::Call(..) => exp.to_string(),
          Expr::Real(v) if *v >= 0.0 => exp.to_string(),
          _ => format!("({exp})"),
        };
        write!(f, "{base_str}**{exp_str}")
      }
      Expr::Call(func, arg) => write!(f, "{}({arg})", func.name()),
    }
  }
}
