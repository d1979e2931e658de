//! LaTeX rendering of expression trees.

use crate::functions::arithmetic::negate;
use crate::syntax::{fmt_real, split_fraction, Constant, Expr, Func, Num};
use crate::CalcError;

/// Render `expr` as LaTeX.
///
/// Fails only on a NaN produced by a numeric fallback.
pub fn to_latex(expr: &Expr) -> Result<String, CalcError> {
  match expr {
    Expr::Integer(n) => Ok(n.to_string()),
    Expr::Rational(n, d) => Ok(if *n < 0 {
      format!("- \\frac{{{}}}{{{d}}}", n.unsigned_abs())
    } else {
      format!("\\frac{{{n}}}{{{d}}}")
    }),
    Expr::Real(v) => real_latex(*v),
    Expr::Symbol(name) => Ok(symbol_latex(name)),
    Expr::Constant(Constant::Pi) => Ok("\\pi".to_string()),
    Expr::Constant(Constant::E) => Ok("e".to_string()),
    Expr::Plus(terms) => {
      let mut out = String::new();
      for (i, term) in terms.iter().enumerate() {
        if i == 0 {
          out.push_str(&to_latex(term)?);
        } else if term.is_negative_term() {
          out.push_str(" - ");
          out.push_str(&to_latex(&negate(term.clone()))?);
        } else {
          out.push_str(" + ");
          out.push_str(&to_latex(term)?);
        }
      }
      Ok(out)
    }
    Expr::Times(factors) => product_latex(factors),
    Expr::Power(base, exp) => power_latex(expr, base, exp),
    Expr::Call(func, arg) => call_latex(*func, arg),
  }
}

fn real_latex(v: f64) -> Result<String, CalcError> {
  if v.is_nan() {
    return Err(CalcError::EvaluationError(
      "result is not a number".to_string(),
    ));
  }
  Ok(if v.is_infinite() {
    if v > 0.0 { "\\infty".to_string() } else { "-\\infty".to_string() }
  } else {
    fmt_real(v)
  })
}

fn symbol_latex(name: &str) -> String {
  const GREEK: [&str; 10] = [
    "alpha", "beta", "gamma", "delta", "theta", "lambda", "mu", "rho", "sigma",
    "phi",
  ];
  if GREEK.contains(&name) {
    format!("\\{name}")
  } else {
    name.to_string()
  }
}

fn factor_latex(expr: &Expr) -> Result<String, CalcError> {
  match expr {
    Expr::Plus(_) => Ok(format!("\\left({}\\right)", to_latex(expr)?)),
    _ => to_latex(expr),
  }
}

/// A lone factor needs no parentheses.
fn join_factors(factors: &[Expr]) -> Result<String, CalcError> {
  if let [only] = factors {
    return to_latex(only);
  }
  let parts: Result<Vec<String>, CalcError> =
    factors.iter().map(factor_latex).collect();
  Ok(parts?.join(" "))
}

fn product_latex(factors: &[Expr]) -> Result<String, CalcError> {
  let (coeff, num, den) = split_fraction(factors);
  let negative = coeff.is_negative();
  let (c_num, c_den) = match coeff.abs() {
    Num::Rational(n, d) => (Expr::Integer(n), Expr::Integer(d)),
    Num::Real(f) => (Expr::Real(f), Expr::Integer(1)),
  };

  let mut num_factors = Vec::new();
  if c_num != Expr::Integer(1) || num.is_empty() {
    num_factors.push(c_num);
  }
  num_factors.extend(num);
  let numerator = join_factors(&num_factors)?;

  let mut den_factors = Vec::new();
  if c_den != Expr::Integer(1) {
    den_factors.push(c_den);
  }
  den_factors.extend(den);
  let den_parts = if den_factors.is_empty() {
    None
  } else {
    Some(join_factors(&den_factors)?)
  };

  let body = match den_parts {
    None => numerator,
    Some(denominator) => format!("\\frac{{{numerator}}}{{{denominator}}}"),
  };
  Ok(if negative { format!("- {body}") } else { body })
}

fn power_latex(whole: &Expr, base: &Expr, exp: &Expr) -> Result<String, CalcError> {
  if let Some(e) = Num::from_expr(exp) {
    if e.is_negative() {
      return product_latex(std::slice::from_ref(whole));
    }
  }
  if *exp == Expr::Rational(1, 2) {
    return Ok(format!("\\sqrt{{{}}}", to_latex(base)?));
  }
  let exp_tex = to_latex(exp)?;
  match base {
    Expr::Call(func, arg) if !matches!(func, Func::Exp | Func::Abs) => {
      Ok(format!(
        "{}^{{{exp_tex}}}{{\\left({} \\right)}}",
        func_name_latex(*func),
        to_latex(arg)?
      ))
    }
    Expr::Symbol(_) | Expr::Constant(_) | Expr::Integer(_)
      if !base.is_negative_term() =>
    {
      Ok(format!("{}^{{{exp_tex}}}", to_latex(base)?))
    }
    _ => Ok(format!("\\left({}\\right)^{{{exp_tex}}}", to_latex(base)?)),
  }
}

fn func_name_latex(func: Func) -> String {
  match func {
    Func::Sin
    | Func::Cos
    | Func::Tan
    | Func::Cot
    | Func::Sec
    | Func::Csc
    | Func::Sinh
    | Func::Cosh
    | Func::Tanh
    | Func::Coth
    | Func::Log => format!("\\{}", func.name()),
    _ => format!("\\operatorname{{{}}}", func.name()),
  }
}

fn call_latex(func: Func, arg: &Expr) -> Result<String, CalcError> {
  let inner = to_latex(arg)?;
  Ok(match func {
    Func::Exp => format!("e^{{{inner}}}"),
    Func::Abs => format!("\\left|{{{inner}}}\\right|"),
    _ => format!("{}{{\\left({inner} \\right)}}", func_name_latex(func)),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn greek_symbols() {
    assert_eq!(symbol_latex("lambda"), "\\lambda");
    assert_eq!(symbol_latex("x"), "x");
  }

  #[test]
  fn nan_is_rejected() {
    assert!(to_latex(&Expr::Real(f64::NAN)).is_err());
  }
}
