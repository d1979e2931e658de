use super::*;

fn tex(input: &str) -> String {
  to_latex(&e(input)).unwrap()
}

mod plain_text {
  use super::*;

  #[test]
  fn sums_put_constants_last() {
    assert_eq!(e("3 + x*y").to_string(), "x*y + 3");
    assert_eq!(e("x - y").to_string(), "x - y");
  }

  #[test]
  fn negative_rational_coefficients() {
    assert_eq!(e("-x/3").to_string(), "-x/3");
    assert_eq!(e("x**2/(y + 1)").to_string(), "x**2/(y + 1)");
  }

  #[test]
  fn powers() {
    assert_eq!(e("(x + y)**2").to_string(), "(x + y)**2");
    assert_eq!(e("x**(1/3)").to_string(), "x**(1/3)");
    assert_eq!(e("1/sqrt(x)").to_string(), "1/sqrt(x)");
  }

  #[test]
  fn reals() {
    assert_eq!(e("2.0").to_string(), "2");
    assert_eq!(e("0.1*x").to_string(), "0.1*x");
  }
}

mod latex {
  use super::*;

  #[test]
  fn polynomials() {
    assert_eq!(tex("x**2 + y**2"), "x^{2} + y^{2}");
    assert_eq!(tex("x - y"), "x - y");
    assert_eq!(tex("-x"), "- x");
  }

  #[test]
  fn fractions() {
    assert_eq!(tex("x*y/2"), "\\frac{x y}{2}");
    assert_eq!(tex("1/x"), "\\frac{1}{x}");
    assert_eq!(tex("-1/2"), "- \\frac{1}{2}");
    assert_eq!(tex("1/(x + 1)"), "\\frac{1}{x + 1}");
    assert_eq!(tex("x/(x + 1)/y"), "\\frac{x}{y \\left(x + 1\\right)}");
  }

  #[test]
  fn functions() {
    assert_eq!(tex("sin(x)"), "\\sin{\\left(x \\right)}");
    assert_eq!(tex("sin(x)**2"), "\\sin^{2}{\\left(x \\right)}");
    assert_eq!(tex("exp(x*y)"), "e^{x y}");
    assert_eq!(tex("sqrt(x)"), "\\sqrt{x}");
    assert_eq!(tex("abs(x)"), "\\left|{x}\\right|");
    assert_eq!(tex("asin(x)"), "\\operatorname{asin}{\\left(x \\right)}");
  }

  #[test]
  fn constants_and_greek() {
    assert_eq!(tex("pi*x"), "\\pi x");
    assert_eq!(tex("lambda*x"), "\\lambda x");
  }

  #[test]
  fn infinities() {
    assert_eq!(to_latex(&Expr::Real(f64::INFINITY)).unwrap(), "\\infty");
    assert!(to_latex(&Expr::Real(f64::NAN)).is_err());
  }
}
