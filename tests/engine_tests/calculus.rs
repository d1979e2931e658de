use super::*;

/// d/dvar of the antiderivative, compared with the integrand at a few points.
fn assert_antiderivative(integrand: &str, var: &str) {
  let f = e(integrand);
  let anti = integrate(&f, var).unwrap();
  let back = differentiate(&anti, var);
  for (x, y) in [(0.3, 0.7), (1.1, -0.4), (2.5, 1.9)] {
    let want = eval_xy(&f, x, y);
    let got = eval_xy(&back, x, y);
    assert!((want - got).abs() < 1e-9, "{integrand}: {got} != {want}");
  }
}

mod differentiate {
  use super::*;

  #[test]
  fn polynomial() {
    assert_eq!(differentiate(&e("x**2 + y**2"), "x"), e("2*x"));
    assert_eq!(differentiate(&e("x**2*y"), "x"), e("2*x*y"));
    assert_eq!(differentiate(&e("x**2*y"), "y"), e("x**2"));
  }

  #[test]
  fn product_of_symbols() {
    assert_eq!(differentiate(&e("x*y"), "x"), e("y"));
    assert_eq!(differentiate(&e("x*y"), "y"), e("x"));
  }

  #[test]
  fn chain_rule() {
    assert_eq!(differentiate(&e("sin(x*y)"), "x"), e("y*cos(x*y)"));
    assert_eq!(differentiate(&e("exp(x**2)"), "x"), e("2*x*exp(x**2)"));
    assert_eq!(differentiate(&e("log(x)"), "x"), e("1/x"));
  }

  #[test]
  fn constant_in_variable() {
    assert_eq!(differentiate(&e("sin(y) + 3"), "x"), e("0"));
  }
}

mod integrate {
  use super::*;

  #[test]
  fn closed_forms() {
    assert_eq!(integrate(&e("1/x"), "x"), Some(e("log(x)")));
    assert_eq!(integrate(&e("1/(x**2 + 1)"), "x"), Some(e("atan(x)")));
    assert_eq!(integrate(&e("cos(x)"), "x"), Some(e("sin(x)")));
  }

  #[test]
  fn constant_factors_stay_outside() {
    assert_eq!(integrate(&e("x*y"), "y"), Some(e("x*y**2/2")));
    assert_eq!(integrate(&e("3"), "x"), Some(e("3*x")));
  }

  #[test]
  fn by_parts_and_trig_powers() {
    assert_antiderivative("x*exp(x)", "x");
    assert_antiderivative("x**2*sin(x)", "x");
    assert_antiderivative("sin(x)**2", "x");
    assert_antiderivative("cos(2*x)**2", "x");
  }

  #[test]
  fn expands_products_of_sums() {
    assert_antiderivative("(x + y)**2", "x");
    assert_antiderivative("(x + 1)*(x - 1)*y", "x");
  }

  #[test]
  fn no_elementary_antiderivative() {
    assert_eq!(integrate(&e("exp(x**2)"), "x"), None);
  }

  #[test]
  fn definite_in_one_variable() {
    assert_eq!(
      definite_integral(&e("x*y"), "y", &e("0"), &e("1")),
      Some(e("x/2"))
    );
  }

  #[test]
  fn definite_across_a_singularity_is_rejected() {
    assert_eq!(definite_integral(&e("1/x"), "x", &e("0"), &e("1")), None);
  }

  #[test]
  fn poles_inside_a_rectangle() {
    assert!(!finite_on_rectangle(&e("1/x**2"), (-1.0, 1.0), (0.0, 1.0)));
    assert!(!finite_on_rectangle(&e("1/(x - 0.3001)"), (0.0, 1.0), (0.0, 1.0)));
    assert!(!finite_on_rectangle(&e("tan(x)*y"), (0.0, 2.0), (0.0, 1.0)));
    assert!(!finite_on_rectangle(&e("log(x - y)"), (0.0, 1.0), (0.0, 1.0)));
  }

  #[test]
  fn poles_outside_a_rectangle() {
    assert!(finite_on_rectangle(&e("1/(x + 2)"), (-1.0, 1.0), (0.0, 1.0)));
    assert!(finite_on_rectangle(&e("tan(x)*y"), (0.0, 1.0), (0.0, 1.0)));
    assert!(finite_on_rectangle(&e("x*y"), (0.0, 1.0), (0.0, 2.0)));
  }
}

mod numeric {
  use super::*;

  #[test]
  fn simpson_on_smooth_function() {
    let v = adaptive_simpson(&|x: f64| Some(x.sin()), 0.0, std::f64::consts::PI, 1e-10, 20)
      .unwrap();
    assert!((v - 2.0).abs() < 1e-9);
  }

  #[test]
  fn simpson_gives_up_on_non_finite_samples() {
    let f = |x: f64| {
      let v = 1.0 / x;
      if v.is_finite() { Some(v) } else { None }
    };
    assert_eq!(adaptive_simpson(&f, 0.0, 1.0, 1e-10, 12), None);
  }

  #[test]
  fn double_integral_over_rectangle() {
    let v = numeric_double_integral(&|x: f64, y: f64| x * y, (0.0, 1.0), (0.0, 2.0))
      .unwrap();
    assert!((v - 1.0).abs() < 1e-9);
  }

  #[test]
  fn removable_singularity_limit() {
    let f = |x: f64| (x * x - 1.0) / (x - 1.0);
    assert_eq!(limit_at(&f, 1.0), Limit::Finite(2.0));
  }

  #[test]
  fn finite_value_is_its_own_limit() {
    assert_eq!(limit_at(&|x: f64| x + 1.0, 2.0), Limit::Finite(3.0));
  }

  #[test]
  fn one_sided_blow_up() {
    assert_eq!(limit_at(&|x: f64| -1.0 / (x * x), 0.0), Limit::NegInfinity);
  }

  #[test]
  fn cleaning_and_identification() {
    assert_eq!(clean_float(1.9999999999, 1e-9), 2.0);
    assert_eq!(clean_float(-0.0, 1e-9), 0.0);
    assert_eq!(identify(0.5), e("1/2"));
    assert_eq!(identify(-0.7071067811865476), e("-sqrt(2)/2"));
    assert_eq!(try_eval_to_f64(&e("pi/pi")), Some(1.0));
    assert_eq!(try_eval_to_f64(&e("log(0)")), None);
  }
}
