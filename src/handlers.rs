//! Request handling shared by the HTTP service and the CLI: field
//! extraction, validation, the engine call and response assembly.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::explain::{
  block_tex, graph_explanations, inline_tex, Diagnostics, GraphNarrative, Step,
};
use crate::functions::latex::to_latex;
use crate::functions::numeric::try_eval_to_f64;
use crate::operations::{self, DoubleIntegral, LagrangePoint, RectLimits};
use crate::syntax::Expr;
use crate::validate::{validate_expression, validate_numeric, ValidationError};
use crate::CalcError;

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("{0}")]
  MissingField(String),
  #[error("{0}")]
  Invalid(String),
  #[error("Error: {0}")]
  Engine(#[from] CalcError),
  #[error("Unexpected error: {0}")]
  Internal(String),
}

impl From<ValidationError> for ApiError {
  fn from(e: ValidationError) -> Self {
    ApiError::Invalid(e.0)
  }
}

impl ApiError {
  /// HTTP status code for this error.
  pub fn status(&self) -> u16 {
    match self {
      ApiError::Internal(_) => 500,
      _ => 400,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Partials,
  Gradient,
  Evaluate,
  DoubleIntegral,
  Lagrange,
  Optimize,
  AnalyzeDomain,
}

impl Operation {
  pub const ALL: [Operation; 7] = [
    Operation::Partials,
    Operation::Gradient,
    Operation::Evaluate,
    Operation::DoubleIntegral,
    Operation::Lagrange,
    Operation::Optimize,
    Operation::AnalyzeDomain,
  ];

  pub fn path(self) -> &'static str {
    match self {
      Operation::Partials => "/partials",
      Operation::Gradient => "/gradient",
      Operation::Evaluate => "/evaluate",
      Operation::DoubleIntegral => "/double-integral",
      Operation::Lagrange => "/lagrange",
      Operation::Optimize => "/optimize",
      Operation::AnalyzeDomain => "/analyze_domain",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      Operation::Partials => "Compute partial derivatives df/dx and df/dy",
      Operation::Gradient => "Compute gradient (fx, fy)",
      Operation::Evaluate => "Evaluate function at (x0, y0)",
      Operation::DoubleIntegral => {
        "Compute a double integral, definite over rectangular limits or indefinite without them"
      }
      Operation::Lagrange => "Apply Lagrange multipliers with constraint g(x,y)=0",
      Operation::Optimize => "Unconstrained optimization for f(x,y)",
      Operation::AnalyzeDomain => {
        "Analyze domain conditions, estimate the range and compute a limit"
      }
    }
  }

  pub fn body_shape(self) -> Value {
    match self {
      Operation::Partials | Operation::Gradient | Operation::Optimize => {
        json!({"expression": "string"})
      }
      Operation::Evaluate => {
        json!({"expression": "string", "x0": "number", "y0": "number"})
      }
      Operation::DoubleIntegral => json!({
        "function": "string",
        "xlim": "[a,b] (optional)",
        "ylim": "[c,d] (optional)"
      }),
      Operation::Lagrange => {
        json!({"expression": "string", "constraint": "string"})
      }
      Operation::AnalyzeDomain => json!({
        "expression": "string",
        "x0": "number (optional)",
        "y0": "number (optional)"
      }),
    }
  }
}

/// Run `op` on a request body. Anything but a JSON object counts as a body
/// with no fields.
pub fn dispatch(
  op: Operation,
  body: &Value,
  config: &ServerConfig,
) -> Result<Value, ApiError> {
  let empty = Map::new();
  let fields = body.as_object().unwrap_or(&empty);
  let max_len = config.max_expression_len;
  let outcome = match op {
    Operation::Partials => partials(fields, max_len).and_then(to_json),
    Operation::Gradient => gradient(fields, max_len).and_then(to_json),
    Operation::Evaluate => evaluate(fields, max_len).and_then(to_json),
    Operation::DoubleIntegral => double_integral(fields, max_len),
    Operation::Lagrange => lagrange(fields, max_len).and_then(to_json),
    Operation::Optimize => optimize(fields, max_len).and_then(to_json),
    Operation::AnalyzeDomain => {
      analyze_domain(fields, max_len).and_then(to_json)
    }
  };
  match &outcome {
    Ok(_) => {}
    Err(e @ ApiError::Internal(_)) => {
      error!(path = op.path(), error = %e, "request failed")
    }
    Err(e) => warn!(path = op.path(), error = %e, "request rejected"),
  }
  outcome
}

fn to_json<T: Serialize>(response: T) -> Result<Value, ApiError> {
  serde_json::to_value(response).map_err(|e| ApiError::Internal(e.to_string()))
}

// ─── Field extraction ────────────────────────────────────────────────

fn truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
    Value::String(s) => !s.is_empty(),
    Value::Array(a) => !a.is_empty(),
    Value::Object(o) => !o.is_empty(),
  }
}

/// `primary` if it holds a truthy value, else whatever `fallback` holds.
fn field_or<'a>(
  fields: &'a Map<String, Value>,
  primary: &str,
  fallback: &str,
) -> Option<&'a Value> {
  match fields.get(primary) {
    Some(v) if truthy(v) => Some(v),
    _ => fields.get(fallback),
  }
}

/// Present and not null.
fn non_null<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
  fields.get(key).filter(|v| !v.is_null())
}

fn pair(value: Option<&Value>) -> Option<(&Value, &Value)> {
  match value {
    Some(Value::Array(items)) if items.len() == 2 => Some((&items[0], &items[1])),
    _ => None,
  }
}

// ─── Shared pieces ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Narrative {
  pub title: String,
  pub summary: String,
  pub explanation: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub explanation_detailed: Option<String>,
}

fn tex(diagnostics: &mut Diagnostics, expr: &Expr) -> Option<String> {
  diagnostics.record("latex", to_latex(expr))
}

fn block(tex: Option<String>) -> Option<String> {
  tex.map(|t| block_tex(&t))
}

fn function_step(f_tex: &Option<String>, description: &str) -> Step {
  Step::new(
    description,
    f_tex.as_ref().map(|t| block_tex(&format!("f(x,y) = {t}"))),
  )
}

const PARTIAL_X: &str = "\\frac{\\partial f}{\\partial x}";
const PARTIAL_Y: &str = "\\frac{\\partial f}{\\partial y}";

// ─── Partials / gradient ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DerivativeResponse {
  pub result: String,
  pub resultado_latex: Option<String>,
  pub steps: Vec<Step>,
  #[serde(flatten)]
  pub narrative: Narrative,
  #[serde(flatten)]
  pub graph: GraphNarrative,
  pub diagnostics: Diagnostics,
}

fn expression_field<'a>(
  fields: &'a Map<String, Value>,
  max_len: usize,
) -> Result<&'a str, ApiError> {
  let value = fields
    .get("expression")
    .ok_or_else(|| ApiError::MissingField("Missing field: expression".into()))?;
  Ok(validate_expression(value, max_len)?)
}

pub fn partials(
  fields: &Map<String, Value>,
  max_len: usize,
) -> Result<DerivativeResponse, ApiError> {
  let expr_txt = expression_field(fields, max_len)?;
  info!(path = "/partials", expression = expr_txt, "payload accepted");
  let d = operations::partials(expr_txt)?;

  let mut diagnostics = Diagnostics::default();
  let f_tex = tex(&mut diagnostics, &d.function);
  let fx_tex = tex(&mut diagnostics, &d.fx);
  let fy_tex = tex(&mut diagnostics, &d.fy);
  let resultado_latex = match (&fx_tex, &fy_tex) {
    (Some(fx), Some(fy)) => {
      Some(format!("{PARTIAL_X} = {fx}, \\; {PARTIAL_Y} = {fy}"))
    }
    _ => None,
  };
  let steps = vec![
    function_step(&f_tex, "Identify the function f(x,y)."),
    Step::new(
      "Differentiate with respect to x.",
      fx_tex.map(|t| block_tex(&format!("{PARTIAL_X} = {t}"))),
    ),
    Step::new(
      "Differentiate with respect to y.",
      fy_tex.map(|t| block_tex(&format!("{PARTIAL_Y} = {t}"))),
    ),
    Step::text(
      "Each partial derivative measures the rate of change along a single variable.",
    ),
  ];
  let explanation = "Partial derivatives show how sensitive f is to changes in x or in y. \
    They are the basis for building the gradient and analyzing local variation.";
  let graph = graph_explanations(expr_txt, &mut diagnostics);
  Ok(DerivativeResponse {
    result: d.partials_text(),
    resultado_latex: block(resultado_latex),
    steps,
    narrative: Narrative {
      title: "Partial derivatives".into(),
      summary: explanation.into(),
      explanation: explanation.into(),
      explanation_detailed: Some(
        "Partial derivatives quantify how f changes when only one variable varies \
         while the other stays fixed. Geometrically they are the slopes along the \
         coordinate axes. From them we build the gradient and the tangent plane, \
         and find the directions of steepest increase."
          .into(),
      ),
    },
    graph,
    diagnostics,
  })
}

pub fn gradient(
  fields: &Map<String, Value>,
  max_len: usize,
) -> Result<DerivativeResponse, ApiError> {
  let expr_txt = expression_field(fields, max_len)?;
  info!(path = "/gradient", expression = expr_txt, "payload accepted");
  let d = operations::gradient(expr_txt)?;

  let mut diagnostics = Diagnostics::default();
  let f_tex = tex(&mut diagnostics, &d.function);
  let fx_tex = tex(&mut diagnostics, &d.fx);
  let fy_tex = tex(&mut diagnostics, &d.fy);
  let (partials_tex, nabla_tex) = match (&fx_tex, &fy_tex) {
    (Some(fx), Some(fy)) => (
      Some(format!("{PARTIAL_X} = {fx},\\; {PARTIAL_Y} = {fy}")),
      Some(format!("\\nabla f = \\left( {fx}, {fy} \\right)")),
    ),
    _ => (None, None),
  };
  let steps = vec![
    function_step(&f_tex, "Identify the function f(x,y)."),
    Step::new(
      "Compute the partial derivatives df/dx and df/dy.",
      block(partials_tex),
    ),
    Step::new("Form the gradient vector.", block(nabla_tex.clone())),
    Step::text(
      "The gradient points in the direction of steepest increase of the function.",
    ),
  ];
  let explanation = "The gradient collects the partial derivatives into a vector that \
    points where f increases fastest. Its norm is the maximum local rate of increase.";
  let graph = graph_explanations(expr_txt, &mut diagnostics);
  Ok(DerivativeResponse {
    result: d.gradient_text(),
    resultado_latex: block(nabla_tex),
    steps,
    narrative: Narrative {
      title: "Gradient".into(),
      summary: explanation.into(),
      explanation: explanation.into(),
      explanation_detailed: Some(
        "The gradient points in the direction of maximum increase and its magnitude \
         is the maximum rate of change. It is perpendicular to the level curves of f. \
         In optimization it drives ascent and descent methods; in physics it \
         describes fields such as temperature or potential."
          .into(),
      ),
    },
    graph,
    diagnostics,
  })
}

// ─── Evaluate ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateResponse {
  pub result: String,
  pub value: Option<f64>,
  pub resultado_latex: Option<String>,
  pub result_latex: Option<String>,
  pub result_numeric: Option<f64>,
  pub steps: Vec<Step>,
  #[serde(flatten)]
  pub narrative: Narrative,
  #[serde(flatten)]
  pub graph: GraphNarrative,
  pub diagnostics: Diagnostics,
}

pub fn evaluate(
  fields: &Map<String, Value>,
  max_len: usize,
) -> Result<EvaluateResponse, ApiError> {
  let missing =
    || ApiError::MissingField("Missing fields: func/expression, x0, y0".into());
  let expr_value = field_or(fields, "expression", "func")
    .filter(|v| !v.is_null())
    .ok_or_else(missing)?;
  let x0_value = non_null(fields, "x0").ok_or_else(missing)?;
  let y0_value = non_null(fields, "y0").ok_or_else(missing)?;
  let expr_txt = validate_expression(expr_value, max_len)?;
  let x0 = validate_numeric(x0_value, "x0")?;
  let y0 = validate_numeric(y0_value, "y0")?;
  info!(path = "/evaluate", expression = expr_txt, %x0, %y0, "payload accepted");

  let ev = operations::evaluate(expr_txt, &x0, &y0)?;

  let mut diagnostics = Diagnostics::default();
  let f_tex = tex(&mut diagnostics, &ev.function);
  let x0_tex = tex(&mut diagnostics, &ev.x0);
  let y0_tex = tex(&mut diagnostics, &ev.y0);
  let val_tex = tex(&mut diagnostics, &ev.value_expr());
  let result_tex = match (&x0_tex, &y0_tex, &val_tex) {
    (Some(x), Some(y), Some(v)) => Some(format!("f({x}, {y}) = {v}")),
    _ => None,
  };
  let point_tex = match (&x0_tex, &y0_tex) {
    (Some(x), Some(y)) => Some(format!("x = {x},\\; y = {y}")),
    _ => None,
  };
  let steps = vec![
    function_step(&f_tex, "Identify the function f(x,y)."),
    Step::new("Substitute the coordinates of the point.", block(point_tex)),
    Step::new(
      "Evaluate the expression to obtain the value.",
      block(val_tex.clone()),
    ),
    Step::text(
      "This value is the height of the surface z = f(x,y) at the point (x0, y0).",
    ),
  ];

  let x0_txt = x0_tex.unwrap_or_else(|| ev.x0.to_string());
  let y0_txt = y0_tex.unwrap_or_else(|| ev.y0.to_string());
  let f_txt = f_tex.unwrap_or_else(|| expr_txt.to_string());
  let value_txt = match ev.value {
    Some(v) => format!("{v:?}"),
    None => ev.result_text(),
  };
  let explanation = format!(
    "The value of f(x,y) = {f_txt} at (x, y) = ({x0_txt}, {y0_txt}) is approximately \
     {value_txt}. This is the height of the surface at that point."
  );
  let explanation_detailed = format!(
    "Substituting x = {x0_txt} and y = {y0_txt} into f(x,y) = {f_txt} and evaluating \
     gives f({x0_txt}, {y0_txt}) = {}. This value is the height (z) of the surface \
     at those coordinates of the plane.",
    val_tex.unwrap_or_else(|| ev.result_text())
  );
  let graph = graph_explanations(expr_txt, &mut diagnostics);
  let result_latex = block(result_tex);
  Ok(EvaluateResponse {
    result: ev.result_text(),
    value: ev.value,
    resultado_latex: result_latex.clone(),
    result_latex,
    result_numeric: ev.value,
    steps,
    narrative: Narrative {
      title: "Evaluation at a point".into(),
      summary: explanation.clone(),
      explanation,
      explanation_detailed: Some(explanation_detailed),
    },
    graph,
    diagnostics,
  })
}

// ─── Double integral ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DefiniteIntegralResponse {
  #[serde(rename = "type")]
  pub kind: &'static str,
  pub integral: String,
  pub approx: f64,
  /// "symbolic" or "numeric"
  pub method: &'static str,
  pub integral_latex: Option<String>,
  pub definite_symbolic_latex: Option<String>,
  pub expression_latex: Option<String>,
  pub steps: Vec<Step>,
  #[serde(flatten)]
  pub narrative: Narrative,
  #[serde(flatten)]
  pub graph: GraphNarrative,
  pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndefiniteIntegralResponse {
  #[serde(rename = "type")]
  pub kind: &'static str,
  pub inner_integral: String,
  pub double_integral: String,
  pub expression_latex: Option<String>,
  pub inner_integral_latex: Option<String>,
  pub double_integral_latex: Option<String>,
  pub double_integral_symbolic_latex: Option<String>,
  pub steps: Vec<Step>,
  #[serde(flatten)]
  pub narrative: Narrative,
  #[serde(flatten)]
  pub graph: GraphNarrative,
  pub diagnostics: Diagnostics,
}

fn rect_limits(
  xlim: (&Value, &Value),
  ylim: (&Value, &Value),
) -> Result<RectLimits, ValidationError> {
  Ok(RectLimits {
    ax: validate_numeric(xlim.0, "xlim[0]")?,
    bx: validate_numeric(xlim.1, "xlim[1]")?,
    ay: validate_numeric(ylim.0, "ylim[0]")?,
    by: validate_numeric(ylim.1, "ylim[1]")?,
  })
}

/// Definite when both `xlim` and `ylim` are two-element arrays, otherwise
/// indefinite.
pub fn double_integral(
  fields: &Map<String, Value>,
  max_len: usize,
) -> Result<Value, ApiError> {
  let func_value = field_or(fields, "function", "expression")
    .filter(|v| truthy(v))
    .ok_or_else(|| {
      ApiError::MissingField("Missing field: function/expression".into())
    })?;
  let expr_txt = validate_expression(func_value, max_len)?;
  let xlim = pair(field_or(fields, "xlim", "x_limits"));
  let ylim = pair(field_or(fields, "ylim", "y_limits"));
  let limits = match (xlim, ylim) {
    (Some(xl), Some(yl)) => Some(rect_limits(xl, yl)?),
    _ => None,
  };
  info!(
    path = "/double-integral",
    expression = expr_txt,
    definite = limits.is_some(),
    "payload accepted"
  );

  let mut diagnostics = Diagnostics::default();
  match operations::double_integral(expr_txt, limits)? {
    DoubleIntegral::Definite {
      function,
      limits,
      value,
      approx,
      numeric,
      ..
    } => {
      let f_tex = tex(&mut diagnostics, &function);
      let integral_tex = tex(&mut diagnostics, &value);
      let bounds = [&limits.ax, &limits.bx, &limits.ay, &limits.by]
        .map(|b| tex(&mut diagnostics, b));
      let (inner_tex, outer_tex, symbolic_tex) = match (&f_tex, &bounds) {
        (Some(f), [Some(ax), Some(bx), Some(ay), Some(by)]) => (
          Some(format!("\\int_{{{ay}}}^{{{by}}} {f} \\, dy")),
          Some(format!(
            "\\int_{{{ax}}}^{{{bx}}} \\left( \\int_{{{ay}}}^{{{by}}} {f} \\, dy \\right) \\, dx"
          )),
          Some(format!(
            "\\int_{{{ax}}}^{{{bx}}} \\int_{{{ay}}}^{{{by}}} {f} \\, dy \\, dx"
          )),
        ),
        _ => (None, None, None),
      };
      let last_step = if numeric {
        "No closed form was found; the value was approximated numerically."
      } else {
        "Simplify and, where applicable, evaluate numerically."
      };
      let steps = vec![
        function_step(&f_tex, "Identify the function f(x,y)."),
        Step::new(
          "Integrate with respect to y over the given interval.",
          block(inner_tex),
        ),
        Step::new(
          "Integrate the result with respect to x over the given interval.",
          block(outer_tex),
        ),
        Step::new(last_step, block(integral_tex.clone())),
      ];
      let graph = graph_explanations(expr_txt, &mut diagnostics);
      to_json(DefiniteIntegralResponse {
        kind: "definite",
        integral: value.to_string(),
        approx,
        method: if numeric { "numeric" } else { "symbolic" },
        integral_latex: block(integral_tex),
        definite_symbolic_latex: block(symbolic_tex),
        expression_latex: block(f_tex),
        steps,
        narrative: Narrative {
          title: "Definite double integral".into(),
          summary: "The definite double integral computes the volume under \
            z = f(x,y) over the given region, integrating first in y and then in x."
            .into(),
          explanation: "The definite double integral computes the volume under \
            z = f(x,y) over the given rectangle; first in y and then in x."
            .into(),
          explanation_detailed: Some(
            "In a definite double integral the inner integral (here with respect \
             to y) is evaluated first, giving a function of x. That function is \
             then integrated with respect to x and the limits are applied. The \
             result is the volume under the surface z = f(x,y) over the \
             rectangular region."
              .into(),
          ),
        },
        graph,
        diagnostics,
      })
    }
    DoubleIntegral::Indefinite {
      function,
      inner,
      outer,
    } => {
      let f_tex = tex(&mut diagnostics, &function);
      let inner_tex = tex(&mut diagnostics, &inner);
      let outer_tex = tex(&mut diagnostics, &outer);
      let inner_with_symbol = match (&f_tex, &inner_tex) {
        (Some(f), Some(i)) => Some(format!("\\int {f} \\, dy = {i}")),
        _ => None,
      };
      let outer_with_symbol = match (&inner_tex, &outer_tex) {
        (Some(i), Some(o)) => {
          Some(format!("\\int \\left({i}\\right) \\, dx = {o}"))
        }
        _ => None,
      };
      let double_symbolic = match (&f_tex, &outer_tex) {
        (Some(f), Some(o)) => Some(format!("\\iint {f} \\, dy \\, dx = {o}")),
        _ => None,
      };
      let steps = vec![
        function_step(&f_tex, "Identify the function f(x,y)."),
        Step::new(
          "Antiderivative with respect to y.",
          block(inner_with_symbol.clone()),
        ),
        Step::new(
          "Antiderivative of the result with respect to x.",
          block(outer_with_symbol.clone()),
        ),
        Step::text("Without limits, the result is a family of antiderivatives."),
      ];
      let graph = graph_explanations(expr_txt, &mut diagnostics);
      to_json(IndefiniteIntegralResponse {
        kind: "indefinite",
        inner_integral: inner.to_string(),
        double_integral: outer.to_string(),
        expression_latex: block(f_tex),
        inner_integral_latex: block(inner_with_symbol),
        double_integral_latex: block(outer_with_symbol),
        double_integral_symbolic_latex: block(double_symbolic),
        steps,
        narrative: Narrative {
          title: "Indefinite double integral".into(),
          summary: "The indefinite double integral is an iterated antiderivative: \
            first with respect to y and then with respect to x."
            .into(),
          explanation: "The indefinite double integral is an iterated \
            antiderivative of f(x,y): first with respect to y, then with respect to x."
            .into(),
          explanation_detailed: Some(
            "Without limits the result is a family of antiderivatives. We first \
             integrate with respect to one variable while holding the other \
             constant, and then with respect to the second. The process describes \
             how f accumulates over the plane."
              .into(),
          ),
        },
        graph,
        diagnostics,
      })
    }
  }
}

// ─── Lagrange ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct LagrangePointJson {
  pub x: f64,
  pub y: f64,
  pub lambda: f64,
  pub f: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LagrangeResponse {
  pub result: String,
  pub resultado_latex: Option<String>,
  pub critical_points: Vec<LagrangePointJson>,
  pub steps: Vec<Step>,
  #[serde(flatten)]
  pub narrative: Narrative,
  #[serde(flatten)]
  pub graph: GraphNarrative,
  pub diagnostics: Diagnostics,
}

/// `[(x=.., y=.., λ=..), ..]`, or `None` if any coordinate has no LaTeX.
fn solution_set_latex(
  points: &[LagrangePoint],
  diagnostics: &mut Diagnostics,
) -> Option<String> {
  let point_tex: Option<Vec<String>> = points
    .iter()
    .map(|p| {
      let x = tex(diagnostics, &p.x)?;
      let y = tex(diagnostics, &p.y)?;
      let l = tex(diagnostics, &p.lambda)?;
      Some(format!("\\left(x={x},\\; y={y},\\; \\lambda={l}\\right)"))
    })
    .collect();
  point_tex.map(|pts| format!("[{}]", pts.join(", ")))
}

pub fn lagrange(
  fields: &Map<String, Value>,
  max_len: usize,
) -> Result<LagrangeResponse, ApiError> {
  let (Some(expr_value), Some(constraint_value)) =
    (fields.get("expression"), fields.get("constraint"))
  else {
    return Err(ApiError::MissingField(
      "Missing fields: expression, constraint".into(),
    ));
  };
  let expr_txt = validate_expression(expr_value, max_len)?;
  let constraint_txt = validate_expression(constraint_value, max_len)?;
  info!(
    path = "/lagrange",
    expression = expr_txt,
    constraint = constraint_txt,
    "payload accepted"
  );

  let sol = operations::lagrange(expr_txt, constraint_txt)?;
  let result = sol.result_text();

  let mut diagnostics = Diagnostics::default();
  let resultado_latex = solution_set_latex(&sol.points, &mut diagnostics);

  let l_tex = tex(&mut diagnostics, &sol.lagrangian);
  let derivs = [&sol.lx, &sol.ly, &sol.llambda].map(|e| tex(&mut diagnostics, e));
  let system_tex = match &derivs {
    [Some(lx), Some(ly), Some(ll)] => Some(format!(
      "\\frac{{\\partial L}}{{\\partial x}}={lx}=0, \\quad \
       \\frac{{\\partial L}}{{\\partial y}}={ly}=0, \\quad \
       \\frac{{\\partial L}}{{\\partial \\lambda}}={ll}=0"
    )),
    _ => None,
  };
  let steps = vec![
    Step::new(
      "Form the Lagrange function:",
      l_tex.map(|t| block_tex(&format!("L(x,y,\\lambda)={t}"))),
    ),
    Step::new(
      "Compute the partial derivatives and set them to zero:",
      block(system_tex),
    ),
    Step::new(
      "Solution of the system:",
      block(resultado_latex.clone()),
    ),
  ];

  let f_tex = tex(&mut diagnostics, &sol.function);
  let g_tex = tex(&mut diagnostics, &sol.constraint);
  let summary = format!(
    "$$f(x,y)={}$$ subject to $$g(x,y)={}=0$$",
    f_tex.unwrap_or_else(|| sol.function.to_string()),
    g_tex.unwrap_or_else(|| sol.constraint.to_string())
  );
  let graph = graph_explanations(expr_txt, &mut diagnostics);
  let critical_points = sol
    .points
    .iter()
    .map(|p| LagrangePointJson {
      x: p.x_value,
      y: p.y_value,
      lambda: p.lambda_value,
      f: p.f_value,
    })
    .collect();
  Ok(LagrangeResponse {
    result,
    resultado_latex: block(resultado_latex),
    critical_points,
    steps,
    narrative: Narrative {
      title: "Constrained optimization (Lagrange multipliers)".into(),
      summary,
      explanation: "Lagrange multipliers find maxima or minima of f under a \
        constraint. The points found satisfy the Lagrangian conditions and g = 0 \
        simultaneously."
        .into(),
      explanation_detailed: Some(
        "The method introduces a variable λ to impose the constraint g(x,y)=0. We \
         build L=f+λg and solve ∂L/∂x=0, ∂L/∂y=0 together with g=0. The points \
         obtained are candidates for constrained extrema; to classify them, \
         evaluate f and check any further conditions of the problem."
          .into(),
      ),
    },
    graph,
    diagnostics,
  })
}

// ─── Optimize ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CriticalPointJson {
  pub x: f64,
  pub y: f64,
  pub f: f64,
  pub classification: &'static str,
  pub color: &'static str,
  pub determinant: f64,
  pub fxx: f64,
  pub fyy: f64,
  pub fxy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResponse {
  pub gradient_latex: Option<String>,
  pub critical_points: Vec<CriticalPointJson>,
  pub steps: Vec<Step>,
  #[serde(flatten)]
  pub narrative: Narrative,
  #[serde(flatten)]
  pub graph: GraphNarrative,
  pub diagnostics: Diagnostics,
}

pub fn optimize(
  fields: &Map<String, Value>,
  max_len: usize,
) -> Result<OptimizeResponse, ApiError> {
  let expr_txt = expression_field(fields, max_len)?;
  info!(path = "/optimize", expression = expr_txt, "payload accepted");
  let opt = operations::optimize(expr_txt)?;

  let mut diagnostics = Diagnostics::default();
  let gradient_latex = match (
    tex(&mut diagnostics, &opt.fx),
    tex(&mut diagnostics, &opt.fy),
  ) {
    (Some(fx), Some(fy)) => {
      Some(format!("\\nabla f = \\left( {fx},\\; {fy} \\right)"))
    }
    _ => None,
  };
  let steps = vec![
    Step::new(
      "Compute the gradient and solve ∇f = 0 for critical points.",
      Some(block_tex("\\nabla f = 0")),
    ),
    Step::new(
      "Build the Hessian matrix at each critical point.",
      Some(block_tex(
        "H = \\begin{pmatrix} f_{xx} & f_{xy} \\\\ f_{yx} & f_{yy} \\end{pmatrix}",
      )),
    ),
    Step::new(
      "Evaluate D = f_{xx}f_{yy} - f_{xy}^2 and the sign of f_{xx}.",
      Some(block_tex("D = f_{xx}f_{yy} - f_{xy}^2")),
    ),
    Step::text("Classify: local minimum, local maximum or saddle point."),
  ];
  let graph = graph_explanations(expr_txt, &mut diagnostics);
  let critical_points = opt
    .points
    .iter()
    .map(|p| CriticalPointJson {
      x: p.x,
      y: p.y,
      f: p.f,
      classification: p.classification.label(),
      color: p.classification.color(),
      determinant: p.determinant,
      fxx: p.fxx,
      fyy: p.fyy,
      fxy: p.fxy,
    })
    .collect();
  Ok(OptimizeResponse {
    gradient_latex,
    critical_points,
    steps,
    narrative: Narrative {
      title: "Unconstrained optimization".into(),
      summary: "Critical points are found from ∇f = 0 and each point is \
        classified with the Hessian."
        .into(),
      explanation: "The system ∇f = 0 is solved to find critical points. Then the \
        Hessian H and the determinant D = f_{xx} f_{yy} - (f_{xy})^2 are computed. \
        If D > 0 and f_{xx} > 0 there is a local minimum; if D > 0 and f_{xx} < 0 \
        a local maximum; if D < 0 a saddle point; if D = 0 the test is inconclusive."
        .into(),
      explanation_detailed: None,
    },
    graph,
    diagnostics,
  })
}

// ─── Domain / range / limit ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DomainResponse {
  pub domain_conditions: String,
  pub range_estimated: Option<[f64; 2]>,
  pub limit_value: Option<String>,
  pub steps: Vec<Step>,
  #[serde(flatten)]
  pub narrative: Narrative,
  #[serde(flatten)]
  pub graph: GraphNarrative,
  pub diagnostics: Diagnostics,
}

const NO_RESTRICTIONS: &str =
  "No additional restrictions (possibly continuous on \\(\\mathbb{R}^2\\)).";

pub fn analyze_domain(
  fields: &Map<String, Value>,
  max_len: usize,
) -> Result<DomainResponse, ApiError> {
  let expr_txt = expression_field(fields, max_len)?;
  let x0 = non_null(fields, "x0")
    .map(|v| validate_numeric(v, "x0"))
    .transpose()?;
  let y0 = non_null(fields, "y0")
    .map(|v| validate_numeric(v, "y0"))
    .transpose()?;
  info!(path = "/analyze_domain", expression = expr_txt, "payload accepted");

  let point = match (&x0, &y0) {
    (Some(x), Some(y)) => try_eval_to_f64(x).zip(try_eval_to_f64(y)),
    _ => None,
  };
  let analysis = operations::analyze_domain(expr_txt, point)?;

  let mut diagnostics = Diagnostics::default();
  let mut conditions = Vec::new();
  if let Some(den) = &analysis.denominator {
    if let Some(t) = tex(&mut diagnostics, den) {
      conditions.push(format!("denominator {} ≠ 0", inline_tex(&format!(" {t} "))));
    }
  }
  for arg in &analysis.log_arguments {
    if let Some(t) = tex(&mut diagnostics, arg) {
      conditions.push(inline_tex(&format!(" {t} > 0 ")));
    }
  }
  for arg in &analysis.sqrt_arguments {
    if let Some(t) = tex(&mut diagnostics, arg) {
      conditions.push(inline_tex(&format!(" {t} \\ge 0 ")));
    }
  }
  let domain_conditions = if conditions.is_empty() {
    NO_RESTRICTIONS.to_string()
  } else {
    conditions.join(", ")
  };

  let f_tex = tex(&mut diagnostics, &analysis.function);
  let limit_latex = match (&x0, &y0) {
    (Some(x), Some(y)) => {
      match (tex(&mut diagnostics, x), tex(&mut diagnostics, y)) {
        (Some(xt), Some(yt)) => Some(block_tex(&format!(
          "\\lim_{{(x,y)\\to ({xt}, {yt})}} f(x,y)"
        ))),
        _ => None,
      }
    }
    _ => None,
  };
  let steps = vec![
    function_step(&f_tex, "Identify the function f(x,y)."),
    Step::text(
      "Analyze the domain conditions (division by zero, log > 0, sqrt ≥ 0).",
    ),
    Step::text("Estimate the range by evaluating the function over a grid."),
    Step::new(
      "Compute the limit at (x0,y0) if a point was given.",
      limit_latex,
    ),
  ];
  let explanation = "The conditions for existence (domain) are analyzed, the range \
    is estimated and the limit is evaluated if a point is given.";
  let graph = graph_explanations(expr_txt, &mut diagnostics);
  Ok(DomainResponse {
    domain_conditions,
    range_estimated: analysis.range.map(|(lo, hi)| [lo, hi]),
    limit_value: analysis.limit.map(|l| l.to_string()),
    steps,
    narrative: Narrative {
      title: "Domain and limit analysis".into(),
      summary: explanation.into(),
      explanation: explanation.into(),
      explanation_detailed: None,
    },
    graph,
    diagnostics,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn python_style_truthiness() {
    assert!(!truthy(&json!(null)));
    assert!(!truthy(&json!("")));
    assert!(!truthy(&json!(0)));
    assert!(!truthy(&json!([])));
    assert!(truthy(&json!("x")));
    assert!(truthy(&json!(2.5)));
  }

  #[test]
  fn alias_falls_back_on_falsy_primary() {
    let fields = json!({"expression": "", "func": "x*y"});
    let fields = fields.as_object().unwrap();
    assert_eq!(field_or(fields, "expression", "func"), Some(&json!("x*y")));
    let fields = json!({"function": "x"});
    let fields = fields.as_object().unwrap();
    assert_eq!(field_or(fields, "function", "expression"), Some(&json!("x")));
    assert_eq!(field_or(fields, "xlim", "x_limits"), None);
  }

  #[test]
  fn limits_must_be_pairs() {
    assert!(pair(Some(&json!([0, 1]))).is_some());
    assert!(pair(Some(&json!([0, 1, 2]))).is_none());
    assert!(pair(Some(&json!("0,1"))).is_none());
    assert!(pair(None).is_none());
  }

  #[test]
  fn solution_set_without_latex_is_null() {
    let point = |x: Expr| LagrangePoint {
      x,
      y: Expr::Integer(1),
      lambda: Expr::Rational(-1, 2),
      x_value: 1.0,
      y_value: 1.0,
      lambda_value: -0.5,
      f_value: Some(2.0),
    };
    let mut diagnostics = Diagnostics::default();
    let latex = solution_set_latex(&[point(Expr::Integer(1))], &mut diagnostics);
    assert_eq!(
      latex.as_deref(),
      Some("[\\left(x=1,\\; y=1,\\; \\lambda=- \\frac{1}{2}\\right)]")
    );
    let latex = solution_set_latex(&[point(Expr::Real(f64::NAN))], &mut diagnostics);
    assert_eq!(latex, None);
    assert_eq!(block(latex), None);
  }
}
