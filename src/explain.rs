//! Didactic presentation: LaTeX delimiters, step lists, prose selected by
//! the shape of the function, and the diagnostics collected while
//! enriching a response.

use serde::Serialize;
use tracing::warn;

use crate::functions::latex::to_latex;
use crate::parse_expression;
use crate::CalcError;

/// Wrap markup in display-mode delimiters unless it already has some.
pub fn block_tex(tex: &str) -> String {
  let t = tex.trim();
  if (t.starts_with("$$") && t.ends_with("$$"))
    || (t.starts_with("\\(") && t.ends_with("\\)"))
  {
    return tex.to_string();
  }
  format!("$$ {tex} $$")
}

/// Wrap markup in inline delimiters unless it already has some.
pub fn inline_tex(tex: &str) -> String {
  let t = tex.trim();
  if (t.starts_with("\\(") && t.ends_with("\\)"))
    || (t.starts_with("$$") && t.ends_with("$$"))
  {
    return tex.to_string();
  }
  format!("\\({tex}\\)")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
  pub description: String,
  pub latex: Option<String>,
}

impl Step {
  pub fn new(description: impl Into<String>, latex: Option<String>) -> Self {
    Step {
      description: description.into(),
      latex,
    }
  }

  pub fn text(description: impl Into<String>) -> Self {
    Step::new(description, None)
  }
}

/// Enrichment failures that did not stop the request.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<String>);

impl Diagnostics {
  /// Keep the value of `result`, or log and record its error under `stage`.
  pub fn record<T>(
    &mut self,
    stage: &str,
    result: Result<T, CalcError>,
  ) -> Option<T> {
    match result {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(stage, error = %e, "enrichment step failed");
        self.0.push(format!("{stage}: {e}"));
        None
      }
    }
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn messages(&self) -> &[String] {
    &self.0
  }
}

/// Coarse shape of a surface, read off the printed expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
  Trigonometric,
  Exponential,
  Logarithmic,
  Radical,
  Quadratic,
  Generic,
}

impl SurfaceKind {
  /// First match wins: a composite like `sin(exp(x))` is trigonometric.
  pub fn classify(text: &str) -> Self {
    const TRIG: [&str; 6] = ["sin", "cos", "tan", "cot", "csc", "sec"];
    if TRIG.iter().any(|t| text.contains(t)) {
      SurfaceKind::Trigonometric
    } else if text.contains("exp") || text.contains("E**") {
      SurfaceKind::Exponential
    } else if text.contains("log") || text.contains("ln") {
      SurfaceKind::Logarithmic
    } else if text.contains("sqrt") {
      SurfaceKind::Radical
    } else if text.contains("^2") || text.contains("**2") {
      SurfaceKind::Quadratic
    } else {
      SurfaceKind::Generic
    }
  }

  /// The longer narrative uses a coarser order of its own.
  pub fn classify_detailed(text: &str) -> Self {
    if text.contains("sin") || text.contains("cos") {
      SurfaceKind::Trigonometric
    } else if text.contains("exp") {
      SurfaceKind::Exponential
    } else if text.contains("sqrt") {
      SurfaceKind::Radical
    } else if text.contains("log") || text.contains("ln") {
      SurfaceKind::Logarithmic
    } else {
      SurfaceKind::Generic
    }
  }

  pub fn brief(self) -> &'static str {
    match self {
      SurfaceKind::Trigonometric => {
        "The graph is a wavy surface typical of trigonometric functions. \
         Crests and valleys repeat periodically across the plane, where the \
         values oscillate between positive and negative."
      }
      SurfaceKind::Exponential => {
        "The surface grows exponentially as x and y increase. \
         The largest values concentrate in the positive region of the plane."
      }
      SurfaceKind::Logarithmic => {
        "The surface grows logarithmically. \
         Near the origin the values are lower and they increase slowly as x \
         and y grow."
      }
      SurfaceKind::Radical => {
        "The graph shows a cone- or bowl-like surface. \
         The square root smooths out changes and produces a radially \
         symmetric shape around the origin."
      }
      SurfaceKind::Quadratic => {
        "The quadratic function produces a parabolic surface. \
         Values rise quickly with x and y, forming a symmetric bowl centered \
         at the origin."
      }
      SurfaceKind::Generic => {
        "The surface shows the general behaviour of the function over the \
         xy plane. The largest values appear where x and y are larger."
      }
    }
  }

  pub fn detailed(self) -> &'static str {
    match self {
      SurfaceKind::Trigonometric => {
        "Trigonometric functions such as sine and cosine model oscillations. \
         In three-dimensional space they produce wavy surfaces. Each crest \
         and valley marks where the function reaches its largest and \
         smallest values. These functions describe periodic phenomena such \
         as waves and vibrations."
      }
      SurfaceKind::Exponential => {
        "Exponential functions show accelerated growth. Over the xy plane \
         the values increase quickly when x and y are positive. Such \
         surfaces appear in growth and decay models in physics and biology."
      }
      SurfaceKind::Radical => {
        "The square root produces a smooth surface that grows radially. The \
         value increases away from the origin, but with a decreasing slope. \
         Functions like this are associated with distances or magnitudes \
         with circular symmetry."
      }
      SurfaceKind::Logarithmic => {
        "Logarithmic functions increase slowly and stay non-negative for \
         inputs of at least one. Their graph rises gradually, as in \
         perceptual scales and saturation phenomena."
      }
      SurfaceKind::Quadratic | SurfaceKind::Generic => {
        "The given function produces a general surface in three-dimensional \
         space. Its shape depends on the powers and combinations of x and y. \
         Studying such surfaces lets us analyze slopes and local maxima and \
         minima."
      }
    }
  }
}

const FALLBACK_BRIEF: &str = "The surface is plotted as z = f(x,y).";
const FALLBACK_DETAILED: &str =
  "Explore the graph: rotate and zoom to study slopes and local variations.";

/// Typeset function and the two graph narratives shared by every
/// operation response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNarrative {
  pub func_latex: Option<String>,
  pub graph_explanation: String,
  pub graph_explanation_detailed: String,
}

pub fn graph_explanations(
  expr_txt: &str,
  diagnostics: &mut Diagnostics,
) -> GraphNarrative {
  let parsed = diagnostics.record("graph", parse_expression(expr_txt));
  let Some(expr) = parsed else {
    return GraphNarrative {
      func_latex: None,
      graph_explanation: FALLBACK_BRIEF.to_string(),
      graph_explanation_detailed: FALLBACK_DETAILED.to_string(),
    };
  };
  let text = expr.to_string();
  GraphNarrative {
    func_latex: diagnostics
      .record("func_latex", to_latex(&expr))
      .map(|t| block_tex(&t)),
    graph_explanation: SurfaceKind::classify(&text).brief().to_string(),
    graph_explanation_detailed: SurfaceKind::classify_detailed(&text)
      .detailed()
      .to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tex_wrapping() {
    assert_eq!(block_tex("x^{2}"), "$$ x^{2} $$");
    assert_eq!(block_tex("$$ x $$"), "$$ x $$");
    assert_eq!(block_tex("\\(x\\)"), "\\(x\\)");
    assert_eq!(inline_tex("x"), "\\(x\\)");
    assert_eq!(inline_tex("$$x$$"), "$$x$$");
  }

  #[test]
  fn first_matching_category_wins() {
    assert_eq!(SurfaceKind::classify("sin(exp(x))"), SurfaceKind::Trigonometric);
    assert_eq!(SurfaceKind::classify("exp(x*y)"), SurfaceKind::Exponential);
    assert_eq!(SurfaceKind::classify("log(x**2 + 1)"), SurfaceKind::Logarithmic);
    assert_eq!(SurfaceKind::classify("sqrt(x**2 + y**2)"), SurfaceKind::Radical);
    assert_eq!(SurfaceKind::classify("x**2 + y**2"), SurfaceKind::Quadratic);
    assert_eq!(SurfaceKind::classify("x*y"), SurfaceKind::Generic);
  }

  #[test]
  fn detailed_order_differs() {
    // tan alone is not trigonometric for the longer narrative
    assert_eq!(SurfaceKind::classify_detailed("tan(x)"), SurfaceKind::Generic);
    assert_eq!(
      SurfaceKind::classify_detailed("sqrt(log(x))"),
      SurfaceKind::Radical
    );
  }

  #[test]
  fn unparsable_expression_falls_back() {
    let mut diagnostics = Diagnostics::default();
    let narrative = graph_explanations("sin(x", &mut diagnostics);
    assert_eq!(narrative.func_latex, None);
    assert_eq!(narrative.graph_explanation, FALLBACK_BRIEF);
    assert_eq!(diagnostics.messages().len(), 1);
    assert!(diagnostics.messages()[0].starts_with("graph: "));
  }

  #[test]
  fn narrative_for_paraboloid() {
    let mut diagnostics = Diagnostics::default();
    let narrative = graph_explanations("x**2 + y**2", &mut diagnostics);
    assert_eq!(narrative.func_latex.as_deref(), Some("$$ x^{2} + y^{2} $$"));
    assert_eq!(narrative.graph_explanation, SurfaceKind::Quadratic.brief());
    assert!(diagnostics.is_empty());
  }
}
