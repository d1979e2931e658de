use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use multivar::config::ServerConfig;
use multivar::server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
  app(Arc::new(ServerConfig::default()))
}

async fn get(uri: &str) -> (StatusCode, Value) {
  let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
  send(test_app(), request).await
}

async fn post_raw(uri: &str, body: &str) -> (StatusCode, Value) {
  let request = Request::builder()
    .method("POST")
    .uri(uri)
    .header("content-type", "application/json")
    .body(Body::from(body.to_string()))
    .unwrap();
  send(test_app(), request).await
}

async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
  post_raw(uri, &body.to_string()).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
  let response = app.oneshot(request).await.unwrap();
  let status = response.status();
  let body = response.into_body().collect().await.unwrap().to_bytes();
  (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

mod service {
  use super::*;

  #[tokio::test]
  async fn ping() {
    let (status, json) = get("/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "ok"}));
  }

  #[tokio::test]
  async fn home_lists_endpoints() {
    let (status, json) = get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Welcome to the Multivariable Calculus API");
    assert!(json["endpoints"]["POST /lagrange"].is_string());
  }

  #[tokio::test]
  async fn info_catalogs_every_operation() {
    let (status, json) = get("/info").await;
    assert_eq!(status, StatusCode::OK);
    let ops = json["operations"].as_array().unwrap();
    assert_eq!(ops.len(), 7);
    let paths: Vec<&str> = ops.iter().map(|o| o["path"].as_str().unwrap()).collect();
    assert!(paths.contains(&"/analyze_domain"));
    assert!(paths.contains(&"/double-integral"));
    assert!(ops.iter().all(|o| o["method"] == "POST"));
  }

  #[tokio::test]
  async fn unknown_route() {
    let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn cors_allows_any_origin() {
    let request = Request::builder()
      .uri("/ping")
      .header("origin", "http://example.com")
      .body(Body::empty())
      .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(
      response.headers()["access-control-allow-origin"],
      "*"
    );
  }

  #[tokio::test]
  async fn oversized_body_is_rejected() {
    let config = ServerConfig {
      max_body_bytes: 64,
      ..ServerConfig::default()
    };
    let body = json!({"expression": "x".repeat(200)}).to_string();
    let request = Request::builder()
      .method("POST")
      .uri("/partials")
      .header("content-type", "application/json")
      .header("content-length", body.len())
      .body(Body::from(body))
      .unwrap();
    let response = app(Arc::new(config)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
  }
}

mod validation {
  use super::*;

  #[tokio::test]
  async fn missing_expression() {
    let (status, json) = post("/partials", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({"error": "Missing field: expression"}));
  }

  #[tokio::test]
  async fn body_that_is_not_an_object() {
    let (status, json) = post_raw("/gradient", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing field: expression");

    let (status, _) = post("/optimize", json!([1, 2])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn forbidden_tokens() {
    let (status, json) =
      post("/partials", json!({"expression": "__import__('os')"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Expression contains forbidden tokens");
  }

  #[tokio::test]
  async fn unknown_token() {
    let (status, json) = post("/gradient", json!({"expression": "x + foo"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Unknown token: foo");
  }

  #[tokio::test]
  async fn non_string_expression() {
    let (_, json) = post("/optimize", json!({"expression": 5})).await;
    assert_eq!(json["error"], "Expression must be a string");
  }

  #[tokio::test]
  async fn overlong_expression() {
    let (status, json) =
      post("/partials", json!({"expression": "x+".repeat(300)})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Expression is too long");
  }

  #[tokio::test]
  async fn malformed_expression_is_an_engine_error() {
    let (status, json) = post("/partials", json!({"expression": "sin(x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("Error: "));
  }
}

mod operations {
  use super::*;

  #[tokio::test]
  async fn partials() {
    let (status, json) = post("/partials", json!({"expression": "x*y"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "df/dx = y, df/dy = x");
    assert_eq!(
      json["resultado_latex"],
      "$$ \\frac{\\partial f}{\\partial x} = y, \\; \\frac{\\partial f}{\\partial y} = x $$"
    );
    assert_eq!(json["steps"].as_array().unwrap().len(), 4);
    assert_eq!(json["steps"][3]["latex"], Value::Null);
    assert_eq!(json["title"], "Partial derivatives");
    assert_eq!(json["summary"], json["explanation"]);
    assert_eq!(json["func_latex"], "$$ x y $$");
    assert_eq!(json["diagnostics"], json!([]));
  }

  #[tokio::test]
  async fn gradient() {
    let (status, json) =
      post("/gradient", json!({"expression": "x**2 + y**2"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "(2*x, 2*y)");
    assert_eq!(
      json["resultado_latex"],
      "$$ \\nabla f = \\left( 2 x, 2 y \\right) $$"
    );
    assert!(json["graph_explanation"].as_str().unwrap().contains("parabolic"));
  }

  #[tokio::test]
  async fn evaluate_with_func_alias() {
    let (status, json) =
      post("/evaluate", json!({"func": "x**2 + y**2", "x0": 3, "y0": 4})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "25");
    assert_eq!(json["value"], 25.0);
    assert_eq!(json["result_numeric"], 25.0);
    assert_eq!(json["result_latex"], "$$ f(3, 4) = 25 $$");
    assert_eq!(json["resultado_latex"], json["result_latex"]);
  }

  #[tokio::test]
  async fn evaluate_accepts_symbolic_coordinates() {
    let (status, json) =
      post("/evaluate", json!({"expression": "sin(x)", "x0": "pi/2", "y0": 0})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], 1.0);
  }

  #[tokio::test]
  async fn evaluate_rejects_bad_coordinates() {
    let (status, json) =
      post("/evaluate", json!({"expression": "x", "x0": "abc", "y0": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
      json["error"],
      "x0 must be numeric (supports pi, E and basic operations)"
    );

    let (_, json) = post("/evaluate", json!({"expression": "x", "x0": 1})).await;
    assert_eq!(json["error"], "Missing fields: func/expression, x0, y0");
  }

  #[tokio::test]
  async fn definite_double_integral() {
    let body = json!({"function": "1", "xlim": [0, 1], "ylim": [0, 1]});
    let (status, json) = post("/double-integral", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "definite");
    assert_eq!(json["integral"], "1");
    assert_eq!(json["approx"], 1.0);
    assert_eq!(json["method"], "symbolic");
    assert_eq!(
      json["definite_symbolic_latex"],
      "$$ \\int_{0}^{1} \\int_{0}^{1} 1 \\, dy \\, dx $$"
    );
    assert_eq!(json["title"], "Definite double integral");
  }

  #[tokio::test]
  async fn indefinite_double_integral_with_alias() {
    let (status, json) =
      post("/double-integral", json!({"expression": "x*y"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "indefinite");
    assert_eq!(json["inner_integral"], "x*y**2/2");
    assert_eq!(json["double_integral"], "x**2*y**2/4");
    assert_eq!(json["steps"][3]["latex"], Value::Null);
  }

  #[tokio::test]
  async fn single_limit_pair_means_indefinite() {
    let (_, json) =
      post("/double-integral", json!({"function": "x", "x_limits": [0, 1]})).await;
    assert_eq!(json["type"], "indefinite");
  }

  #[tokio::test]
  async fn double_integral_field_errors() {
    let (status, json) = post("/double-integral", json!({"function": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing field: function/expression");

    let body = json!({"function": "x", "xlim": ["a", 1], "ylim": [0, 1]});
    let (_, json) = post("/double-integral", body).await;
    assert_eq!(
      json["error"],
      "xlim[0] must be numeric (supports pi, E and basic operations)"
    );
  }

  #[tokio::test]
  async fn lagrange() {
    let body = json!({"expression": "x + y", "constraint": "x**2 + y**2 - 1"});
    let (status, json) = post("/lagrange", body).await;
    assert_eq!(status, StatusCode::OK);
    let points = json["critical_points"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    let f_max = points[1]["f"].as_f64().unwrap();
    assert!((f_max - std::f64::consts::SQRT_2).abs() < 1e-9);
    assert_eq!(json["steps"].as_array().unwrap().len(), 3);
    assert_eq!(
      json["title"],
      "Constrained optimization (Lagrange multipliers)"
    );
  }

  #[tokio::test]
  async fn lagrange_errors() {
    let (status, json) = post("/lagrange", json!({"expression": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing fields: expression, constraint");

    let body = json!({"expression": "x + y", "constraint": "x**2 + y**2 + 1"});
    let (status, json) = post("/lagrange", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Error: No critical points found");
  }

  #[tokio::test]
  async fn optimize() {
    let (status, json) =
      post("/optimize", json!({"expression": "x**2 + y**2"})).await;
    assert_eq!(status, StatusCode::OK);
    let point = &json["critical_points"][0];
    assert_eq!(point["classification"], "Local minimum");
    assert_eq!(point["color"], "green");
    assert_eq!(point["x"], 0.0);
    assert_eq!(
      json["gradient_latex"],
      "\\nabla f = \\left( 2 x,\\; 2 y \\right)"
    );
  }

  #[tokio::test]
  async fn optimize_without_critical_points() {
    let (status, json) = post("/optimize", json!({"expression": "x + y"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["critical_points"], json!([]));
  }

  #[tokio::test]
  async fn analyze_domain_conditions() {
    let (status, json) =
      post("/analyze_domain", json!({"expression": "log(x)/(x - y)"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      json["domain_conditions"],
      "denominator \\( x - y \\) ≠ 0, \\( x > 0 \\)"
    );
    assert_eq!(json["limit_value"], Value::Null);
    assert_eq!(json["steps"][3]["latex"], Value::Null);
  }

  #[tokio::test]
  async fn analyze_domain_with_point() {
    let body = json!({"expression": "x**2 + y**2", "x0": 1, "y0": 2});
    let (status, json) = post("/analyze_domain", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      json["domain_conditions"],
      "No additional restrictions (possibly continuous on \\(\\mathbb{R}^2\\))."
    );
    assert_eq!(json["limit_value"], "5.0");
    assert_eq!(
      json["steps"][3]["latex"],
      "$$ \\lim_{(x,y)\\to (1, 2)} f(x,y) $$"
    );
    assert_eq!(json["range_estimated"].as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn identical_requests_give_identical_responses() {
    let body = json!({"expression": "x**3 - 3*x + y**2"});
    let first = post("/optimize", body.clone()).await;
    let second = post("/optimize", body).await;
    assert_eq!(first, second);
  }
}
