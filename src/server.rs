//! HTTP surface: axum router, error responses and the serve loop.

use std::any::Any;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::handlers::{dispatch, ApiError, Operation};

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = StatusCode::from_u16(self.status())
      .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, self.to_string())
  }
}

fn error_response(status: StatusCode, message: String) -> Response {
  (status, Json(json!({ "error": message }))).into_response()
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
  let detail = if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else if let Some(s) = panic.downcast_ref::<&str>() {
    s.to_string()
  } else {
    "internal failure".to_string()
  };
  error!(%detail, "handler panicked");
  error_response(
    StatusCode::INTERNAL_SERVER_ERROR,
    format!("Unexpected error: {detail}"),
  )
}

fn build_cors_layer() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(AllowOrigin::any())
    .allow_methods([Method::GET, Method::POST])
    .allow_headers([header::CONTENT_TYPE])
}

/// Bytes that do not decode to JSON become `null`, which every operation
/// reads as a body with no fields.
fn decode_body(body: &Bytes) -> Value {
  serde_json::from_slice(body).unwrap_or(Value::Null)
}

fn run(op: Operation, config: &ServerConfig, body: Bytes) -> Response {
  match dispatch(op, &decode_body(&body), config) {
    Ok(value) => (StatusCode::OK, Json(value)).into_response(),
    Err(e) => e.into_response(),
  }
}

async fn partials(State(config): State<Arc<ServerConfig>>, body: Bytes) -> Response {
  run(Operation::Partials, &config, body)
}

async fn gradient(State(config): State<Arc<ServerConfig>>, body: Bytes) -> Response {
  run(Operation::Gradient, &config, body)
}

async fn evaluate(State(config): State<Arc<ServerConfig>>, body: Bytes) -> Response {
  run(Operation::Evaluate, &config, body)
}

async fn double_integral(
  State(config): State<Arc<ServerConfig>>,
  body: Bytes,
) -> Response {
  run(Operation::DoubleIntegral, &config, body)
}

async fn lagrange(State(config): State<Arc<ServerConfig>>, body: Bytes) -> Response {
  run(Operation::Lagrange, &config, body)
}

async fn optimize(State(config): State<Arc<ServerConfig>>, body: Bytes) -> Response {
  run(Operation::Optimize, &config, body)
}

async fn analyze_domain(
  State(config): State<Arc<ServerConfig>>,
  body: Bytes,
) -> Response {
  run(Operation::AnalyzeDomain, &config, body)
}

async fn home() -> Json<Value> {
  let mut endpoints = Map::new();
  endpoints.insert("GET /ping".into(), json!("Health check"));
  endpoints.insert("GET /info".into(), json!("Available operations"));
  for op in Operation::ALL {
    endpoints.insert(format!("POST {}", op.path()), json!(op.description()));
  }
  Json(json!({
    "message": "Welcome to the Multivariable Calculus API",
    "endpoints": endpoints,
  }))
}

async fn ping() -> Json<Value> {
  Json(json!({ "status": "ok" }))
}

async fn info_catalog() -> Json<Value> {
  let operations: Vec<Value> = Operation::ALL
    .iter()
    .map(|op| {
      json!({
        "path": op.path(),
        "method": "POST",
        "description": op.description(),
        "body": op.body_shape(),
      })
    })
    .collect();
  Json(json!({ "operations": operations }))
}

pub fn app(config: Arc<ServerConfig>) -> Router {
  let body_limit = config.max_body_bytes;
  Router::new()
    .route("/", get(home))
    .route("/ping", get(ping))
    .route("/info", get(info_catalog))
    .route("/partials", post(partials))
    .route("/gradient", post(gradient))
    .route("/evaluate", post(evaluate))
    .route("/double-integral", post(double_integral))
    .route("/lagrange", post(lagrange))
    .route("/optimize", post(optimize))
    .route("/analyze_domain", post(analyze_domain))
    .layer(CatchPanicLayer::custom(panic_response))
    .layer(TraceLayer::new_for_http())
    .layer(build_cors_layer())
    .layer(RequestBodyLimitLayer::new(body_limit))
    .with_state(config)
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
  let addr = config.addr();
  let listener = tokio::net::TcpListener::bind(&addr).await?;
  info!(%addr, "multivariable calculus service ready");
  axum::serve(listener, app(Arc::new(config))).await?;
  Ok(())
}
