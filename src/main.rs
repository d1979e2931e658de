use clap::{Parser, Subcommand};
use multivar::config::ServerConfig;
use multivar::handlers::{dispatch, Operation};
use multivar::server;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the HTTP service
  Serve {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Largest accepted request body
    #[arg(long)]
    max_body_bytes: Option<usize>,
    /// Longest accepted expression
    #[arg(long)]
    max_expression_len: Option<usize>,
  },
  /// Partial derivatives of f(x,y)
  Partials { expression: String },
  /// Gradient of f(x,y)
  Gradient { expression: String },
  /// Evaluate f(x,y) at a point
  Evaluate {
    expression: String,
    #[arg(allow_hyphen_values = true)]
    x0: String,
    #[arg(allow_hyphen_values = true)]
    y0: String,
  },
  /// Double integral, definite when both --xlim and --ylim are given
  Integrate {
    expression: String,
    #[arg(long, num_args = 2, allow_hyphen_values = true)]
    xlim: Option<Vec<String>>,
    #[arg(long, num_args = 2, allow_hyphen_values = true)]
    ylim: Option<Vec<String>>,
  },
  /// Extrema of f(x,y) subject to g(x,y) = 0
  Lagrange { expression: String, constraint: String },
  /// Critical points of f(x,y)
  Optimize { expression: String },
  /// Domain conditions, range estimate and an optional limit
  Domain {
    expression: String,
    #[arg(long, allow_hyphen_values = true)]
    x0: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    y0: Option<String>,
  },
}

fn init_tracing() {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "multivar=info,tower_http=info".into()),
    )
    .with_writer(std::io::stderr)
    .init();
}

/// The request body an HTTP client would send for a one-shot command.
fn request(command: Commands) -> Option<(Operation, Value)> {
  let pair = |v: Option<Vec<String>>| v.map(|items| json!(items));
  let request = match command {
    Commands::Serve { .. } => return None,
    Commands::Partials { expression } => {
      (Operation::Partials, json!({ "expression": expression }))
    }
    Commands::Gradient { expression } => {
      (Operation::Gradient, json!({ "expression": expression }))
    }
    Commands::Evaluate { expression, x0, y0 } => (
      Operation::Evaluate,
      json!({ "expression": expression, "x0": x0, "y0": y0 }),
    ),
    Commands::Integrate {
      expression,
      xlim,
      ylim,
    } => (
      Operation::DoubleIntegral,
      json!({ "function": expression, "xlim": pair(xlim), "ylim": pair(ylim) }),
    ),
    Commands::Lagrange {
      expression,
      constraint,
    } => (
      Operation::Lagrange,
      json!({ "expression": expression, "constraint": constraint }),
    ),
    Commands::Optimize { expression } => {
      (Operation::Optimize, json!({ "expression": expression }))
    }
    Commands::Domain { expression, x0, y0 } => (
      Operation::AnalyzeDomain,
      json!({ "expression": expression, "x0": x0, "y0": y0 }),
    ),
  };
  Some(request)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  init_tracing();
  let cli = Cli::parse();
  let mut config = ServerConfig::from_env();

  match cli.command {
    Commands::Serve {
      host,
      port,
      max_body_bytes,
      max_expression_len,
    } => {
      config.host = host.unwrap_or(config.host);
      config.port = port.unwrap_or(config.port);
      config.max_body_bytes = max_body_bytes.unwrap_or(config.max_body_bytes);
      config.max_expression_len =
        max_expression_len.unwrap_or(config.max_expression_len);
      server::serve(config).await?;
    }
    command => {
      let Some((op, body)) = request(command) else {
        return Ok(());
      };
      match dispatch(op, &body, &config) {
        Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
        Err(e) => {
          eprintln!("{e}");
          std::process::exit(1);
        }
      }
    }
  }
  Ok(())
}
