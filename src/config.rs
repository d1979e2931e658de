use std::str::FromStr;

/// Runtime settings of the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
  pub max_body_bytes: usize,
  pub max_expression_len: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    ServerConfig {
      host: "0.0.0.0".to_string(),
      port: 5000,
      max_body_bytes: 65_536,
      max_expression_len: 512,
    }
  }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
  std::env::var(key)
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(default)
}

impl ServerConfig {
  /// Defaults overridden by `MULTIVAR_HOST`, `PORT`,
  /// `MULTIVAR_MAX_BODY_BYTES` and `MULTIVAR_MAX_EXPRESSION_LEN`.
  /// Unparsable values are ignored.
  pub fn from_env() -> Self {
    let defaults = ServerConfig::default();
    ServerConfig {
      host: env_or("MULTIVAR_HOST", defaults.host),
      port: env_or("PORT", defaults.port),
      max_body_bytes: env_or("MULTIVAR_MAX_BODY_BYTES", defaults.max_body_bytes),
      max_expression_len: env_or(
        "MULTIVAR_MAX_EXPRESSION_LEN",
        defaults.max_expression_len,
      ),
    }
  }

  pub fn addr(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.addr(), "0.0.0.0:5000");
    assert_eq!(config.max_body_bytes, 65_536);
    assert_eq!(config.max_expression_len, 512);
  }

  #[test]
  fn env_or_parses_and_falls_back() {
    std::env::set_var("MULTIVAR_TEST_ENV_OR_NUMBER", "42");
    std::env::set_var("MULTIVAR_TEST_ENV_OR_GARBAGE", "forty-two");
    assert_eq!(env_or("MULTIVAR_TEST_ENV_OR_NUMBER", 7usize), 42);
    assert_eq!(env_or("MULTIVAR_TEST_ENV_OR_GARBAGE", 7usize), 7);
    assert_eq!(env_or("MULTIVAR_TEST_ENV_OR_MISSING", 7usize), 7);
  }
}
