use axum::http::HeaderValue;
use vizgen_pipeline::config::ConfigError;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<HeaderValue>,
    /// Timeout in seconds for health and status requests (default: `30`).
    /// `/api/generate` is not subject to it.
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight jobs (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `FRONTEND_URL`, else `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    ///
    /// `CORS_ORIGINS` is comma-separated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse("PORT", var("PORT").unwrap_or_else(|| "3000".into()))?;
        let request_timeout_secs = parse(
            "REQUEST_TIMEOUT_SECS",
            var("REQUEST_TIMEOUT_SECS").unwrap_or_else(|| "30".into()),
        )?;
        let shutdown_timeout_secs = parse(
            "SHUTDOWN_TIMEOUT_SECS",
            var("SHUTDOWN_TIMEOUT_SECS").unwrap_or_else(|| "30".into()),
        )?;

        let raw_origins = var("CORS_ORIGINS")
            .or_else(|| var("FRONTEND_URL"))
            .unwrap_or_else(|| "http://localhost:5173".into());
        let cors_origins = raw_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| {
                origin.parse::<HeaderValue>().map_err(|_| ConfigError::Invalid {
                    var: "CORS_ORIGINS",
                    value: origin.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
        })
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}
