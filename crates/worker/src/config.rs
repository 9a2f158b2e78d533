//! Worker process configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use ddb_core::environment::ENVIRONMENT_VAR;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// WorkerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Names the email branding/links environment.
    pub environment: String,
    pub scheduler_interval: Duration,
    pub maintenance_interval: Duration,
    pub branch_timeout: Duration,
    pub metrics_addr: SocketAddr,
    /// `CEASE_OPERATION=true` asks the process to exit cleanly at startup.
    pub cease_operation: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                                   | Default        |
    /// |-------------------------------------------|----------------|
    /// | `DATABASE_URL`                            | (required)     |
    /// | `DATABASE_MAX_CONNECTIONS`                | `20`           |
    /// | `DINNER_DONE_BETTER_SERVICE_ENVIRONMENT`  | `localdev`     |
    /// | `INDEX_SCHEDULER_INTERVAL_SECS`           | `60`           |
    /// | `MAINTENANCE_INTERVAL_SECS`               | `60`           |
    /// | `FANOUT_BRANCH_TIMEOUT_SECS`              | `30`           |
    /// | `METRICS_ADDR`                            | `0.0.0.0:9090` |
    /// | `CEASE_OPERATION`                         | `false`        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let secs = |var: &'static str, default: u64| -> Result<Duration, ConfigError> {
            let secs: u64 = parse(var, get(var), default)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var,
                    value: "0".into(),
                    reason: "must be at least 1".into(),
                });
            }
            Ok(Duration::from_secs(secs))
        };

        Ok(Self {
            database_url,
            database_max_connections: parse(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                ddb_db::DEFAULT_MAX_CONNECTIONS,
            )?,
            environment: get(ENVIRONMENT_VAR).unwrap_or_else(|| "localdev".into()),
            scheduler_interval: secs("INDEX_SCHEDULER_INTERVAL_SECS", 60)?,
            maintenance_interval: secs("MAINTENANCE_INTERVAL_SECS", 60)?,
            branch_timeout: secs("FANOUT_BRANCH_TIMEOUT_SECS", 30)?,
            metrics_addr: parse("METRICS_ADDR", get("METRICS_ADDR"), SocketAddr::from(([0, 0, 0, 0], 9090)))?,
            cease_operation: get("CEASE_OPERATION").is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
        })
    }
}

fn parse<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        WorkerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/ddb")]).unwrap();
        assert_eq!(config.database_max_connections, 20);
        assert_eq!(config.environment, "localdev");
        assert_eq!(config.scheduler_interval, Duration::from_secs(60));
        assert_eq!(config.branch_timeout, Duration::from_secs(30));
        assert_eq!(config.metrics_addr.port(), 9090);
        assert!(!config.cease_operation);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/ddb"),
            ("DATABASE_MAX_CONNECTIONS", "5"),
            ("DINNER_DONE_BETTER_SERVICE_ENVIRONMENT", "production"),
            ("INDEX_SCHEDULER_INTERVAL_SECS", "15"),
            ("METRICS_ADDR", "127.0.0.1:9999"),
            ("CEASE_OPERATION", "TRUE"),
        ])
        .unwrap();
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.environment, "production");
        assert_eq!(config.scheduler_interval, Duration::from_secs(15));
        assert_eq!(config.metrics_addr, "127.0.0.1:9999".parse().unwrap());
        assert!(config.cease_operation);
    }

    #[test]
    fn database_url_is_required() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL")));
        assert_matches!(load(&[("DATABASE_URL", "  ")]), Err(ConfigError::Missing(_)));
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        assert_matches!(
            load(&[("DATABASE_URL", "x"), ("MAINTENANCE_INTERVAL_SECS", "soon")]),
            Err(ConfigError::Invalid { var: "MAINTENANCE_INTERVAL_SECS", .. })
        );
        assert_matches!(
            load(&[("DATABASE_URL", "x"), ("FANOUT_BRANCH_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid { var: "FANOUT_BRANCH_TIMEOUT_SECS", .. })
        );
    }
}
