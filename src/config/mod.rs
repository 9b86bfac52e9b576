use serde::Deserialize;
use std::env;

// Top-level settings container
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `json` or `pretty`
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Without a URL the service runs on the in-memory store.
    pub url: Option<String>,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    pub run_migrations: bool,
    pub seed_demo_data: bool,
}

// (config key, environment variable)
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("app.host", "HOST"),
    ("app.port", "PORT"),
    ("app.environment", "ENVIRONMENT"),
    ("app.rust_log", "RUST_LOG"),
    ("app.log_format", "LOG_FORMAT"),
    ("database.url", "DATABASE_URL"),
    ("database.pool_size", "DB_POOL_SIZE"),
    ("database.acquire_timeout_secs", "DB_ACQUIRE_TIMEOUT_SECS"),
    ("features.run_migrations", "RUN_MIGRATIONS"),
    ("features.seed_demo_data", "SEED_DEMO_DATA"),
];

impl Config {
    pub fn from_env() -> Result<Self, ::config::ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from defaults overridden by whatever `lookup` returns
    /// for each environment variable name.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "theatre_booking=debug,tower_http=debug")?
            .set_default("app.log_format", "pretty")?
            .set_default("database.pool_size", 20)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("features.run_migrations", true)?
            .set_default("features.seed_demo_data", false)?;

        for (key, var) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, lookup(var).filter(|v| !v.is_empty()))?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.app.port, 8000);
        assert_eq!(config.app.host, "0.0.0.0");
        assert_eq!(config.app.log_format, "pretty");
        assert!(config.database.url.is_none());
        assert_eq!(config.database.pool_size, 20);
        assert!(config.features.run_migrations);
        assert!(!config.features.seed_demo_data);
        assert!(!config.is_production());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9090"),
            ("DATABASE_URL", "postgres://localhost/theatre"),
            ("SEED_DEMO_DATA", "true"),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap();
        assert_eq!(config.app.port, 9090);
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/theatre"));
        assert!(config.features.seed_demo_data);
        assert!(config.is_production());
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(Config::from_lookup(lookup_from(&[("PORT", "not-a-port")])).is_err());
    }
}
