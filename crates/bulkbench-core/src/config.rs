//! Configuration management for bulkbench
//!
//! Sources, lowest to highest precedence:
//! - Hardcoded defaults
//! - ./config/bulkbench.{yaml,toml,json}
//! - File named by the BULKBENCH_CONFIG env var
//! - File passed with `--config`
//! - BULKBENCH__SECTION__KEY environment variables
//! - libpq variables (PGHOST, PGPORT, PGDATABASE, PGUSER, PGPASSWORD)

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::credentials::Credentials;
use crate::job::StrategyKind;

/// Largest grouped `INSERT` page: PostgreSQL binds at most 65535 parameters
/// per statement and every row binds two.
pub const MAX_PAGE_SIZE: usize = u16::MAX as usize / 2;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BenchConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub benchmark: BenchmarkDefaults,
}

impl BenchConfig {
    /// Load configuration from every source, then validate it.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_file(None)
    }

    /// Like [`BenchConfig::load`], with `extra` (e.g. from `--config`) layered
    /// above the other files. Unlike the implicit files, `extra` must exist.
    pub fn load_with_file(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults(Config::builder())?;

        builder = builder.add_source(File::with_name("./config/bulkbench").required(false));

        if let Ok(config_path) = std::env::var("BULKBENCH_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Example: BULKBENCH__BENCHMARK__BATCH_SIZE=500
        builder = builder.add_source(
            Environment::with_prefix("BULKBENCH")
                .separator("__")
                .try_parsing(true),
        );

        builder = Self::apply_libpq_env(builder, |key| std::env::var(key).ok())?;

        let config: BenchConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file on top of the defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: BenchConfig = Self::set_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn set_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            // Database
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432)?
            .set_default("database.name", "postgres")?
            // Credentials
            .set_default("credentials.source", "secrets-manager")?
            .set_default("credentials.region", "us-east-2")?
            // Benchmark
            .set_default("benchmark.table", "test_json_inserts")?
            .set_default("benchmark.total_rows", 1_000_000)?
            .set_default("benchmark.batch_size", 1000)?
            .set_default("benchmark.payload_kb", 10)?
            .set_default("benchmark.strategy", "batched")?
            .set_default("benchmark.threaded_workers", 4)?
            .set_default("benchmark.page_size", 100)
    }

    /// Maps the standard libpq environment variables onto config keys.
    fn apply_libpq_env<F>(
        builder: ConfigBuilder<DefaultState>,
        lookup: F,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        builder
            .set_override_option("database.host", lookup("PGHOST"))?
            .set_override_option("database.port", lookup("PGPORT"))?
            .set_override_option("database.name", lookup("PGDATABASE"))?
            .set_override_option("credentials.username", lookup("PGUSER"))?
            .set_override_option("credentials.password", lookup("PGPASSWORD"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.host.trim().is_empty() {
            return Err(ConfigError::Message(
                "database.host must not be empty".to_string(),
            ));
        }

        if self.database.port == 0 {
            return Err(ConfigError::Message("database.port must be > 0".to_string()));
        }

        match self.credentials.source {
            CredentialSource::SecretsManager => {
                if self
                    .credentials
                    .secret_id
                    .as_deref()
                    .map_or(true, |id| id.trim().is_empty())
                {
                    return Err(ConfigError::Message(
                        "credentials.secret_id is required for the secrets-manager source"
                            .to_string(),
                    ));
                }
            }
            CredentialSource::Static => {
                if self.credentials.username.is_none() {
                    return Err(ConfigError::Message(
                        "credentials.username is required for the static source".to_string(),
                    ));
                }
            }
        }

        if self.benchmark.batch_size == 0 {
            return Err(ConfigError::Message(
                "benchmark.batch_size must be > 0".to_string(),
            ));
        }

        if self.benchmark.page_size == 0 {
            return Err(ConfigError::Message(
                "benchmark.page_size must be > 0".to_string(),
            ));
        }

        if self.benchmark.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Message(format!(
                "benchmark.page_size must be <= {MAX_PAGE_SIZE}"
            )));
        }

        if self.benchmark.threaded_workers == 0 {
            return Err(ConfigError::Message(
                "benchmark.threaded_workers must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Datastore location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    /// Database name (PGDATABASE)
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "postgres".to_string(),
        }
    }
}

/// Where database credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialSource {
    /// AWS Secrets Manager secret holding `{"username", "password"}`
    #[default]
    SecretsManager,
    /// `credentials.username` / `credentials.password` from configuration
    Static,
}

/// Credential resolution settings
#[derive(Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    pub source: CredentialSource,

    /// Secret identifier (name or ARN)
    #[serde(default)]
    pub secret_id: Option<String>,

    /// AWS region of the secret
    pub region: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsConfig {
    /// Credentials for the static source.
    pub fn static_credentials(&self) -> Option<Credentials> {
        self.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: self.password.clone().unwrap_or_default(),
        })
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            source: CredentialSource::SecretsManager,
            secret_id: None,
            region: "us-east-2".to_string(),
            username: None,
            password: None,
        }
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("source", &self.source)
            .field("secret_id", &self.secret_id)
            .field("region", &self.region)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Defaults for the benchmark commands
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BenchmarkDefaults {
    pub table: String,
    pub total_rows: u64,
    pub batch_size: u64,
    /// Payload filler size in kilobytes
    pub payload_kb: u32,
    pub strategy: StrategyKind,
    /// Worker count for the threaded model when none is given
    pub threaded_workers: usize,
    /// Rows per statement for the batched strategy
    pub page_size: usize,
}

impl Default for BenchmarkDefaults {
    fn default() -> Self {
        Self {
            table: "test_json_inserts".to_string(),
            total_rows: 1_000_000,
            batch_size: 1000,
            payload_kb: 10,
            strategy: StrategyKind::Batched,
            threaded_workers: 4,
            page_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn static_config() -> BenchConfig {
        let mut config = BenchConfig::default();
        config.credentials.source = CredentialSource::Static;
        config.credentials.username = Some("bench".to_string());
        config
    }

    #[test]
    fn test_default_configuration() {
        let config = BenchConfig::default();

        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.credentials.source, CredentialSource::SecretsManager);
        assert_eq!(config.credentials.region, "us-east-2");
        assert_eq!(config.benchmark.table, "test_json_inserts");
        assert_eq!(config.benchmark.total_rows, 1_000_000);
        assert_eq!(config.benchmark.batch_size, 1000);
        assert_eq!(config.benchmark.payload_kb, 10);
        assert_eq!(config.benchmark.strategy, StrategyKind::Batched);
        assert_eq!(config.benchmark.threaded_workers, 4);
        assert_eq!(config.benchmark.page_size, 100);
    }

    #[test]
    fn test_secrets_manager_requires_secret_id() {
        let mut config = BenchConfig::default();
        assert!(config.validate().is_err());

        config.credentials.secret_id = Some("rds!cluster-bench".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = static_config();
        assert!(config.validate().is_ok());

        config.database.port = 0;
        assert!(config.validate().is_err());
        config.database.port = 5432;

        config.benchmark.page_size = 0;
        assert!(config.validate().is_err());
        config.benchmark.page_size = MAX_PAGE_SIZE + 1;
        assert!(config.validate().is_err());
        config.benchmark.page_size = MAX_PAGE_SIZE;
        assert!(config.validate().is_ok());
        config.benchmark.page_size = 100;

        config.credentials.username = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[database]
host = "db.internal"
name = "bench"

[credentials]
source = "static"
username = "loader"
password = "pw"

[benchmark]
batch_size = 250
strategy = "bulk"
"#
        )
        .unwrap();

        let config = BenchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.name, "bench");
        assert_eq!(config.credentials.source, CredentialSource::Static);
        assert_eq!(config.benchmark.batch_size, 250);
        assert_eq!(config.benchmark.strategy, StrategyKind::Bulk);
        assert_eq!(config.benchmark.payload_kb, 10);

        let creds = config.credentials.static_credentials().unwrap();
        assert_eq!(creds.username, "loader");
        assert_eq!(creds.password, "pw");
    }

    #[test]
    fn test_unknown_credential_source_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[credentials]\nsource = \"vault\"").unwrap();
        assert!(BenchConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_libpq_variables_override() {
        let env: HashMap<&str, &str> = [
            ("PGHOST", "pg.example.com"),
            ("PGPORT", "6432"),
            ("PGUSER", "bench"),
        ]
        .into_iter()
        .collect();

        let builder = BenchConfig::set_defaults(Config::builder()).unwrap();
        let builder =
            BenchConfig::apply_libpq_env(builder, |key| env.get(key).map(|v| v.to_string()))
                .unwrap();
        let config: BenchConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.database.host, "pg.example.com");
        assert_eq!(config.database.port, 6432);
        assert_eq!(config.database.name, "postgres");
        assert_eq!(config.credentials.username.as_deref(), Some("bench"));
        assert!(config.credentials.password.is_none());
    }
}
