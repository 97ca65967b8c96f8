//! Database credential resolution.
//!
//! Credentials are resolved exactly once at process start and frozen into an
//! immutable [`ConnectionSettings`] that every connection provider reads.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use bulkbench_core::{
    BenchConfig, BenchError, BenchResult, ConnectionSettings, CredentialSource, Credentials,
    CredentialsConfig,
};

/// Source of database credentials.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Fetches the credentials. Failures are returned as-is, never retried.
    async fn resolve(&self) -> BenchResult<Credentials>;
}

/// Reads a `{"username", "password"}` secret from AWS Secrets Manager.
pub struct SecretsManagerResolver {
    client: Client,
    secret_id: String,
}

impl SecretsManagerResolver {
    /// Builds a client for `region` using the default AWS credential chain.
    pub async fn new(secret_id: impl Into<String>, region: impl Into<String>) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.into()))
            .load()
            .await;

        Self {
            client: Client::new(&sdk_config),
            secret_id: secret_id.into(),
        }
    }

    /// Wraps an already configured client.
    pub fn with_client(client: Client, secret_id: impl Into<String>) -> Self {
        Self {
            client,
            secret_id: secret_id.into(),
        }
    }
}

#[async_trait]
impl CredentialResolver for SecretsManagerResolver {
    async fn resolve(&self) -> BenchResult<Credentials> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|err| BenchError::secret_service(DisplayErrorContext(&err).to_string()))?;

        let secret = output.secret_string().ok_or_else(|| {
            BenchError::configuration(format!(
                "secret `{}` has no string value",
                self.secret_id
            ))
        })?;

        tracing::debug!(secret_id = %self.secret_id, "secret resolved");
        parse_secret(secret)
    }
}

/// Credentials taken verbatim from configuration.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentials {
    async fn resolve(&self) -> BenchResult<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// Parses the JSON secret body.
pub fn parse_secret(secret: &str) -> BenchResult<Credentials> {
    serde_json::from_str(secret).map_err(|err| {
        BenchError::configuration(format!(
            "secret is not a JSON object with username and password: {err}"
        ))
    })
}

/// Picks the resolver named by `credentials.source`.
pub async fn resolver_from_config(
    config: &CredentialsConfig,
) -> BenchResult<Box<dyn CredentialResolver>> {
    match config.source {
        CredentialSource::SecretsManager => {
            let secret_id = config
                .secret_id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| BenchError::configuration("credentials.secret_id is not set"))?;
            Ok(Box::new(
                SecretsManagerResolver::new(secret_id, config.region.clone()).await,
            ))
        }
        CredentialSource::Static => {
            let credentials = config.static_credentials().ok_or_else(|| {
                BenchError::configuration("credentials.username is not set")
            })?;
            Ok(Box::new(StaticCredentials::new(credentials)))
        }
    }
}

/// Resolves credentials once and combines them with the database location.
pub async fn resolve_connection_settings(
    config: &BenchConfig,
    resolver: &dyn CredentialResolver,
) -> BenchResult<ConnectionSettings> {
    let credentials = resolver.resolve().await?;
    tracing::info!(
        host = %config.database.host,
        database = %config.database.name,
        user = %credentials.username,
        "credentials resolved"
    );
    Ok(ConnectionSettings::new(&config.database, credentials))
}
