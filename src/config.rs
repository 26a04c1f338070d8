//! Harvest configuration
//!
//! Everything a harvest needs besides the query itself, loaded from a YAML
//! (or JSON) file. Every section is optional and falls back to the values
//! the offers API is normally used with.

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::search::{days_before, SearchConfig, DEFAULT_SEARCH_PATH};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the OAuth2 client id
pub const CLIENT_ID_ENV: &str = "FT_CLIENT_ID";

/// Environment variable holding the OAuth2 client secret
pub const CLIENT_SECRET_ENV: &str = "FT_CLIENT_SECRET";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete harvest configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Offers API location
    pub api: ApiConfig,

    /// OAuth2 credentials
    pub auth: AuthSection,

    /// HTTP client behaviour
    pub http: HttpConfig,

    /// Search engine behaviour
    pub search: SearchConfig,
}

impl HarvestConfig {
    /// Load from a file; `.json` files are read as JSON, anything else as YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: Self = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;

        debug!(path = %path.display(), "Loaded harvest config");
        Ok(config)
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make a harvest meaningless
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::invalid_value("api.base_url", e.to_string()))?;
        url::Url::parse(&self.auth.token_url)
            .map_err(|e| Error::invalid_value("auth.token_url", e.to_string()))?;

        if self.search.ceiling == 0 {
            return Err(Error::invalid_value("search.ceiling", "must be positive"));
        }
        check_max_creation_days("search.max_creation_days", self.search.max_creation_days)?;
        if self.http.timeout_secs == 0 {
            return Err(Error::invalid_value("http.timeout_secs", "must be positive"));
        }
        Ok(())
    }

    /// Override credentials from the command line, then the environment
    ///
    /// Explicit values win over `FT_CLIENT_ID` / `FT_CLIENT_SECRET`, which win
    /// over the file.
    pub fn apply_credentials(&mut self, client_id: Option<String>, client_secret: Option<String>) {
        self.apply_credentials_with(client_id, client_secret, |key| std::env::var(key).ok());
    }

    /// Same as [`HarvestConfig::apply_credentials`] with a custom environment lookup
    pub fn apply_credentials_with(
        &mut self,
        client_id: Option<String>,
        client_secret: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) {
        if let Some(id) = client_id.or_else(|| env(CLIENT_ID_ENV)) {
            self.auth.client_id = Some(id);
        }
        if let Some(secret) = client_secret.or_else(|| env(CLIENT_SECRET_ENV)) {
            self.auth.client_secret = Some(secret);
        }
    }

    /// Auth configuration for the HTTP client
    pub fn to_auth_config(&self) -> Result<AuthConfig> {
        let client_id = non_empty(self.auth.client_id.as_deref())
            .ok_or_else(|| Error::missing_field("auth.client_id"))?;
        let client_secret = non_empty(self.auth.client_secret.as_deref())
            .ok_or_else(|| Error::missing_field("auth.client_secret"))?;

        Ok(AuthConfig::client_credentials(
            &self.auth.token_url,
            client_id,
            client_secret,
            self.auth.scopes.clone(),
        ))
    }

    /// HTTP client configuration
    pub fn to_http_client_config(&self) -> HttpClientConfig {
        let http = &self.http;
        HttpClientConfig::builder()
            .base_url(&self.api.base_url)
            .timeout(Duration::from_secs(http.timeout_secs))
            .max_retries(http.max_retries)
            .backoff(
                http.backoff,
                Duration::from_millis(http.initial_backoff_ms),
                Duration::from_millis(http.max_backoff_ms),
            )
            .rate_limit(RateLimiterConfig::per_second(http.requests_per_second))
            .build()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Sections
// ============================================================================

/// Offers API location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the offers API
    pub base_url: String,

    /// Path of the search endpoint, relative to `base_url`
    pub search_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.francetravail.io/partenaire/offresdemploi/".to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
        }
    }
}

/// OAuth2 client-credentials settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Token endpoint
    pub token_url: String,

    /// Client id
    pub client_id: Option<String>,

    /// Client secret
    pub client_secret: Option<String>,

    /// Requested scopes
    pub scopes: Vec<String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            token_url: "https://entreprise.francetravail.fr/connexion/oauth2/access_token?realm=/partenaire"
                .to_string(),
            client_id: None,
            client_secret: None,
            scopes: vec!["api_offresdemploiv2".to_string(), "o2dsoffre".to_string()],
        }
    }
}

impl std::fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSection")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retries of 429, 5xx and connection failures
    pub max_retries: u32,

    /// First backoff delay in milliseconds
    pub initial_backoff_ms: u64,

    /// Backoff delay cap in milliseconds
    pub max_backoff_ms: u64,

    /// Backoff growth
    pub backoff: BackoffType,

    /// Request budget; 0 disables throttling
    pub requests_per_second: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 4,
            initial_backoff_ms: 200,
            max_backoff_ms: 10_000,
            backoff: BackoffType::Exponential,
            requests_per_second: 10,
        }
    }
}

/// Check a look-back in days: not negative, and reachable from today
pub fn check_max_creation_days(field: &str, days: i64) -> Result<()> {
    if days < 0 {
        return Err(Error::invalid_value(field, "must not be negative"));
    }
    days_before(chrono::Utc::now(), days, field)
        .map(|_| ())
        .map_err(|e| Error::invalid_value(field, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PageFailurePolicy, UnknownCountPolicy};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_config() {
        let config = HarvestConfig::default();
        assert_eq!(config.api.search_path, "v2/offres/search");
        assert_eq!(config.auth.scopes, vec!["api_offresdemploiv2", "o2dsoffre"]);
        assert_eq!(config.http.max_retries, 4);
        assert_eq!(config.search.ceiling, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
auth:
  client_id: my-client
  client_secret: my-secret
search:
  max_creation_days: 30
  unknown_count: skip
  page_failure: abort_window
"#;
        let config = HarvestConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.auth.client_id.as_deref(), Some("my-client"));
        assert_eq!(config.search.max_creation_days, 30);
        assert_eq!(config.search.ceiling, 3000);
        assert_eq!(config.search.unknown_count, UnknownCountPolicy::Skip);
        assert_eq!(config.search.page_failure, PageFailurePolicy::AbortWindow);
        assert_eq!(config.http, HttpConfig::default());
    }

    #[test]
    fn test_reject_invalid_values() {
        let err = HarvestConfig::from_yaml("search:\n  ceiling: 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));

        let err = HarvestConfig::from_yaml("api:\n  base_url: not a url\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_reject_out_of_range_max_creation_days() {
        let err = HarvestConfig::from_yaml("search:\n  max_creation_days: -1\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));

        let err =
            HarvestConfig::from_yaml("search:\n  max_creation_days: 999999999999\n").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfigValue { ref field, .. } if field == "search.max_creation_days"
        ));

        assert!(check_max_creation_days("--max-creation-days", 365).is_ok());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "http:\n  requests_per_second: 0").unwrap();

        let config = HarvestConfig::load(file.path()).unwrap();
        assert_eq!(config.http.requests_per_second, 0);
        assert!(config.to_http_client_config().rate_limit.is_none());
    }

    #[test]
    fn test_load_json_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"search": {{"ceiling": 1000}}}}"#).unwrap();

        let config = HarvestConfig::load(file.path()).unwrap();
        assert_eq!(config.search.ceiling, 1000);
    }

    #[test]
    fn test_load_missing_file() {
        let err = HarvestConfig::load("/nonexistent/ft-offers.yaml").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_credentials_precedence() {
        let env = |key: &str| match key {
            CLIENT_ID_ENV => Some("env-id".to_string()),
            CLIENT_SECRET_ENV => Some("env-secret".to_string()),
            _ => None,
        };

        let mut config = HarvestConfig::default();
        config.auth.client_id = Some("file-id".to_string());
        config.apply_credentials_with(Some("cli-id".to_string()), None, env);

        assert_eq!(config.auth.client_id.as_deref(), Some("cli-id"));
        assert_eq!(config.auth.client_secret.as_deref(), Some("env-secret"));
    }

    #[test]
    fn test_missing_credentials() {
        let config = HarvestConfig::default();
        let err = config.to_auth_config().unwrap_err();
        assert!(
            matches!(err, Error::MissingConfigField { ref field } if field == "auth.client_id")
        );

        let mut config = HarvestConfig::default();
        config.auth.client_id = Some("id".to_string());
        config.auth.client_secret = Some("  ".to_string());
        let err = config.to_auth_config().unwrap_err();
        assert!(
            matches!(err, Error::MissingConfigField { ref field } if field == "auth.client_secret")
        );
    }

    #[test]
    fn test_to_auth_config() {
        let mut config = HarvestConfig::default();
        config.apply_credentials_with(Some("id".into()), Some("secret".into()), |_| None);

        match config.to_auth_config().unwrap() {
            AuthConfig::ClientCredentials(credentials) => {
                assert_eq!(credentials.client_id, "id");
                assert_eq!(credentials.scopes.len(), 2);
            }
            other => panic!("Expected client credentials, got {other:?}"),
        }
    }

    #[test]
    fn test_to_http_client_config() {
        let config = HarvestConfig::default();
        let http = config.to_http_client_config();
        assert_eq!(http.timeout, Duration::from_secs(30));
        assert_eq!(http.retry.initial_backoff, Duration::from_millis(200));
        assert_eq!(http.rate_limit, Some(RateLimiterConfig::default()));
        assert_eq!(
            http.base_url.as_deref(),
            Some("https://api.francetravail.io/partenaire/offresdemploi/")
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let mut config = HarvestConfig::default();
        config.auth.client_secret = Some("hunter2".to_string());
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
