//! Bearer-token sources for the Cloud Tasks API.
//!
//! Credentials are discovered the way Google client libraries do it, minus
//! the parts this tool never needs: an explicit access token, then a
//! service-account key file, then the instance metadata server. Tokens are
//! fetched once per call; nothing is cached or refreshed.

use crate::config::AuthConfig;
use crate::error::{SubmitError, SubmitResult};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// OAuth scope granting access to Cloud Tasks.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Anything that can hand out an OAuth access token.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    /// Fetch an access token suitable for an `Authorization: Bearer` header
    async fn access_token(&self, http: &reqwest::Client) -> SubmitResult<String>;

    /// Short description used in logs
    fn kind(&self) -> &'static str;
}

/// Pick a token source for the given settings.
///
/// Returns `None` when authentication is disabled.
pub fn token_source(config: &AuthConfig) -> Option<Box<dyn TokenSource>> {
    if config.disabled {
        return None;
    }
    if let Some(token) = &config.access_token {
        return Some(Box::new(StaticToken::new(token.clone())));
    }
    if let Some(path) = &config.credentials_path {
        return Some(Box::new(ServiceAccountKeyFile::new(path.clone())));
    }
    Some(Box::new(MetadataServer::from_env()))
}

/// A token supplied up front.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Wrap an existing access token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self, _http: &reqwest::Client) -> SubmitResult<String> {
        Ok(self.token.clone())
    }

    fn kind(&self) -> &'static str {
        "static"
    }
}

/// Service-account key file (`GOOGLE_APPLICATION_CREDENTIALS`).
#[derive(Debug, Clone)]
pub struct ServiceAccountKeyFile {
    path: String,
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    #[serde(rename = "type")]
    kind: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKeyFile {
    /// Use the key file at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> SubmitResult<ServiceAccountKey> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SubmitError::auth_with(format!("cannot read credentials file {}", self.path), e)
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
            SubmitError::auth_with(format!("malformed credentials file {}", self.path), e)
        })?;
        if key.kind != "service_account" {
            return Err(SubmitError::auth(format!(
                "unsupported credentials type '{}' in {}",
                key.kind, self.path
            )));
        }
        Ok(key)
    }

    fn assertion(key: &ServiceAccountKey) -> SubmitResult<String> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SubmitError::auth_with("invalid service account private key", e))?;
        jsonwebtoken::encode(&header, &claims, &signing_key)
            .map_err(|e| SubmitError::auth_with("failed to sign token assertion", e))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountKeyFile {
    async fn access_token(&self, http: &reqwest::Client) -> SubmitResult<String> {
        let key = self.load().await?;
        let assertion = Self::assertion(&key)?;
        debug!(client_email = %key.client_email, token_uri = %key.token_uri, "exchanging service account assertion");

        let response = http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        read_token(response).await
    }

    fn kind(&self) -> &'static str {
        "service_account"
    }
}

/// Default service account of the instance the tool runs on.
#[derive(Debug, Clone)]
pub struct MetadataServer {
    base_url: String,
}

impl MetadataServer {
    /// Talk to the metadata server at `host` (`host[:port]` or a full URL)
    pub fn new(host: &str) -> Self {
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{host}")
        };
        Self { base_url }
    }

    /// Honors `GCE_METADATA_HOST`, like the official client libraries
    pub fn from_env() -> Self {
        let host = std::env::var("GCE_METADATA_HOST")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
        Self::new(&host)
    }

    fn token_url(&self) -> String {
        format!(
            "{}/computeMetadata/v1/instance/service-accounts/default/token",
            self.base_url
        )
    }
}

#[async_trait]
impl TokenSource for MetadataServer {
    async fn access_token(&self, http: &reqwest::Client) -> SubmitResult<String> {
        let url = self.token_url();
        debug!(%url, "requesting token from metadata server");
        let response = http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| SubmitError::auth_with("metadata server unreachable", e))?;
        read_token(response).await
    }

    fn kind(&self) -> &'static str {
        "metadata_server"
    }
}

async fn read_token(response: reqwest::Response) -> SubmitResult<String> {
    let status = response.status();
    if !status.is_success() {
        let body = crate::queue::http::error_body(response).await;
        return Err(SubmitError::auth(format!(
            "token endpoint returned {}: {}",
            status.as_u16(),
            body.trim()
        )));
    }
    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| SubmitError::auth_with("malformed token response", e))?;
    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve_once, serve_truncated};
    use jsonwebtoken::{DecodingKey, Validation};

    const TEST_PRIVATE_KEY: &str = include_str!("../testdata/service_account_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../testdata/service_account_key.pub.pem");
    const TEST_CLIENT_EMAIL: &str = "submitter@test-project.iam.gserviceaccount.com";

    async fn write_key_file(token_uri: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("sa-{}.json", uuid::Uuid::new_v4()));
        let key = serde_json::json!({
            "type": "service_account",
            "client_email": TEST_CLIENT_EMAIL,
            "private_key": TEST_PRIVATE_KEY,
            "private_key_id": "test-key-id",
            "token_uri": token_uri,
        });
        tokio::fs::write(&path, key.to_string()).await.unwrap();
        path
    }

    #[test]
    fn test_source_selection_order() {
        let mut config = AuthConfig {
            access_token: Some("tok".to_string()),
            credentials_path: Some("/tmp/key.json".to_string()),
            disabled: false,
        };
        assert_eq!(token_source(&config).unwrap().kind(), "static");

        config.access_token = None;
        assert_eq!(token_source(&config).unwrap().kind(), "service_account");

        config.credentials_path = None;
        assert_eq!(token_source(&config).unwrap().kind(), "metadata_server");

        config.disabled = true;
        assert!(token_source(&config).is_none());
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken::new("ya29.abc");
        let token = source.access_token(&reqwest::Client::new()).await.unwrap();
        assert_eq!(token, "ya29.abc");
        assert!(!format!("{source:?}").contains("ya29"));
    }

    #[tokio::test]
    async fn test_missing_key_file_is_auth_error() {
        let source = ServiceAccountKeyFile::new("/nonexistent/credentials.json");
        let err = source
            .access_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::AuthError { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_credentials_type() {
        let path = std::env::temp_dir().join(format!("creds-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            r#"{"type": "authorized_user", "client_email": "", "private_key": ""}"#,
        )
        .await
        .unwrap();

        let source = ServiceAccountKeyFile::new(path.to_string_lossy());
        let err = source
            .access_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("authorized_user"));

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_service_account_exchanges_signed_assertion() {
        let (base_url, request) =
            serve_once(200, r#"{"access_token":"ya29.sa","expires_in":3599,"token_type":"Bearer"}"#)
                .await;
        let token_uri = format!("{base_url}/token");
        let path = write_key_file(&token_uri).await;

        let source = ServiceAccountKeyFile::new(path.to_string_lossy());
        let token = source.access_token(&reqwest::Client::new()).await.unwrap();
        assert_eq!(token, "ya29.sa");

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /token HTTP/1.1"));
        let (_, form) = raw.split_once("\r\n\r\n").unwrap();
        assert!(form.contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"));

        let assertion = form
            .split('&')
            .find_map(|pair| pair.strip_prefix("assertion="))
            .unwrap();
        let header = jsonwebtoken::decode_header(assertion).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("test-key-id"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[token_uri.as_str()]);
        validation.set_issuer(&[TEST_CLIENT_EMAIL]);
        let decoding_key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
        let claims =
            jsonwebtoken::decode::<serde_json::Value>(assertion, &decoding_key, &validation)
                .unwrap()
                .claims;
        assert_eq!(claims["scope"], CLOUD_PLATFORM_SCOPE);
        assert_eq!(claims["iss"], TEST_CLIENT_EMAIL);
        assert_eq!(claims["aud"], token_uri.as_str());
        assert_eq!(
            claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
            ASSERTION_LIFETIME_SECS
        );

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_service_account_rejected_by_token_endpoint() {
        let (base_url, _request) =
            serve_once(400, r#"{"error":"invalid_grant","error_description":"Invalid JWT"}"#)
                .await;
        let path = write_key_file(&format!("{base_url}/token")).await;

        let err = ServiceAccountKeyFile::new(path.to_string_lossy())
            .access_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::AuthError { .. }));
        assert!(err.to_string().contains("invalid_grant"));

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_metadata_server_token() {
        let (base_url, request) =
            serve_once(200, r#"{"access_token":"ya29.meta","expires_in":3599,"token_type":"Bearer"}"#)
                .await;

        let source = MetadataServer::new(&base_url);
        let token = source.access_token(&reqwest::Client::new()).await.unwrap();
        assert_eq!(token, "ya29.meta");

        let raw = request.await.unwrap().to_lowercase();
        assert!(raw.starts_with(
            "get /computemetadata/v1/instance/service-accounts/default/token"
        ));
        assert!(raw.contains("metadata-flavor: google"));
    }

    #[tokio::test]
    async fn test_metadata_server_error_status() {
        let (base_url, _request) = serve_once(404, "no service account").await;
        let err = MetadataServer::new(&base_url)
            .access_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::AuthError { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_unreadable_token_error_body_is_reported() {
        let (base_url, _request) = serve_truncated(500, "backend unava").await;
        let err = MetadataServer::new(&base_url)
            .access_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("failed to read response body"));
    }
}
