use crate::config::GateConfig;
use crate::netstatus::Netstatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

/// Sentinel status code carried by synthetic rejections, so callers can
/// tell them apart from real HTTP responses.
pub const OFFLINE_STATUS: u16 = 0;

const OFFLINE_STATUS_TEXT: &str = "Offline";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("intercept prefix not supported: no URL resolver available in this environment")]
    UrlSupportUnavailable,
    #[error("invalid URL '{raw}': {source}")]
    InvalidUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
}

/// Resolves a possibly-relative URL to an absolute one.
pub trait UrlResolver: Send + Sync {
    fn resolve(&self, raw: &str) -> Result<String, GateError>;
}

/// Joins against the application's base location per RFC 3986, so an
/// already-absolute input passes through unchanged.
pub struct BaseUrlResolver {
    base: Url,
}

impl BaseUrlResolver {
    pub fn new(base_location: &str) -> Result<Self, GateError> {
        let base = Url::parse(base_location).map_err(|source| GateError::InvalidUrl {
            raw: base_location.to_string(),
            source,
        })?;
        Ok(BaseUrlResolver { base })
    }
}

impl UrlResolver for BaseUrlResolver {
    fn resolve(&self, raw: &str) -> Result<String, GateError> {
        let url = self.base.join(raw).map_err(|source| GateError::InvalidUrl {
            raw: raw.to_string(),
            source,
        })?;
        Ok(url.into())
    }
}

/// Outgoing request as seen at the dispatch decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    pub method: String,
    pub url: String,
}

impl RequestConfig {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        RequestConfig { method: method.into(), url: url.into() }
    }
}

/// Synthetic failure returned in place of a network error when a request is
/// blocked. Travels the caller's normal failure channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{status_text} ({status}): {} {}", .config.method, .config.url)]
pub struct OfflineRejection {
    pub status: u16,
    pub status_text: String,
    pub config: RequestConfig,
}

impl OfflineRejection {
    fn new(config: RequestConfig) -> Self {
        OfflineRejection {
            status: OFFLINE_STATUS,
            status_text: OFFLINE_STATUS_TEXT.to_string(),
            config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow(RequestConfig),
    Reject(OfflineRejection),
}

/// Request-stage interceptor that blocks outgoing HTTP traffic while the
/// application is forced offline.
pub struct OfflineGate {
    netstatus: Arc<Netstatus>,
    resolver: Option<Arc<dyn UrlResolver>>,
    intercept_prefix: Mutex<Option<String>>,
}

impl OfflineGate {
    pub fn new(netstatus: Arc<Netstatus>, resolver: Option<Arc<dyn UrlResolver>>) -> Self {
        OfflineGate {
            netstatus,
            resolver,
            intercept_prefix: Mutex::new(None),
        }
    }

    /// Builds a gate resolving against the configured base location, with
    /// the configured prefix (if any) already applied.
    pub async fn from_config(netstatus: Arc<Netstatus>, cfg: &GateConfig) -> Result<Self, GateError> {
        let resolver = BaseUrlResolver::new(&cfg.base_location)?;
        let gate = OfflineGate::new(netstatus, Some(Arc::new(resolver)));
        if cfg.intercept_prefix.is_some() {
            gate.set_intercept_prefix(cfg.intercept_prefix.clone()).await?;
        }
        Ok(gate)
    }

    pub async fn intercept_prefix(&self) -> Option<String> {
        self.intercept_prefix.lock().await.clone()
    }

    /// Stores the prefix verbatim; normalization happens per request.
    /// Fails without touching the current value when URL resolution is not
    /// available in this environment.
    pub async fn set_intercept_prefix(&self, prefix: Option<String>) -> Result<(), GateError> {
        if self.resolver.is_none() {
            return Err(GateError::UrlSupportUnavailable);
        }
        *self.intercept_prefix.lock().await = prefix;
        Ok(())
    }

    /// Decides whether an outgoing request may be dispatched.
    ///
    /// Only the manual override blocks traffic; browser-detected offline on
    /// its own lets requests through (the host may well be back on the
    /// network before its signal catches up).
    pub async fn intercept(&self, config: RequestConfig) -> Result<GateDecision, GateError> {
        let mut reject = self.netstatus.manual_offline().await;

        if reject {
            if let Some(prefix) = self.intercept_prefix.lock().await.as_deref() {
                let resolver = self.resolver.as_ref().ok_or(GateError::UrlSupportUnavailable)?;
                let abs_url = resolver.resolve(&config.url)?;
                let abs_prefix = resolver.resolve(prefix)?;
                reject = abs_url.starts_with(&abs_prefix);
            }
        }

        if reject {
            tracing::debug!("offline, rejecting API call: {} {}", config.method, config.url);
            Ok(GateDecision::Reject(OfflineRejection::new(config)))
        } else {
            Ok(GateDecision::Allow(config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::connectivity::SharedConnectivity;
    use crate::storage::FlagStore;
    use anyhow::Result;
    use tempfile::TempDir;

    async fn online_netstatus(tmpdir: &TempDir) -> Result<Arc<Netstatus>> {
        let cfg = StorageConfig { path: tmpdir.path().to_path_buf() };
        let store = FlagStore::open(&cfg).await?;
        let conn = Arc::new(SharedConnectivity::new(true, "test"));
        Ok(Arc::new(Netstatus::new(conn, store).await?))
    }

    fn example_resolver() -> Arc<dyn UrlResolver> {
        Arc::new(BaseUrlResolver::new("http://example.com/app/").unwrap())
    }

    #[tokio::test]
    async fn test_allows_everything_when_not_forced_offline() -> Result<()> {
        let tmpdir = TempDir::new()?;
        let gate = OfflineGate::new(online_netstatus(&tmpdir).await?, Some(example_resolver()));

        let config = RequestConfig::new("GET", "http://example.com/api/things");
        let decision = gate.intercept(config.clone()).await?;
        assert_eq!(decision, GateDecision::Allow(config));
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_everything_without_prefix() -> Result<()> {
        crate::init_test_logging();
        let tmpdir = TempDir::new()?;
        let netstatus = online_netstatus(&tmpdir).await?;
        netstatus.set_manual_offline(true).await?;
        let gate = OfflineGate::new(netstatus, Some(example_resolver()));

        let decision = gate
            .intercept(RequestConfig::new("GET", "http://anywhere.example/x"))
            .await?;
        match decision {
            GateDecision::Reject(rejection) => {
                assert_eq!(rejection.status, OFFLINE_STATUS);
                assert_eq!(rejection.status_text, "Offline");
                assert_eq!(rejection.config.url, "http://anywhere.example/x");
            }
            GateDecision::Allow(_) => panic!("expected rejection"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_prefix_scopes_what_gets_blocked() -> Result<()> {
        let tmpdir = TempDir::new()?;
        let netstatus = online_netstatus(&tmpdir).await?;
        netstatus.set_manual_offline(true).await?;
        let gate = OfflineGate::new(netstatus, Some(example_resolver()));
        gate.set_intercept_prefix(Some("http://example.com/intercept/".to_string()))
            .await?;

        let blocked = gate
            .intercept(RequestConfig::new("GET", "http://example.com/intercept/this"))
            .await?;
        assert!(matches!(blocked, GateDecision::Reject(_)));

        let allowed = gate
            .intercept(RequestConfig::new("GET", "http://example.com/donotintercept/this"))
            .await?;
        assert!(matches!(allowed, GateDecision::Allow(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_relative_urls_resolve_against_base() -> Result<()> {
        let tmpdir = TempDir::new()?;
        let netstatus = online_netstatus(&tmpdir).await?;
        netstatus.set_manual_offline(true).await?;
        let gate = OfflineGate::new(netstatus, Some(example_resolver()));
        gate.set_intercept_prefix(Some("api/".to_string())).await?;

        // Both resolve under http://example.com/app/.
        let blocked = gate.intercept(RequestConfig::new("GET", "api/items")).await?;
        assert!(matches!(blocked, GateDecision::Reject(_)));

        let allowed = gate.intercept(RequestConfig::new("GET", "assets/logo.png")).await?;
        assert!(matches!(allowed, GateDecision::Allow(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_prefix_setter_without_url_support() -> Result<()> {
        let tmpdir = TempDir::new()?;
        let gate = OfflineGate::new(online_netstatus(&tmpdir).await?, None);

        let err = gate
            .set_intercept_prefix(Some("http://example.com/".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::UrlSupportUnavailable));
        assert_eq!(gate.intercept_prefix().await, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_prefix_stored_verbatim() -> Result<()> {
        let tmpdir = TempDir::new()?;
        let gate = OfflineGate::new(online_netstatus(&tmpdir).await?, Some(example_resolver()));

        gate.set_intercept_prefix(Some("http://example.com/".to_string())).await?;
        assert_eq!(
            gate.intercept_prefix().await.as_deref(),
            Some("http://example.com/")
        );

        gate.set_intercept_prefix(None).await?;
        assert_eq!(gate.intercept_prefix().await, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_request_url_surfaces() -> Result<()> {
        let tmpdir = TempDir::new()?;
        let netstatus = online_netstatus(&tmpdir).await?;
        netstatus.set_manual_offline(true).await?;
        let gate = OfflineGate::new(netstatus, Some(example_resolver()));
        gate.set_intercept_prefix(Some("http://example.com/".to_string())).await?;

        let err = gate
            .intercept(RequestConfig::new("GET", "http://[not-a-url"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidUrl { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_gate_from_config() -> Result<()> {
        let tmpdir = TempDir::new()?;
        let netstatus = online_netstatus(&tmpdir).await?;
        netstatus.set_manual_offline(true).await?;

        let cfg = GateConfig {
            base_location: "http://example.com/app/".to_string(),
            intercept_prefix: Some("http://example.com/intercept/".to_string()),
        };
        let gate = OfflineGate::from_config(netstatus, &cfg).await?;

        let blocked = gate
            .intercept(RequestConfig::new("POST", "http://example.com/intercept/save"))
            .await?;
        assert!(matches!(blocked, GateDecision::Reject(_)));
        Ok(())
    }

    #[test]
    fn test_base_resolver_passes_absolute_urls_through() {
        let resolver = BaseUrlResolver::new("http://example.com/app/").unwrap();
        assert_eq!(
            resolver.resolve("http://other.example/x").unwrap(),
            "http://other.example/x"
        );
        assert_eq!(
            resolver.resolve("api/items").unwrap(),
            "http://example.com/app/api/items"
        );
    }
}
