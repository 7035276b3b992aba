//! HTTP client for the Gerrit account REST endpoints.
//!
//! Every request takes one token from the shared [`RateLimiter`]. When
//! credentials are configured the authenticated `/a/` endpoint tree is
//! used. Gerrit prefixes JSON bodies with a `)]}'` line to defeat
//! cross-site script inclusion; it is stripped before decoding.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aus_types::{AccountId, AccountInfo, AccountRecord, ExternalIdentity};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::Credentials;
use crate::error::{RemoteError, Result};
use crate::limiter::RateLimiter;
use crate::source::AccountSource;

const XSSI_PREFIX: &str = ")]}'";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct AccountDetailInfo {
    #[serde(rename = "_account_id")]
    account_id: Option<u32>,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIdInfo {
    identity: String,
    email_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CapabilityInfo {
    #[serde(rename = "accessDatabase", default)]
    access_database: bool,
}

/// Remove the anti-XSSI line Gerrit puts in front of JSON responses.
pub fn strip_xssi_prefix(body: &str) -> &str {
    match body.strip_prefix(XSSI_PREFIX) {
        Some(rest) => rest.trim_start_matches(['\r', '\n']),
        None => body,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub struct GerritClient {
    base: Url,
    http: reqwest::Client,
    credentials: Credentials,
    limiter: Arc<RateLimiter>,
}

impl GerritClient {
    /// Create a client for the server at `url` (e.g. `https://review.example.com/`).
    pub fn new(url: &str, credentials: Credentials, limiter: Arc<RateLimiter>) -> Result<Self> {
        let mut normalized = url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized).map_err(|e| RemoteError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {:?}", base.scheme()),
            });
        }
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base,
            http,
            credentials,
            limiter,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let prefix = if self.credentials.is_authenticated() { "a/" } else { "" };
        self.base
            .join(&format!("{prefix}{path}"))
            .map_err(|e| RemoteError::InvalidUrl {
                url: format!("{}{prefix}{path}", self.base),
                reason: e.to_string(),
            })
    }

    /// GET a JSON document. `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.endpoint(path)?;
        self.limiter.acquire().await;
        tracing::debug!(%url, "GET");

        let response = self
            .credentials
            .apply(self.http.get(url.clone()))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(strip_xssi_prefix(&body))
            .map(Some)
            .map_err(|source| RemoteError::Decode {
                url: url.to_string(),
                source,
            })
    }

    /// Fail unless the calling user holds the `accessDatabase` global
    /// capability, which is required to read other users' external ids.
    pub async fn check_access_database(&self) -> Result<()> {
        let caps: CapabilityInfo = self
            .get_json("accounts/self/capabilities")
            .await?
            .unwrap_or_default();
        if caps.access_database {
            Ok(())
        } else {
            Err(RemoteError::MissingCapability("accessDatabase".to_string()))
        }
    }
}

#[async_trait]
impl AccountSource for GerritClient {
    async fn fetch(&self, id: AccountId) -> Result<Option<AccountInfo>> {
        let Some(detail) = self
            .get_json::<AccountDetailInfo>(&format!("accounts/{id}/detail"))
            .await?
        else {
            tracing::debug!(%id, "account not found");
            return Ok(None);
        };
        if let Some(reported) = detail.account_id.filter(|reported| *reported != id.get()) {
            tracing::warn!(%id, reported, "server reported a different account id");
        }

        // The account can disappear between the two requests.
        let external_ids: Vec<ExternalIdInfo> = self
            .get_json(&format!("accounts/{id}/external.ids"))
            .await?
            .unwrap_or_default();

        let mut record = AccountRecord::new(id);
        record.full_name = non_empty(detail.name);
        record.preferred_email = non_empty(detail.email);

        let info = external_ids
            .into_iter()
            .fold(AccountInfo::new(record), |info, ext| {
                let mut identity = ExternalIdentity::new(ext.identity, id);
                identity.email = non_empty(ext.email_address);
                info.with_external_id(identity)
            });
        Ok(Some(info))
    }
}

impl std::fmt::Debug for GerritClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GerritClient")
            .field("base", &self.base.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}
