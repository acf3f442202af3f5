use std::{future::Future, sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT},
    Client,
};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{KensaError, KensaResult};

/// Network settings shared by the manifest download and the time synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
    /// Extra headers, formatted as `Key: Value`
    pub headers: Vec<String>,
    /// Cookies sent along with the manifest request, formatted as in `Set-Cookie`
    pub cookies: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            user_agent: None,
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Source of remote text documents.
pub trait Fetcher {
    /// Download `url` and return the body. Any non-success status is a failure.
    fn fetch_text(&self, url: &Url) -> impl Future<Output = KensaResult<String>> + Send;
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cookies_store: Arc<CookieStoreMutex>,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> KensaResult<Self> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));

        let mut builder = Client::builder()
            .cookie_provider(cookies_store.clone())
            .timeout(config.timeout())
            .default_headers(parse_headers(&config.headers)?);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        Ok(Self {
            client: builder.build()?,
            cookies_store,
        })
    }

    pub fn add_cookies(&self, cookies: &[String], url: &Url) {
        // A poisoned store only means another request panicked mid-update
        let mut lock = match self.cookies_store.lock() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        for cookie in cookies {
            if let Err(error) = lock.parse(cookie, url) {
                tracing::warn!(%cookie, "Ignoring invalid cookie: {error}");
            }
        }
    }
}

impl Fetcher for HttpClient {
    async fn fetch_text(&self, url: &Url) -> KensaResult<String> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/dash+xml, text/plain, */*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, %status, "Request failed");
            return Err(KensaError::HttpError(status));
        }

        Ok(response.text().await?)
    }
}

/// Parse `Key: Value` pairs into a header map.
pub fn parse_headers<S>(headers: &[S]) -> KensaResult<HeaderMap>
where
    S: AsRef<str>,
{
    let mut map = HeaderMap::new();
    for header in headers {
        let header = header.as_ref();
        let (key, value) = header
            .split_once(':')
            .ok_or_else(|| KensaError::InvalidHeader(header.to_string()))?;

        let key = HeaderName::from_bytes(key.trim().as_bytes())
            .map_err(|_| KensaError::InvalidHeader(header.to_string()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| KensaError::InvalidHeader(header.to_string()))?;
        map.append(key, value);
    }
    Ok(map)
}
