use crate::{config::KeysConfig, error::KeyError};
use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Capability returning the raw reference series body.
///
/// Transport agnostic: the index only needs the JSON text.
#[async_trait]
pub trait SeriesFetcher: Send + Sync {
    async fn fetch_raw(&self) -> Result<String, KeyError>;
}

/// HTTP GET against the Steam price history endpoint.
#[derive(Debug, Clone)]
pub struct HttpSeriesFetcher {
    client: Client,
    url: Url,
    session_cookie: Option<String>,
    timeout: Duration,
}

impl HttpSeriesFetcher {
    pub fn new(config: &KeysConfig) -> Result<Self, KeyError> {
        Self::with_client(Client::new(), config)
    }

    /// Reuse an existing [`Client`] (connection pool, proxy settings...).
    pub fn with_client(client: Client, config: &KeysConfig) -> Result<Self, KeyError> {
        let url = Url::parse(&config.price_history_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(KeyError::InvalidUrl(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        Ok(Self {
            client,
            url,
            session_cookie: config.session_cookie.clone(),
            timeout: config.request_timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SeriesFetcher for HttpSeriesFetcher {
    async fn fetch_raw(&self) -> Result<String, KeyError> {
        debug!(url = %self.url, "Fetching key price history");

        let mut request = self.client.get(self.url.clone()).timeout(self.timeout);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(KeyError::Status(response.status().as_u16()));
        }

        Ok(response.text().await?)
    }
}
