//! HTTP implementation of [`DataRepository`].

use super::{CursorPage, DataRepository, Page};
use crate::config::ClientConfig;
use crate::entity::{CacheEntity, EntityKind};
use crate::error::{Error, Result};
use crate::key::ListParams;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Supplies the bearer token attached to every request.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Fixed token, typically from `GARDEN_API_TOKEN`.
#[derive(Clone, Debug)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Called on 401/403 responses, e.g. to send the user back to sign-in.
pub trait UnauthorizedHandler: Send + Sync {
    fn on_unauthorized(&self, status: u16);
}

impl<F> UnauthorizedHandler for F
where
    F: Fn(u16) + Send + Sync,
{
    fn on_unauthorized(&self, status: u16) {
        self(status)
    }
}

/// REST client for the knowledge-base API.
#[derive(Clone)]
pub struct HttpRepository {
    client: Client,
    base: Url,
    tokens: Option<Arc<dyn TokenProvider>>,
    on_unauthorized: Option<Arc<dyn UnauthorizedHandler>>,
}

impl HttpRepository {
    /// Build a repository from configuration.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if the base URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| Error::ConfigError(format!("invalid base URL {}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(Error::ConfigError(format!(
                "base URL cannot hold paths: {}",
                config.base_url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("failed to build HTTP client: {e}")))?;

        info!("✓ HTTP repository initialized for {}", base);

        Ok(HttpRepository {
            client,
            base,
            tokens: config
                .api_token
                .clone()
                .map(|t| Arc::new(StaticToken(t)) as Arc<dyn TokenProvider>),
            on_unauthorized: None,
        })
    }

    pub fn with_token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.tokens = Some(Arc::new(provider));
        self
    }

    pub fn with_unauthorized_handler(mut self, handler: impl UnauthorizedHandler + 'static) -> Self {
        self.on_unauthorized = Some(Arc::new(handler));
        self
    }

    /// `{base}/{kind}[/{id}]`, with the id percent-encoded as one segment.
    fn url(&self, kind: EntityKind, id: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::ConfigError(format!("base URL cannot hold paths: {}", self.base)))?;
            segments.pop_if_empty().push(kind.as_str());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn with_query(mut url: Url, pairs: &[(String, String)]) -> Url {
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (k, v) in pairs {
                query.append_pair(k, v);
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match self.tokens.as_ref().and_then(|provider| provider.token()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if status.is_success() {
            return Ok(body.to_vec());
        }

        let code = status.as_u16();
        if code == 401 || code == 403 {
            warn!("⚠ Request rejected with {}, notifying unauthorized handler", code);
            if let Some(handler) = &self.on_unauthorized {
                handler.on_unauthorized(code);
            }
        }
        Err(Error::from_status(code, &String::from_utf8_lossy(&body)))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.send(request).await?;
        serde_json::from_slice(&body).map_err(|e| Error::DeserializationError(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

fn encode<P: Serialize>(payload: &P) -> Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|e| Error::SerializationError(e.to_string()))
}

impl DataRepository for HttpRepository {
    async fn fetch_list<T: CacheEntity>(&self, params: &ListParams) -> Result<Page<T>> {
        let url = Self::with_query(self.url(T::KIND, None)?, &params.to_query_pairs());
        debug!("» GET {}", url);
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn fetch_one<T: CacheEntity>(&self, id_or_slug: &str) -> Result<T> {
        let url = self.url(T::KIND, Some(id_or_slug))?;
        debug!("» GET {}", url);
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn fetch_cursor_page<T: CacheEntity>(
        &self,
        params: &ListParams,
        cursor: Option<&str>,
    ) -> Result<CursorPage<T>> {
        let mut pairs = params.to_query_pairs();
        if let Some(cursor) = cursor {
            pairs.push(("cursor".to_string(), cursor.to_string()));
        }
        let url = Self::with_query(self.url(T::KIND, None)?, &pairs);
        debug!("» GET {}", url);
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn create<T, P>(&self, payload: &P) -> Result<T>
    where
        T: CacheEntity,
        P: Serialize + Sync,
    {
        let body = encode(payload)?;
        let url = self.url(T::KIND, None)?;
        debug!("» POST {}", url);
        let request = self
            .request(Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.send_json(request).await
    }

    async fn update<T, P>(&self, id: &str, payload: &P) -> Result<T>
    where
        T: CacheEntity,
        P: Serialize + Sync,
    {
        let body = encode(payload)?;
        let url = self.url(T::KIND, Some(id))?;
        debug!("» PATCH {}", url);
        let request = self
            .request(Method::PATCH, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.send_json(request).await
    }

    async fn delete<T: CacheEntity>(&self, id: &str) -> Result<()> {
        let url = self.url(T::KIND, Some(id))?;
        debug!("» DELETE {}", url);
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
