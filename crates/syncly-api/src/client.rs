// Collection resource HTTP client
//
// Wraps `reqwest::Client` with URL construction, JSON bodies, and status
// handling for a plain REST collection: GET the list, POST to create,
// PATCH / DELETE an item by id. Resource-specific wrappers (todos, ...)
// are thin typed layers on top of this.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for a JSON collection API.
///
/// Methods return decoded payloads; non-2xx responses surface as
/// [`Error::Http`] and never reach the caller as data.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `http://localhost:3000`); resource
    /// paths such as `/api/todos` are appended per call.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}`.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Build `{base}/{path}/{id}`.
    pub(crate) fn item_url(&self, path: &str, id: &str) -> Result<Url, Error> {
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    // ── Collection operations ────────────────────────────────────────

    /// GET the full collection, optionally with a serialized query string.
    pub async fn list<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        debug!("GET {}", url);

        let mut builder = self.http.get(url);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        let resp = builder.send().await?;
        let body = Self::read_body(resp).await?;

        serde_json::from_str(&body).map_err(|e| Self::decode_error(&e, body.clone()))
    }

    /// POST a new item. Returns the server's (opaque) response body.
    pub async fn create<B>(&self, path: &str, body: &B) -> Result<serde_json::Value, Error>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        debug!("POST {}", url);

        let resp = self.http.post(url).json(body).send().await?;
        Self::parse_value(resp).await
    }

    /// PATCH an item by id with a partial body.
    pub async fn update<B>(&self, path: &str, id: &str, body: &B) -> Result<serde_json::Value, Error>
    where
        B: Serialize + ?Sized,
    {
        let url = self.item_url(path, id)?;
        debug!("PATCH {}", url);

        let resp = self.http.patch(url).json(body).send().await?;
        Self::parse_value(resp).await
    }

    /// DELETE an item by id.
    pub async fn delete(&self, path: &str, id: &str) -> Result<serde_json::Value, Error> {
        let url = self.item_url(path, id)?;
        debug!("DELETE {}", url);

        let resp = self.http.delete(url).send().await?;
        Self::parse_value(resp).await
    }

    /// GET a path and return the raw bytes (file downloads).
    pub async fn download(&self, path: &str) -> Result<Bytes, Error> {
        let url = self.url(path)?;
        debug!("GET {} (download)", url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &body));
        }
        Ok(resp.bytes().await?)
    }

    // ── Response helpers ─────────────────────────────────────────────

    /// Read the body of a successful response, mapping non-2xx to `Error::Http`.
    async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &body));
        }
        let body = resp.text().await?;
        trace!(len = body.len(), "response body received");
        Ok(body)
    }

    /// Decode an opaque JSON result. An empty body decodes as `null`.
    async fn parse_value(resp: reqwest::Response) -> Result<serde_json::Value, Error> {
        let body = Self::read_body(resp).await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| Self::decode_error(&e, body.clone()))
    }

    fn status_error(status: reqwest::StatusCode, body: &str) -> Error {
        let preview: String = body.chars().take(200).collect();
        Error::Http {
            status: status.as_u16(),
            body: preview,
        }
    }

    fn decode_error(err: &serde_json::Error, body: String) -> Error {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{err} (body preview: {preview:?})"),
            body,
        }
    }
}
