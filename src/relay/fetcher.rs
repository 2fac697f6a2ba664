//! Remote page fetching.
//!
//! [`PageSource`] is the seam between the relay state machine and the network.
//! [`HttpFetcher`] is the production implementation; tests substitute scripted
//! sources.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use url::Url;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};

/// Lazy, finite, non-restartable sequence of body chunks
pub type ChunkStream = BoxStream<'static, std::result::Result<Bytes, FetchError>>;

/// A validated response whose body has not been read yet
pub struct FetchedBody {
    /// Declared content type, if the origin sent one
    pub content_type: Option<String>,
    /// Declared body length, 0 when not advertised
    pub declared_total: u64,
    /// Body chunks; dropping the stream releases the connection
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for FetchedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedBody")
            .field("content_type", &self.content_type)
            .field("declared_total", &self.declared_total)
            .finish_non_exhaustive()
    }
}

/// Source of remote pages
///
/// `open` performs exactly one attempt; implementations must not retry.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Issue the request and validate the response headers
    ///
    /// # Errors
    ///
    /// - [`FetchError::RemoteStatus`] for a non-success status
    /// - [`FetchError::UnsupportedContentType`] when the body is not hypertext
    /// - [`FetchError::Transfer`] when the request itself fails
    async fn open(&self, url: &Url) -> std::result::Result<FetchedBody, FetchError>;
}

/// Media-type essence of a content-type value (`text/html; charset=x` → `text/html`)
pub fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Reject anything that is not one of the `accepted` media types
pub fn check_content_type(
    content_type: Option<&str>,
    accepted: &[String],
) -> std::result::Result<(), FetchError> {
    let declared = content_type.map(str::trim).filter(|ct| !ct.is_empty());
    let Some(declared) = declared else {
        return Err(FetchError::UnsupportedContentType {
            content_type: "unknown".into(),
        });
    };

    let essence = media_type_essence(declared);
    if accepted.iter().any(|media| media.eq_ignore_ascii_case(&essence)) {
        Ok(())
    } else {
        Err(FetchError::UnsupportedContentType {
            content_type: declared.to_string(),
        })
    }
}

/// reqwest-backed [`PageSource`]
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    accepted_media_types: Vec<String>,
    max_body_bytes: Option<u64>,
}

impl HttpFetcher {
    /// Build the HTTP client from the fetch settings
    ///
    /// The configured user agent is sent with every request.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            accepted_media_types: config.accepted_media_types.clone(),
            max_body_bytes: config.max_body_bytes,
        })
    }
}

/// Header value as sent, with bytes outside UTF-8 replaced
fn header_text(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

fn describe_request_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::transfer(format!("request to '{}' timed out", url))
    } else if error.is_connect() {
        FetchError::transfer(format!("connection failed for '{}': {}", url, error))
    } else {
        FetchError::transfer(format!("request to '{}' failed: {}", url, error))
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn open(&self, url: &Url) -> std::result::Result<FetchedBody, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| describe_request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::RemoteStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let content_type = response.headers().get(CONTENT_TYPE).map(header_text);
        check_content_type(content_type.as_deref(), &self.accepted_media_types)?;

        let declared_total = response.content_length().unwrap_or(0);
        if let Some(limit) = self.max_body_bytes
            && declared_total > limit
        {
            return Err(FetchError::transfer(format!(
                "declared body of {} bytes exceeds limit of {} bytes",
                declared_total, limit
            )));
        }

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            content_type = content_type.as_deref().unwrap_or("unknown"),
            declared_total,
            "Response headers accepted"
        );

        let limit = self.max_body_bytes;
        let mut seen: u64 = 0;
        let chunks = response
            .bytes_stream()
            .map(move |chunk| {
                let chunk = chunk.map_err(|e| FetchError::transfer(format!("stream error: {}", e)))?;
                seen += chunk.len() as u64;
                if let Some(limit) = limit
                    && seen > limit
                {
                    return Err(FetchError::transfer(format!(
                        "body exceeds limit of {} bytes",
                        limit
                    )));
                }
                Ok(chunk)
            })
            .boxed();

        Ok(FetchedBody {
            content_type,
            declared_total,
            chunks,
        })
    }
}
