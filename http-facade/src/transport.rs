//! The seam between the request/response model and the component that actually
//! moves bytes over the network.

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::{BoxError, Method, body::Body, body::ByteStream};

mod network;

pub use network::{ReqwestTransport, ReqwestTransportBuilder};

/// Performs a single exchange.
///
/// Implementations own retries, timeouts, redirects and connection reuse. Any error
/// returned here is surfaced to callers as
/// [`Error::TransportFailure`](crate::Error::TransportFailure).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, BoxError>;
}

/// A fully built request with the query args already merged onto `url` and the
/// headers validated.
#[derive(Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
}

/// The raw result of an exchange.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

pub enum ResponseBody {
    Streaming(ByteStream),
    Buffered(Bytes),
    /// A previous read failed part way through the stream.
    Failed,
}

impl TransportResponse {
    pub fn new(status: StatusCode, url: Url) -> Self {
        Self {
            status,
            url,
            headers: HeaderMap::new(),
            body: ResponseBody::Buffered(Bytes::new()),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Buffered(body.into());
        self
    }

    pub fn with_stream(mut self, body: ByteStream) -> Self {
        self.body = ResponseBody::Streaming(body);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

impl ResponseBody {
    /// Drains a streaming body into memory, once. Returns `None` if an earlier read
    /// failed.
    pub(crate) async fn buffer(&mut self) -> Option<std::result::Result<Bytes, BoxError>> {
        let stream = match self {
            ResponseBody::Buffered(bytes) => return Some(Ok(bytes.clone())),
            ResponseBody::Failed => return None,
            ResponseBody::Streaming(stream) => stream,
        };

        let mut buf = BytesMut::new();
        loop {
            match stream.try_next().await {
                Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    *self = ResponseBody::Failed;
                    return Some(Err(e));
                }
            }
        }

        let bytes = buf.freeze();
        *self = ResponseBody::Buffered(bytes.clone());
        Some(Ok(bytes))
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Streaming(_) => f.write_str("Streaming"),
            ResponseBody::Buffered(b) => f.debug_tuple("Buffered").field(&b.len()).finish(),
            ResponseBody::Failed => f.write_str("Failed"),
        }
    }
}
