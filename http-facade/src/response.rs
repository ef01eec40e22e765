use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use snafu::{OptionExt, ResultExt};
use url::Url;

use crate::{
    Result, StatusClass,
    body::{self, ByteStream},
    error::{BodyUnavailableSnafu, MissingTransportResultSnafu, TransportFailureSnafu},
    transport::{ResponseBody, TransportResponse},
};

/// One completed exchange.
///
/// The body is buffered on the first call to any of the `read_as_*` methods, so they
/// can be called any number of times and in any order. Use [`Response::into_stream`]
/// to consume a large body without buffering it.
#[derive(Debug, Default)]
pub struct Response(Option<TransportResponse>);

impl Response {
    pub fn new(raw: TransportResponse) -> Self {
        Self(Some(raw))
    }

    /// A response that is not bound to any transport result.
    pub fn unbound() -> Self {
        Self(None)
    }

    pub fn status_code(&self) -> Result<StatusCode> {
        Ok(self.raw()?.status)
    }

    pub fn status_class(&self) -> Result<StatusClass> {
        self.status_code().map(StatusClass::of)
    }

    pub fn headers(&self) -> Result<&HeaderMap> {
        Ok(&self.raw()?.headers)
    }

    /// The final url of the exchange, after any redirects the transport followed.
    pub fn url(&self) -> Result<&Url> {
        Ok(&self.raw()?.url)
    }

    pub fn raw_result(&self) -> Option<&TransportResponse> {
        self.0.as_ref()
    }

    pub fn into_raw_result(self) -> Option<TransportResponse> {
        self.0
    }

    pub async fn read_as_bytes(&mut self) -> Result<Bytes> {
        let raw = self.0.as_mut().context(MissingTransportResultSnafu)?;
        raw.body
            .buffer()
            .await
            .context(BodyUnavailableSnafu)?
            .context(TransportFailureSnafu)
    }

    /// Decodes the body as UTF-8, replacing invalid sequences.
    pub async fn read_as_text(&mut self) -> Result<String> {
        let bytes = self.read_as_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Returns a stream over the buffered body.
    pub async fn read_as_stream(&mut self) -> Result<ByteStream> {
        let bytes = self.read_as_bytes().await?;
        Ok(body::once(bytes))
    }

    pub async fn read_as_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.read_as_bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Consumes the response and hands out the body without buffering it.
    pub fn into_stream(self) -> Result<ByteStream> {
        let raw = self.0.context(MissingTransportResultSnafu)?;
        match raw.body {
            ResponseBody::Streaming(stream) => Ok(stream),
            ResponseBody::Buffered(bytes) => Ok(body::once(bytes)),
            ResponseBody::Failed => BodyUnavailableSnafu.fail(),
        }
    }

    fn raw(&self) -> Result<&TransportResponse> {
        self.0.as_ref().context(MissingTransportResultSnafu)
    }
}

impl From<TransportResponse> for Response {
    fn from(value: TransportResponse) -> Self {
        Self::new(value)
    }
}
