use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use http::{
    HeaderMap, HeaderValue,
    header::{CONTENT_TYPE, USER_AGENT},
};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_tracing::TracingMiddleware;
use snafu::ResultExt;

use crate::{
    BoxError, Result, Settings,
    body::Payload,
    error::{InvalidHeaderSnafu, TransportSetupSnafu},
    transport::{ResponseBody, Transport, TransportRequest, TransportResponse},
};

const DEFAULT_MAX_RETRIES: u32 = 3;

/// [`Transport`] backed by reqwest.
///
/// Bodies that can be replayed are sent with transient-failure retries, streaming
/// bodies are sent exactly once.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    retrying: ClientWithMiddleware,
    single_shot: ClientWithMiddleware,
}

#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    client: reqwest::ClientBuilder,
    max_retries: u32,
    user_agent: Option<String>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::new_with(Client::new(), DEFAULT_MAX_RETRIES)
    }

    fn new_with(inner: Client, max_retries: u32) -> Self {
        let retrying = ClientBuilder::new(inner.clone())
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(
                ExponentialBackoff::builder().build_with_max_retries(max_retries),
            ))
            .build();
        let single_shot = ClientBuilder::new(inner)
            .with(TracingMiddleware::default())
            .build();

        Self {
            retrying,
            single_shot,
        }
    }

    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut builder = Self::builder()
            .gzip(settings.gzip)
            .max_retries(settings.max_retries);

        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &settings.user_agent {
            builder = builder.user_agent(user_agent);
        }

        builder.build()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, BoxError> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let encoded = body.encode();

        let mut header_map = headers;
        // Explicit headers override the body's content type
        if let Some(content_type) = encoded.content_type {
            header_map
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::try_from(content_type)?);
        }

        let (client, body) = match encoded.payload {
            Payload::Empty => (&self.retrying, None),
            Payload::Bytes(bytes) => (&self.retrying, Some(reqwest::Body::from(bytes))),
            Payload::Stream(stream) => (
                &self.single_shot,
                Some(reqwest::Body::wrap_stream(stream)),
            ),
        };

        let mut builder = client.request(method.into(), url).headers(header_map);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let stream = response
            .bytes_stream()
            .map_err(|e| Box::new(e) as BoxError)
            .boxed();

        Ok(TransportResponse {
            status,
            url,
            headers,
            body: ResponseBody::Streaming(stream),
        })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            client: reqwest::ClientBuilder::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: None,
        }
    }
}

impl ReqwestTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.timeout(timeout);
        self
    }

    pub fn gzip(mut self, enable: bool) -> Self {
        self.client = self.client.gzip(enable);
        self
    }

    /// Checked in [`build`](Self::build).
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn build(self) -> Result<ReqwestTransport> {
        let mut client = self.client;

        if let Some(user_agent) = self.user_agent {
            let value = HeaderValue::try_from(user_agent)
                .map_err(http::Error::from)
                .context(InvalidHeaderSnafu {
                    name: USER_AGENT.as_str(),
                })?;
            client = client.default_headers(HeaderMap::from_iter([(USER_AGENT, value)]));
        }

        let inner = client.build().context(TransportSetupSnafu)?;
        Ok(ReqwestTransport::new_with(inner, self.max_retries))
    }
}
