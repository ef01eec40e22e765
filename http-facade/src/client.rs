use std::{fmt, sync::Arc};

use snafu::ResultExt;
use tracing::{debug, instrument, warn};

use crate::{
    Body, Headers, HeadersValidation, Method, QueryArgs, Request, Response, Result, Settings,
    error::TransportFailureSnafu,
    transport::{ReqwestTransport, Transport, TransportResponse},
    uri,
};

/// Builds requests, hands them to a [`Transport`] and wraps what comes back.
///
/// The client holds no per-request state, only its transport and how invalid
/// headers are treated. Error statuses (4xx/5xx) are returned as regular responses,
/// only a failure to complete the exchange is an error.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    headers_validation: HeadersValidation,
}

impl Client {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            headers_validation: HeadersValidation::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(ReqwestTransport::from_settings(settings)?)
            .with_headers_validation(settings.headers_validation))
    }

    pub fn with_headers_validation(mut self, headers_validation: HeadersValidation) -> Self {
        self.headers_validation = headers_validation;
        self
    }

    pub fn headers_validation(&self) -> HeadersValidation {
        self.headers_validation
    }

    pub fn is_valid_url(&self, url: &str) -> bool {
        uri::is_valid_url(url)
    }

    pub async fn get(
        &self,
        url: &str,
        args: Option<&QueryArgs>,
        headers: Option<&Headers>,
    ) -> Result<Response> {
        self.perform(Method::Get, url, args, headers, None).await
    }

    pub async fn post(
        &self,
        url: &str,
        args: Option<&QueryArgs>,
        headers: Option<&Headers>,
        body: Option<Body>,
    ) -> Result<Response> {
        self.perform(Method::Post, url, args, headers, body).await
    }

    pub async fn put(
        &self,
        url: &str,
        args: Option<&QueryArgs>,
        headers: Option<&Headers>,
        body: Option<Body>,
    ) -> Result<Response> {
        self.perform(Method::Put, url, args, headers, body).await
    }

    pub async fn patch(
        &self,
        url: &str,
        args: Option<&QueryArgs>,
        headers: Option<&Headers>,
        body: Option<Body>,
    ) -> Result<Response> {
        self.perform(Method::Patch, url, args, headers, body).await
    }

    pub async fn options(
        &self,
        url: &str,
        args: Option<&QueryArgs>,
        headers: Option<&Headers>,
        body: Option<Body>,
    ) -> Result<Response> {
        self.perform(Method::Options, url, args, headers, body).await
    }

    pub async fn delete(
        &self,
        url: &str,
        args: Option<&QueryArgs>,
        headers: Option<&Headers>,
    ) -> Result<Response> {
        self.perform(Method::Delete, url, args, headers, None).await
    }

    pub async fn head(
        &self,
        url: &str,
        args: Option<&QueryArgs>,
        headers: Option<&Headers>,
    ) -> Result<Response> {
        self.perform(Method::Head, url, args, headers, None).await
    }

    /// Executes `request` against the transport. No retries are attempted here.
    ///
    /// A missing url or an invalid header fails before the transport is called.
    #[instrument(skip_all, fields(method = %request.method(), url))]
    pub async fn perform_request(&self, request: Request) -> Result<Response> {
        let request = request.into_transport_request(self.headers_validation)?;
        tracing::Span::current().record("url", request.url.as_str());

        match self.transport.execute(request).await {
            Ok(raw) => {
                debug!(status = %raw.status, "exchange completed");
                Ok(Self::wrap_response(raw))
            }
            Err(e) => {
                warn!("transport failed: {e}");
                Err(e).context(TransportFailureSnafu)
            }
        }
    }

    /// Wraps a result obtained directly from a transport.
    pub fn wrap_response(raw: TransportResponse) -> Response {
        Response::new(raw)
    }

    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = transport;
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    async fn perform(
        &self,
        method: Method,
        url: &str,
        args: Option<&QueryArgs>,
        headers: Option<&Headers>,
        body: Option<Body>,
    ) -> Result<Response> {
        let mut request = Request::new(method);
        request.set_url(url)?;

        for (k, v) in args.into_iter().flatten() {
            request.set_query_arg(k, v);
        }
        for (k, v) in headers.into_iter().flatten() {
            request.set_header(k, v);
        }
        if let Some(body) = body {
            request.set_body(body);
        }

        self.perform_request(request).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ReqwestTransport::new())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("headers_validation", &self.headers_validation)
            .finish_non_exhaustive()
    }
}
