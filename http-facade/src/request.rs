use std::collections::BTreeMap;

use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::{
    BoxError, Headers, HeadersValidation, Method, Result,
    body::{Body, BodyKind, Content, MultipartForm, Part},
    error::MissingUrlSnafu,
    headers::normalize_name,
    transport::TransportRequest,
    uri::{merge_query, parse_absolute},
};

pub type QueryArgs = BTreeMap<String, String>;

/// The pieces of a single outbound HTTP call.
///
/// Only one body kind is held at a time. Adding content of a different kind than
/// the current one discards the previous body.
#[derive(Debug, Default)]
pub struct Request {
    method: Method,
    url: Option<Url>,
    headers: Headers,
    query_args: QueryArgs,
    body: Body,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Header names are case-insensitive, so `X-Token` and `x-token` are the same key.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(normalize_name(key), value.into());
    }

    /// Returns a snapshot of the current headers, keyed by lowercase name.
    pub fn headers(&self) -> Headers {
        self.headers.clone()
    }

    pub fn set_query_arg(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query_args.insert(key.into(), value.into());
    }

    /// Returns a snapshot of the current query args.
    pub fn query_args(&self) -> QueryArgs {
        self.query_args.clone()
    }

    /// Fails with [`Error::MalformedUrl`](crate::Error::MalformedUrl) unless `url` is an
    /// absolute http(s) url, leaving the previous url in place.
    pub fn set_url(&mut self, url: &str) -> Result<()> {
        self.url = Some(parse_absolute(url)?);
        Ok(())
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    pub fn set_body(&mut self, body: Body) {
        self.replace_body(body);
    }

    pub fn add_content(&mut self, content: impl Into<Content>) {
        self.replace_body(Body::Raw(content.into()));
    }

    pub fn add_json_content(&mut self, value: &impl Serialize) -> Result<()> {
        self.add_content(Content::json(value)?);
        Ok(())
    }

    pub fn add_form_url_encoded_content(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        if self.body.kind() != BodyKind::FormUrlEncoded {
            self.replace_body(Body::FormUrlEncoded(Vec::new()));
        }
        if let Body::FormUrlEncoded(pairs) = &mut self.body {
            pairs.push((key.into(), value.into()));
        }
    }

    pub fn add_multipart_bytes(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Bytes>,
        file_name: Option<&str>,
    ) {
        self.push_part(with_file_name(Part::bytes(key, value), file_name));
    }

    pub fn add_multipart_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.push_part(Part::text(key, value));
    }

    pub fn add_multipart_stream<S>(
        &mut self,
        key: impl Into<String>,
        value: S,
        file_name: Option<&str>,
    ) where
        S: Stream<Item = std::result::Result<Bytes, BoxError>> + Send + 'static,
    {
        self.push_part(with_file_name(Part::stream(key, value), file_name));
    }

    /// Consumes the request into what a [`Transport`](crate::Transport) executes, with the
    /// query args merged onto the url and the headers checked according to `validation`.
    pub fn into_transport_request(
        self,
        validation: HeadersValidation,
    ) -> Result<TransportRequest> {
        let Some(url) = self.url else {
            return MissingUrlSnafu.fail();
        };
        let headers = validation.apply(&self.headers)?;

        Ok(TransportRequest {
            method: self.method,
            url: merge_query(&url, &self.query_args),
            headers,
            body: self.body,
        })
    }

    fn push_part(&mut self, part: Part) {
        if self.body.kind() != BodyKind::Multipart {
            self.replace_body(Body::Multipart(MultipartForm::new()));
        }
        if let Body::Multipart(form) = &mut self.body {
            form.push(part);
        }
    }

    fn replace_body(&mut self, body: Body) {
        let previous = self.body.kind();
        if previous != BodyKind::Empty {
            debug!(%previous, new = %body.kind(), "discarding request body");
        }
        self.body = body;
    }
}

fn with_file_name(part: Part, file_name: Option<&str>) -> Part {
    match file_name {
        Some(name) => part.with_file_name(name),
        None => part,
    }
}
