//! Request payloads.
//!
//! A request carries at most one [`Body`] kind at a time. Form and multipart bodies
//! accumulate entries, raw content replaces whatever was there before.

use std::{fmt, pin::Pin};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use serde::Serialize;
use url::form_urlencoded;

use crate::{BoxError, Result};

pub type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, BoxError>> + Send>>;

pub(crate) const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
const OCTET_STREAM: &str = "application/octet-stream";
const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::Display)]
pub enum BodyKind {
    Empty,
    Raw,
    FormUrlEncoded,
    Multipart,
}

#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Raw(Content),
    FormUrlEncoded(Vec<(String, String)>),
    Multipart(MultipartForm),
}

/// An opaque payload sent as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    data: Bytes,
    content_type: Option<String>,
}

#[derive(Debug)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

#[derive(Debug)]
pub struct Part {
    name: String,
    value: PartValue,
    file_name: Option<String>,
}

pub enum PartValue {
    Bytes(Bytes),
    Text(String),
    Stream(ByteStream),
}

/// A body flattened into wire bytes, ready for a transport.
#[derive(Debug)]
pub struct EncodedBody {
    pub content_type: Option<String>,
    pub payload: Payload,
}

pub enum Payload {
    Empty,
    /// Fully materialized, can be sent more than once.
    Bytes(Bytes),
    Stream(ByteStream),
}

impl Body {
    pub fn kind(&self) -> BodyKind {
        match self {
            Body::Empty => BodyKind::Empty,
            Body::Raw(_) => BodyKind::Raw,
            Body::FormUrlEncoded(_) => BodyKind::FormUrlEncoded,
            Body::Multipart(_) => BodyKind::Multipart,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn as_form(&self) -> Option<&[(String, String)]> {
        match self {
            Body::FormUrlEncoded(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn as_multipart(&self) -> Option<&MultipartForm> {
        match self {
            Body::Multipart(form) => Some(form),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Content> {
        match self {
            Body::Raw(content) => Some(content),
            _ => None,
        }
    }

    pub fn encode(self) -> EncodedBody {
        match self {
            Body::Empty => EncodedBody {
                content_type: None,
                payload: Payload::Empty,
            },
            Body::Raw(content) => EncodedBody {
                content_type: content.content_type,
                payload: Payload::Bytes(content.data),
            },
            Body::FormUrlEncoded(pairs) => {
                let encoded = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish();
                EncodedBody {
                    content_type: Some(FORM_URL_ENCODED.to_string()),
                    payload: Payload::Bytes(Bytes::from(encoded)),
                }
            }
            Body::Multipart(form) => EncodedBody {
                content_type: Some(form.content_type()),
                payload: form.into_payload(),
            },
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Raw(c) => f.debug_tuple("Raw").field(c).finish(),
            Body::FormUrlEncoded(p) => f.debug_tuple("FormUrlEncoded").field(p).finish(),
            Body::Multipart(m) => f.debug_tuple("Multipart").field(m).finish(),
        }
    }
}

impl Content {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn json(value: &impl Serialize) -> Result<Self> {
        Ok(Self::new(serde_json::to_vec(value)?).with_content_type("application/json"))
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl From<Bytes> for Content {
    fn from(value: Bytes) -> Self {
        Self::new(value)
    }
}

impl From<Vec<u8>> for Content {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Self::new(value).with_content_type("text/plain; charset=utf-8")
    }
}

impl From<&'static str> for Content {
    fn from(value: &'static str) -> Self {
        Self::new(value).with_content_type("text/plain; charset=utf-8")
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!(
            "{:016x}-{:016x}",
            rand::random::<u64>(),
            rand::random::<u64>()
        ))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Returns true if any part is backed by a stream, which makes the encoded body
    /// single-use.
    pub fn is_streaming(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p.value, PartValue::Stream(_)))
    }

    pub fn into_payload(self) -> Payload {
        match self.buffered() {
            Some(bytes) => Payload::Bytes(bytes),
            None => Payload::Stream(self.into_stream()),
        }
    }

    /// Encodes the whole form in memory, or `None` if a part is backed by a stream.
    fn buffered(&self) -> Option<Bytes> {
        let mut buf = BytesMut::new();
        for part in &self.parts {
            let data = part.value.as_buffered()?;
            buf.extend_from_slice(&part.header(&self.boundary));
            buf.extend_from_slice(data);
            buf.extend_from_slice(CRLF);
        }
        buf.extend_from_slice(&closing_delimiter(&self.boundary));
        Some(buf.freeze())
    }

    pub fn into_stream(self) -> ByteStream {
        let boundary = self.boundary;
        let mut segments: Vec<ByteStream> = Vec::with_capacity(self.parts.len() * 3 + 1);

        for part in self.parts {
            segments.push(once(part.header(&boundary)));
            segments.push(match part.value {
                PartValue::Bytes(b) => once(b),
                PartValue::Text(t) => once(Bytes::from(t)),
                PartValue::Stream(s) => s,
            });
            segments.push(once(Bytes::from_static(CRLF)));
        }
        segments.push(once(closing_delimiter(&boundary)));

        stream::iter(segments).flatten().boxed()
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl PartValue {
    fn as_buffered(&self) -> Option<&[u8]> {
        match self {
            PartValue::Bytes(b) => Some(b),
            PartValue::Text(t) => Some(t.as_bytes()),
            PartValue::Stream(_) => None,
        }
    }
}

impl Part {
    pub fn bytes(name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self::new(name, PartValue::Bytes(value.into()))
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, PartValue::Text(value.into()))
    }

    pub fn stream<S>(name: impl Into<String>, value: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, BoxError>> + Send + 'static,
    {
        Self::new(name, PartValue::Stream(value.boxed()))
    }

    fn new(name: impl Into<String>, value: PartValue) -> Self {
        Self {
            name: name.into(),
            value,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &PartValue {
        &self.value
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    fn header(&self, boundary: &str) -> Bytes {
        let mut header = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"",
            escape_quoted(&self.name)
        );
        if let Some(file_name) = &self.file_name {
            header.push_str(&format!("; filename=\"{}\"", escape_quoted(file_name)));
            header.push_str(&format!("\r\nContent-Type: {OCTET_STREAM}"));
        }
        header.push_str("\r\n\r\n");
        Bytes::from(header)
    }
}

impl fmt::Debug for PartValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartValue::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            PartValue::Text(t) => f.debug_tuple("Text").field(t).finish(),
            PartValue::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Payload::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl Payload {
    /// Drains the payload into memory.
    pub async fn collect(self) -> std::result::Result<Bytes, BoxError> {
        match self {
            Payload::Empty => Ok(Bytes::new()),
            Payload::Bytes(b) => Ok(b),
            Payload::Stream(s) => {
                let buf = s
                    .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                        buf.extend_from_slice(&chunk);
                        Ok(buf)
                    })
                    .await?;
                Ok(buf.freeze())
            }
        }
    }
}

pub(crate) fn once(bytes: Bytes) -> ByteStream {
    stream::once(async move { Ok(bytes) }).boxed()
}

fn closing_delimiter(boundary: &str) -> Bytes {
    Bytes::from(format!("--{boundary}--\r\n"))
}

// Same escaping as browsers use for multipart/form-data names
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
