//! A small HTTP client abstraction that keeps application code independent of the
//! library performing the network exchange.
//!
//! [`Request`] collects method, url, headers, query args and a body, [`Client`] hands
//! it to a [`Transport`] and wraps the result in a [`Response`].

mod body;
mod client;
mod error;
mod headers;
mod method;
mod request;
mod response;
mod settings;
mod status;
mod transport;
pub mod uri;

pub use http::{HeaderMap, StatusCode};
pub use url::Url;

pub use body::{
    Body, BodyKind, ByteStream, Content, EncodedBody, MultipartForm, Part, PartValue, Payload,
};
pub use client::Client;
pub use error::{BoxError, Error, Result, UrlDefect};
pub use headers::{Headers, HeadersValidation};
pub use method::Method;
pub use request::{QueryArgs, Request};
pub use response::Response;
pub use settings::Settings;
pub use status::StatusClass;
pub use transport::{
    ReqwestTransport, ReqwestTransportBuilder, ResponseBody, Transport, TransportRequest,
    TransportResponse,
};
