use std::fmt;

use snafu::{Location, Snafu};

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a [`Transport`](crate::Transport) or by a body stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Malformed url '{url}': {reason}"))]
    MalformedUrl {
        #[snafu(implicit)]
        location: Location,
        url: String,
        reason: UrlDefect,
    },
    #[snafu(display("Request has no target url"))]
    MissingUrl {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Response is not bound to a transport result"))]
    MissingTransportResult {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Transport failed to complete the exchange"))]
    TransportFailure {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: BoxError,
    },
    #[snafu(display("Response body is no longer available after a failed read"))]
    BodyUnavailable {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Invalid header '{name}'"))]
    InvalidHeader {
        #[snafu(implicit)]
        location: Location,
        name: String,
        #[snafu(source)]
        error: http::Error,
    },
    #[snafu(display("Json error"))]
    Json {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: serde_json::Error,
    },
    #[snafu(display("Failed to construct the reqwest transport"))]
    TransportSetup {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: reqwest::Error,
    },
}

/// Why a url was rejected by [`parse_absolute`](crate::uri::parse_absolute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlDefect {
    Empty,
    Whitespace,
    Unparsable(url::ParseError),
    UnsupportedScheme(String),
    MissingHost,
}

impl fmt::Display for UrlDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlDefect::Empty => f.write_str("url is empty"),
            UrlDefect::Whitespace => f.write_str("url contains whitespace"),
            UrlDefect::Unparsable(e) => write!(f, "{e}"),
            UrlDefect::UnsupportedScheme(scheme) => write!(f, "unsupported scheme '{scheme}'"),
            UrlDefect::MissingHost => f.write_str("url has no host"),
        }
    }
}

impl Error {
    /// Returns true if the error originates from the transport rather than from
    /// request construction.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Error::TransportFailure { .. })
    }

    pub fn url_defect(&self) -> Option<&UrlDefect> {
        match self {
            Error::MalformedUrl { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        let location = std::panic::Location::caller();
        Error::Json {
            location: Location::new(location.file(), location.line(), location.column()),
            error,
        }
    }
}
