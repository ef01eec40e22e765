use std::collections::HashMap;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use snafu::ResultExt;
use tracing::warn;

use crate::{Result, error::InvalidHeaderSnafu};

/// Request headers keyed by lowercase name.
pub type Headers = HashMap<String, String>;

/// What to do with header names or values that are not valid HTTP.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize, strum::Display)]
pub enum HeadersValidation {
    /// Fail the request with [`Error::InvalidHeader`](crate::Error::InvalidHeader).
    #[default]
    Yes,
    /// Drop the offending header and send the rest.
    No,
}

impl HeadersValidation {
    /// Converts `headers` into a typed map, failing or skipping invalid entries.
    pub fn apply(self, headers: &Headers) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(headers.len());

        for (name, value) in headers {
            match (self, to_header(name, value)) {
                (_, Ok((name, value))) => {
                    map.insert(name, value);
                }
                (HeadersValidation::Yes, Err(error)) => {
                    return Err(error).context(InvalidHeaderSnafu { name: name.as_str() });
                }
                (HeadersValidation::No, Err(error)) => {
                    warn!("skipping invalid header '{name}': {error}");
                }
            }
        }

        Ok(map)
    }
}

pub(crate) fn normalize_name(name: impl Into<String>) -> String {
    let mut name = name.into();
    name.make_ascii_lowercase();
    name
}

fn to_header(
    name: &str,
    value: &str,
) -> std::result::Result<(HeaderName, HeaderValue), http::Error> {
    Ok((HeaderName::try_from(name)?, HeaderValue::try_from(value)?))
}
