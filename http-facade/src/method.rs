use serde::{Deserialize, Serialize};

/// The verbs a [`Request`](crate::Request) can carry.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Post,
    Put,
    #[default]
    Get,
    Patch,
    Options,
    Head,
    Delete,
}

impl From<Method> for http::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Get => http::Method::GET,
            Method::Patch => http::Method::PATCH,
            Method::Options => http::Method::OPTIONS,
            Method::Head => http::Method::HEAD,
            Method::Delete => http::Method::DELETE,
        }
    }
}
