use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Coarse classification of a response status by its leading digit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum StatusClass {
    /// 2xx, and the provisional 1xx range
    Successful,
    /// 3xx
    Redirected,
    /// 4xx
    Error,
    /// 5xx and above
    Fault,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        match status.as_u16() / 100 {
            1 | 2 => StatusClass::Successful,
            3 => StatusClass::Redirected,
            4 => StatusClass::Error,
            _ => StatusClass::Fault,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == StatusClass::Successful
    }
}

impl From<StatusCode> for StatusClass {
    fn from(value: StatusCode) -> Self {
        Self::of(value)
    }
}
