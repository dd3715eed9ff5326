use serde::Serialize;

/// Outcome marker carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failure,
}

/// Standard envelope wrapping every API response.
///
/// Wrapping happens once, at the handler boundary. `body` is `null` on
/// failures.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub message: String,
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Builds a success envelope around `body`.
    pub fn success(body: T, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            body: Some(body),
        }
    }

    /// Builds a failure envelope with no body.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failure,
            message: message.into(),
            body: None,
        }
    }
}
