/**
 * Helper functions for the error shapes the list-watch session reacts to
 */
use crate::error::Error;
use kube::error::ErrorResponse;

/// HTTP status the API server uses when a watch cursor is too old to resume
pub const EXPIRED_CODE: u16 = 410;

/// Create an `Expired` error for a cursor the server can no longer resume from
#[must_use]
pub fn expired_error(message: &str) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: "Expired".to_string(),
        code: EXPIRED_CODE,
    }))
}

/// True if the error reports an expired watch cursor (`410 Gone`)
#[must_use]
pub fn is_expired(error: &Error) -> bool {
    matches!(error, Error::Kube(kube::Error::Api(response)) if response.code == EXPIRED_CODE)
}

/// Create a `Handler` error from a panic payload
#[must_use]
pub fn handler_panic_error(payload: &(dyn std::any::Any + Send)) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    Error::Handler(format!("panicked: {message}"))
}
