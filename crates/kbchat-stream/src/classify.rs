//! Maps raw transport, HTTP and application failures into [`ChatError`].

use kbchat_core::error::{Cause, ChatError, ErrorKind};
use tokio_util::sync::CancellationToken;

/// Every low-level failure the layer can observe.
#[derive(Debug)]
pub enum RawFailure {
    /// The HTTP client failed before or while sending the request.
    Transport(reqwest::Error),
    /// The backend answered with a non-2xx status.
    Status { status: u16, body: String },
    /// The backend answered 2xx with a non-success envelope code.
    Application { code: String, info: String },
    /// Reading the next body chunk failed mid-stream.
    Read(Cause),
    /// The caller's token fired.
    Cancelled,
}

const NETWORK_MESSAGE: &str =
    "Network connection failed, check your network or whether the backend service is running";
const TIMEOUT_MESSAGE: &str = "Request timed out, check your network connection or retry later";
const STREAM_LOST_MESSAGE: &str = "Connection lost while receiving the response";
const UNKNOWN_MESSAGE: &str = "An unknown error occurred, please retry later";

/// Classify `failure`.
///
/// When `cancel` has already been triggered, transport and read failures are
/// the direct consequence of the abort and classify as
/// [`ErrorKind::Cancelled`]. Completed HTTP responses keep their own
/// classification.
pub fn classify(failure: RawFailure, cancel: Option<&CancellationToken>) -> ChatError {
    let cancelled = cancel.is_some_and(CancellationToken::is_cancelled);
    match failure {
        RawFailure::Cancelled => ChatError::cancelled(),
        RawFailure::Transport(_) | RawFailure::Read(_) if cancelled => ChatError::cancelled(),
        RawFailure::Transport(e) => classify_reqwest(e),
        RawFailure::Status { status, body } => status_error(status, body),
        RawFailure::Application { code, info } => {
            let message = if info.trim().is_empty() {
                format!("Request failed with code {code}")
            } else {
                info
            };
            ChatError::api(message)
        }
        RawFailure::Read(cause) => match cause.downcast::<reqwest::Error>() {
            Ok(e) if e.is_timeout() => ChatError::with_cause(ErrorKind::Network, TIMEOUT_MESSAGE, e),
            Ok(e) if e.is_decode() => ChatError::with_cause(ErrorKind::Unknown, UNKNOWN_MESSAGE, e),
            Ok(e) => ChatError::with_cause(ErrorKind::Network, STREAM_LOST_MESSAGE, e),
            Err(other) => ChatError::with_cause(ErrorKind::Network, STREAM_LOST_MESSAGE, other),
        },
    }
}

fn classify_reqwest(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        return ChatError::with_cause(ErrorKind::Network, TIMEOUT_MESSAGE, e);
    }
    if let Some(status) = e.status() {
        return status_error(status.as_u16(), String::new());
    }
    if e.is_builder() {
        let message = format!("Invalid request: {e}");
        return ChatError::with_cause(ErrorKind::Validation, message, e);
    }
    if e.is_decode() {
        let message = format!("Malformed response from server: {e}");
        return ChatError::with_cause(ErrorKind::Unknown, message, e);
    }
    if e.is_connect() || e.is_request() || e.is_body() {
        return ChatError::with_cause(ErrorKind::Network, NETWORK_MESSAGE, e);
    }
    ChatError::with_cause(ErrorKind::Unknown, UNKNOWN_MESSAGE, e)
}

fn status_error(status: u16, body: String) -> ChatError {
    let message = status_message(status);
    if body.trim().is_empty() {
        ChatError::api(message)
    } else {
        ChatError::with_cause(ErrorKind::Api, message, body)
    }
}

/// User-facing message for a non-2xx status.
pub fn status_message(status: u16) -> String {
    match status {
        404 => "The requested resource does not exist, check the API configuration".to_string(),
        500 => "Internal server error, please retry later".to_string(),
        401 | 403 => "Access denied, check your credentials".to_string(),
        other => format!("Server returned error: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_api_errors() {
        for (status, needle) in [
            (404, "does not exist"),
            (500, "Internal server error"),
            (401, "Access denied"),
            (403, "Access denied"),
            (502, "Server returned error: 502"),
        ] {
            let err = classify(RawFailure::Status { status, body: String::new() }, None);
            assert_eq!(err.kind(), ErrorKind::Api);
            assert!(err.message().contains(needle), "status {status}: {}", err.message());
            assert!(err.cause().is_none());
        }
    }

    #[test]
    fn status_body_is_kept_as_cause() {
        let err = classify(
            RawFailure::Status {
                status: 500,
                body: "model not loaded".to_string(),
            },
            None,
        );
        assert_eq!(err.cause().unwrap().to_string(), "model not loaded");
    }

    #[test]
    fn application_code_is_api_error() {
        let err = classify(
            RawFailure::Application {
                code: "0001".to_string(),
                info: "knowledge base not found".to_string(),
            },
            None,
        );
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.message(), "knowledge base not found");

        let err = classify(
            RawFailure::Application {
                code: "0001".to_string(),
                info: String::new(),
            },
            None,
        );
        assert_eq!(err.message(), "Request failed with code 0001");
    }

    #[test]
    fn read_failure_is_network_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = classify(RawFailure::Read(Box::new(io)), None);
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.cause().is_some());
    }

    #[test]
    fn read_failure_after_cancel_is_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionAborted, "aborted");
        let err = classify(RawFailure::Read(Box::new(io)), Some(&token));
        assert!(err.is_cancelled());
    }

    #[test]
    fn completed_status_wins_over_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        let err = classify(RawFailure::Status { status: 500, body: String::new() }, Some(&token));
        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[test]
    fn explicit_cancel_is_cancelled() {
        assert!(classify(RawFailure::Cancelled, None).is_cancelled());
    }
}
