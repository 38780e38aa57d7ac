use medboard_tokens::RefreshError;
use reqwest::StatusCode;
use thiserror::Error;

/// The outcome of a failed call to the backend
///
/// Every failure is tagged with its kind so callers can branch on it
/// without inspecting transport internals.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or its response not received
    ///
    /// Includes connection failures and timeouts.
    #[error("unable to reach the backend")]
    Network(#[source] reqwest_middleware::Error),

    /// The backend answered with a non-success status
    ///
    /// A `401` here means the request was still refused after the session
    /// was renewed, or that no renewal was possible for this request.
    #[error("backend responded with {status}")]
    Http {
        /// The status returned
        status: StatusCode,
        /// The response body, as text
        body: String,
    },

    /// The session could not be renewed and the user must log in again
    #[error("session expired, login required")]
    SessionExpired(#[source] RefreshError),

    /// A response body did not have the expected shape
    #[error("unable to decode response body")]
    Decode(#[source] serde_json::Error),

    /// A local file could not be read
    #[error("unable to read local file")]
    Io(#[from] std::io::Error),

    /// A request URL could not be built
    #[error("invalid request URL")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// The HTTP status, if the backend answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the user has to log in again
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}

impl From<reqwest_middleware::Error> for ApiError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Middleware(err) => match err.downcast::<RefreshError>() {
                Ok(refresh) => Self::SessionExpired(refresh),
                Err(err) => Self::Network(reqwest_middleware::Error::Middleware(err)),
            },
            err => Self::Network(err),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(reqwest_middleware::Error::Reqwest(err))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn refresh_failures_become_session_expired() {
        let err = ApiError::from(reqwest_middleware::Error::middleware(RefreshError::Rejected));
        assert!(err.is_session_expired());
        assert!(matches!(err, ApiError::SessionExpired(RefreshError::Rejected)));
    }

    #[test]
    fn other_middleware_failures_are_network_errors() {
        let err = ApiError::from(reqwest_middleware::Error::middleware(io::Error::new(
            io::ErrorKind::TimedOut,
            "timed out",
        )));
        assert!(matches!(err, ApiError::Network(_)));
        assert!(!err.is_session_expired());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn http_errors_expose_their_status() {
        let err = ApiError::Http {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "backend responded with 404 Not Found");
    }
}
