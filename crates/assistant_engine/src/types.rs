use std::fmt;

use assistant_core::SessionEnd;

/// Failure of a request to the assistant backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unsupported(operation: &str) -> Self {
        Self::new(
            FailureKind::Unsupported,
            format!("{operation} is not supported by this backend"),
        )
    }

    /// Terminal state for a chat stream that failed with this error.
    pub fn session_end(&self) -> SessionEnd {
        match self.kind {
            FailureKind::Unauthorized if !self.message.is_empty() => {
                SessionEnd::Unauthorized(self.message.clone())
            }
            FailureKind::Unauthorized => SessionEnd::Unauthorized("HTTP 401".to_string()),
            _ => SessionEnd::NetworkError(self.to_string()),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// HTTP 401.
    Unauthorized,
    HttpStatus(u16),
    Timeout,
    Network,
    /// A side-channel response body did not have the expected shape.
    Decode,
    Unsupported,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response"),
            FailureKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_its_own_session_end() {
        let err = TransportError::new(FailureKind::Unauthorized, "401 Unauthorized");
        assert_eq!(
            err.session_end(),
            SessionEnd::Unauthorized("401 Unauthorized".to_string())
        );
    }

    #[test]
    fn other_failures_are_network_errors() {
        let err = TransportError::new(FailureKind::HttpStatus(502), "");
        assert_eq!(
            err.session_end(),
            SessionEnd::NetworkError("http status 502".to_string())
        );
    }
}
