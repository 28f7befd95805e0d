pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Active {
        session_id: SessionId,
    },
}

/// How a stream session stopped, as observed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The response body ended normally.
    Completed,
    Aborted,
    /// HTTP 401.
    Unauthorized(String),
    /// No response, a non-success status, or the body broke mid-flight.
    NetworkError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Aborted,
    NetworkError,
    Unauthorized,
}

impl SessionEnd {
    pub fn outcome(&self) -> SessionOutcome {
        match self {
            SessionEnd::Completed => SessionOutcome::Completed,
            SessionEnd::Aborted => SessionOutcome::Aborted,
            SessionEnd::Unauthorized(_) => SessionOutcome::Unauthorized,
            SessionEnd::NetworkError(_) => SessionOutcome::NetworkError,
        }
    }
}
