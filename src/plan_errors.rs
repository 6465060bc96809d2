//! # Plan Error Types Module
//!
//! Error types for loading and updating meal plans. Two families exist:
//! transport/lookup failures (network, timeout, HTTP status, missing row) and
//! shape failures (a payload arrived but holds no usable days).

/// Errors raised while fetching or swapping a plan
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// Plan id or access token missing from the launch parameters
    MissingParams,
    /// Request exceeded the client-side timeout
    Timeout(String),
    /// Server answered with a non-success status
    Http(u16),
    /// Connection or body decoding failure
    Transport(String),
    /// Backend reported an error in its payload
    Api(String),
    /// No spreadsheet row for the requested user
    RowNotFound(String),
    /// Payload present but not convertible to a plan with days
    InvalidFormat,
    /// Swap action rejected by the backend
    ActionFailed(String),
    /// Action not available for this plan source
    Unsupported(String),
}

impl PlanError {
    /// Whether this is a shape failure rather than a transport/lookup one
    pub fn is_shape_failure(&self) -> bool {
        matches!(self, PlanError::InvalidFormat)
    }
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::MissingParams => write!(f, "Missing plan_id or token"),
            PlanError::Timeout(msg) => write!(f, "Timeout error: {msg}"),
            PlanError::Http(status) => write!(f, "HTTP {status}"),
            PlanError::Transport(msg) => write!(f, "Transport error: {msg}"),
            PlanError::Api(msg) => write!(f, "API error: {msg}"),
            PlanError::RowNotFound(user) => write!(f, "No plan row for user {user}"),
            PlanError::InvalidFormat => write!(f, "Invalid plan format (missing days[])"),
            PlanError::ActionFailed(msg) => write!(f, "Action failed: {msg}"),
            PlanError::Unsupported(action) => write!(f, "Unsupported action: {action}"),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<reqwest::Error> for PlanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlanError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            PlanError::Http(status.as_u16())
        } else {
            PlanError::Transport(err.to_string())
        }
    }
}
