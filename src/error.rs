//! Probe error taxonomy and failure-scope classification.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    /// Caller misconfiguration: missing/invalid option or unknown action.
    #[error("config error: {0}")]
    Config(String),

    /// A locator did not resolve on the current page.
    #[error("element not found: {identifier}")]
    ElementNotFound { identifier: String },

    /// An input step ran before any successful visit established a page.
    #[error("no current page: step '{step}' requires a prior visit")]
    NoCurrentPage { step: String },

    /// Browser unreachable, or navigation failed.
    #[error("driver connection: {0}")]
    DriverConnection(String),

    /// A bounded external call exceeded its deadline.
    #[error("timeout after {seconds}s during {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// Malformed reply from the driver subprocess.
    #[error("driver protocol: {0}")]
    Protocol(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How far a step failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// Record the failed step and continue with the next one.
    Step,
    /// Abort the remaining plan; the partial report is still delivered.
    Run,
}

pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = ProbeError::ElementNotFound {
            identifier: "#submit".into(),
        };
        assert_eq!(e.to_string(), "element not found: #submit");

        let e = ProbeError::NoCurrentPage { step: "fill".into() };
        assert!(e.to_string().contains("requires a prior visit"));

        let e = ProbeError::Timeout {
            operation: "navigate".into(),
            seconds: 30,
        };
        assert_eq!(e.to_string(), "timeout after 30s during navigate");
    }
}
