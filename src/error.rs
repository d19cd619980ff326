use std::time::Duration;

/// How the retry machinery treats a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transient; worth another attempt after a delay
    Retriable,
    /// Permanent; abort without retrying
    Fatal,
    /// Not classified by the engine; propagates unchanged
    Other,
}

/// All errors produced while scraping a rendered site
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("navigation to {url} timed out after {}s", .timeout.as_secs())]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("retriable response: {0}")]
    Retriable(String),

    #[error("fatal response: {0}")]
    Fatal(String),

    /// The retry budget ran out. `last` is the final retriable signal,
    /// re-raised unchanged and reachable through `source()`.
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ScrapeError>,
    },

    #[error("WebDriver session error: {0}")]
    Session(String),

    #[error("WebDriver command failed: {0}")]
    Command(#[from] fantoccini::error::CmdError),

    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Shorthand for a transient failure raised by a validation hook
    pub fn retriable(reason: impl Into<String>) -> Self {
        Self::Retriable(reason.into())
    }

    /// Shorthand for a permanent failure raised by a validation hook
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal(reason.into())
    }

    /// Classifies this error for the retry policy
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NavigationTimeout { .. } | Self::Retriable(_) => FailureKind::Retriable,
            Self::Fatal(_) => FailureKind::Fatal,
            _ => FailureKind::Other,
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.kind() == FailureKind::Retriable
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == FailureKind::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let timeout = ScrapeError::NavigationTimeout {
            url: "https://example.com".to_string(),
            timeout: Duration::from_secs(300),
        };
        assert_eq!(timeout.kind(), FailureKind::Retriable);
        assert!(ScrapeError::retriable("rate limited").is_retriable());
        assert!(ScrapeError::fatal("404 page").is_fatal());
        assert_eq!(
            ScrapeError::Session("no driver".to_string()).kind(),
            FailureKind::Other
        );
    }

    #[test]
    fn test_exhausted_is_terminal() {
        let err = ScrapeError::RetriesExhausted {
            attempts: 5,
            last: Box::new(ScrapeError::retriable("busy")),
        };
        assert_eq!(err.kind(), FailureKind::Other);
        assert_eq!(
            err.to_string(),
            "giving up after 5 attempts: retriable response: busy"
        );

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "retriable response: busy");
        match err {
            ScrapeError::RetriesExhausted { last, .. } => assert!(last.is_retriable()),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
