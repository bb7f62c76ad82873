use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Every way a single invocation can fail.
///
/// Each stage of the pipeline returns one of these and nothing is retried;
/// `main` prints the message of the first one it sees.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Failed to read ABI file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ABI could not be parsed: {0}")]
    Parse(String),

    #[error("Could not reach the ABI explorer: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Failed to fetch ABI from explorer: {0}")]
    Lookup(String),

    #[error("Method '{method}' not found. Available methods: {}", .available.join(", "))]
    MethodNotFound {
        method: String,
        available: Vec<String>,
    },

    #[error("{0}")]
    Argument(String),

    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// SDK errors pass through with their own text.
    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Transaction(String),

    #[error("{stage} timed out after {}s", .elapsed.as_secs())]
    Timeout {
        stage: &'static str,
        elapsed: Duration,
    },
}

impl InvokeError {
    pub fn argument<S: Into<String>>(message: S) -> Self {
        Self::Argument(message.into())
    }

    pub fn transport<E: std::fmt::Display>(error: E) -> Self {
        Self::Transport(error.to_string())
    }
}

pub type InvokeResult<T> = std::result::Result<T, InvokeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_found_lists_methods() {
        let err = InvokeError::MethodNotFound {
            method: "doesNotExist".to_string(),
            available: vec!["foo".to_string(), "bar".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Method 'doesNotExist' not found. Available methods: foo, bar"
        );
    }

    #[test]
    fn test_lookup_carries_service_message() {
        let err = InvokeError::Lookup("NOTOK".to_string());
        assert!(err.to_string().contains("NOTOK"));
    }

    #[test]
    fn test_transport_text_is_unmodified() {
        let err = InvokeError::transport("insufficient funds for gas * price + value");
        assert_eq!(err.to_string(), "insufficient funds for gas * price + value");
    }
}
