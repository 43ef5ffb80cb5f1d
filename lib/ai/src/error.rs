//! Error types for the model gateway.

use std::fmt;

/// Errors from model gateway operations.
///
/// No retry happens in the engine; a gateway that wants retries performs
/// them before returning one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelGatewayError {
    /// Provider is unavailable.
    ProviderUnavailable { provider: String, reason: String },
    /// Request failed.
    RequestFailed { reason: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// A scripted gateway ran out of replies.
    ScriptExhausted { calls_made: usize },
}

impl fmt::Display for ModelGatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "model provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "model request failed: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse model response: {reason}")
            }
            Self::Timeout => write!(f, "model request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::ScriptExhausted { calls_made } => {
                write!(f, "scripted gateway has no reply for call {}", calls_made + 1)
            }
        }
    }
}

impl std::error::Error for ModelGatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_unavailable_display() {
        let err = ModelGatewayError::ProviderUnavailable {
            provider: "azure-openai".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("azure-openai"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn rate_limited_display() {
        let err = ModelGatewayError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "rate limited, retry after 30s");
    }

    #[test]
    fn script_exhausted_counts_from_one() {
        let err = ModelGatewayError::ScriptExhausted { calls_made: 2 };
        assert_eq!(err.to_string(), "scripted gateway has no reply for call 3");
    }
}
