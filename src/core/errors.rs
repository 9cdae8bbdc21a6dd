use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Invalid trade intent for {symbol}: {reason}")]
    InvalidIntent { symbol: String, reason: String },

    #[error("Signing failure: {0}")]
    SigningFailure(String),

    #[error("Transport failure during {operation}: {message}")]
    TransportFailure { operation: String, message: String },

    #[error("API error: HTTP {status} (code {code:?}) - {message}")]
    ApiError {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Order rejected for {symbol}: {reason}")]
    OrderRejected {
        symbol: String,
        code: Option<i64>,
        reason: String,
    },

    #[error("Stream disconnected: {0}")]
    StreamDisconnected(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl ExchangeError {
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportFailure {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn invalid_intent(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIntent {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// True when the failure happened before anything was sent over the wire.
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidIntent { .. } | Self::SigningFailure(_) | Self::ConfigError(_)
        )
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        let operation = if err.is_timeout() {
            "http (timeout)"
        } else if err.is_connect() {
            "http (connect)"
        } else {
            "http"
        };
        Self::transport(operation, err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::transport("decode", err.to_string())
    }
}

/// Helper trait for attaching operation context to fallible exchange calls
pub trait ResultExt<T> {
    fn with_operation_context(self, operation: &str) -> Result<T, ExchangeError>;
    fn with_symbol_context(self, operation: &str, symbol: &str) -> Result<T, ExchangeError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ExchangeError>,
{
    fn with_operation_context(self, operation: &str) -> Result<T, ExchangeError> {
        self.map_err(|e| {
            let error = match e.into() {
                ExchangeError::TransportFailure { message, .. } => {
                    ExchangeError::transport(operation, message)
                }
                other => other,
            };
            tracing::error!(operation = %operation, error = %error, "Exchange operation failed");
            error
        })
    }

    fn with_symbol_context(self, operation: &str, symbol: &str) -> Result<T, ExchangeError> {
        self.map_err(|e| {
            let error = match e.into() {
                ExchangeError::TransportFailure { message, .. } => {
                    ExchangeError::transport(format!("{} {}", operation, symbol), message)
                }
                other => other,
            };
            tracing::error!(operation = %operation, symbol = %symbol, error = %error, "Exchange operation failed");
            error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_context_rewrites_transport_operation() {
        let result: Result<(), ExchangeError> =
            Err(ExchangeError::transport("http", "connection reset"));
        let err = result
            .with_symbol_context("create order", "BTCUSDT")
            .unwrap_err();

        match err {
            ExchangeError::TransportFailure { operation, message } => {
                assert_eq!(operation, "create order BTCUSDT");
                assert_eq!(message, "connection reset");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_context_keeps_non_transport_errors() {
        let result: Result<(), ExchangeError> = Err(ExchangeError::invalid_intent("ETHUSDT", "x"));
        let err = result.with_operation_context("place order").unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidIntent { .. }));
        assert!(err.is_local());
    }

    #[test]
    fn test_json_error_is_transport_failure() {
        let err: ExchangeError = serde_json::from_str::<u64>("{")
            .map_err(ExchangeError::from)
            .unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::TransportFailure { ref operation, .. } if operation == "decode"
        ));
    }
}
