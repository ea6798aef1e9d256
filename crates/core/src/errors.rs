use thiserror::Error;

/// Rejections of an intent before it touches the ledger. The display text is
/// what the shopkeeper's reply carries.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown intent")]
    UnknownIntent,
    #[error("Item name is missing")]
    MissingItemName,
    #[error("Stock action is missing (expected IN or OUT)")]
    MissingStockAction,
    #[error("Unknown stock action: {0}")]
    UnknownStockAction(String),
    #[error("Quantity cannot be negative")]
    NegativeQuantity,
}

/// Failure surfaced to an HTTP caller, tagged with the request's correlation id.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn bad_request(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn service_unavailable(
        message: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self::ServiceUnavailable { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } | Self::ServiceUnavailable { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. })
    }
}
