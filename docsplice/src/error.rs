use facet::Facet;

/// Failure taxonomy shared by the document service, the HTTP binding and
/// the clients.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum DocError {
    /// not found: {what}
    NotFound { what: String },

    /// not supported: {what}
    NotSupported { what: String },

    /// invalid input: {reason}
    InvalidInput { reason: String },

    /// internal error: {message}
    Internal { message: String },
}

impl DocError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DocError::NotFound { what: what.into() }
    }

    pub fn not_supported(what: impl Into<String>) -> Self {
        DocError::NotSupported { what: what.into() }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        DocError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DocError::Internal {
            message: message.into(),
        }
    }

    /// The bare message, without the category prefix used by `Display`.
    pub fn message(&self) -> &str {
        match self {
            DocError::NotFound { what } => what,
            DocError::NotSupported { what } => what,
            DocError::InvalidInput { reason } => reason,
            DocError::Internal { message } => message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DocError::NotFound { .. })
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, DocError::NotSupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = DocError::not_found("Element not found");
        assert_eq!(err.to_string(), "not found: Element not found");
        assert_eq!(err.message(), "Element not found");
    }

    #[test]
    fn test_predicates() {
        assert!(DocError::not_found("x").is_not_found());
        assert!(DocError::not_supported("union").is_not_supported());
        assert!(!DocError::invalid_input("bad").is_not_found());
        assert_eq!(DocError::internal("boom").message(), "boom");
    }
}
