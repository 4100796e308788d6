//! Core error types for MILLRACE.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Configuration error with element context
    #[error("configuration error for {element}: {reason}")]
    Configure {
        /// Element the error was reported against
        element: String,
        /// Human-readable reason
        reason: String,
    },

    /// Validation error
    #[error("validation failed for {field}: {reason}")]
    Validation {
        /// What was being validated
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Not found
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity
        kind: String,
        /// Identifier that failed to resolve
        id: String,
    },

    /// Already exists
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// Kind of entity
        kind: String,
        /// Conflicting identifier
        id: String,
    },

    /// No handler registered under this name
    #[error("no such handler: {0}")]
    NoSuchHandler(String),

    /// Parse error
    #[error("parse error: {message}")]
    Parse {
        /// What failed to parse
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::Configure {
            element: "rated".to_string(),
            reason: "rate must be positive".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "configuration error for rated: rate must be positive"
        );

        let err = CoreError::NotFound {
            kind: "element".to_string(),
            id: "q0".to_string(),
        };
        assert_eq!(format!("{}", err), "element not found: q0");
    }

    #[test]
    fn test_error_equality() {
        let err1 = CoreError::NoSuchHandler("rate".to_string());
        let err2 = CoreError::NoSuchHandler("rate".to_string());
        assert_eq!(err1, err2);

        let err3 = CoreError::NoSuchHandler("drops".to_string());
        assert_ne!(err1, err3);
    }
}
