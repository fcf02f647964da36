use thiserror::Error;

/// Shared error type for core primitive operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CourierError {
    /// Message type tag does not name a known guarantee level.
    #[error("unknown command: {0}")]
    UnknownGuarantee(String),
}

#[cfg(test)]
mod tests {
    use super::CourierError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            CourierError::UnknownGuarantee("INFO-9".to_string()).to_string(),
            "unknown command: INFO-9"
        );
    }
}
