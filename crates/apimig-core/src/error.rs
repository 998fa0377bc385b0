//! Error types for parsing the shared vocabulary

/// Errors raised when a textual name does not belong to a closed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VocabularyError {
    /// Unknown preset name
    #[error("unknown preset: '{0}'")]
    UnknownPreset(String),

    /// Unknown interceptor category
    #[error("unknown interceptor type: '{0}'")]
    UnknownInterceptor(String),

    /// Unknown client variant
    #[error("unknown client variant: '{0}'")]
    UnknownVariant(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = VocabularyError::UnknownPreset("turbo".to_string());
        assert_eq!(err.to_string(), "unknown preset: 'turbo'");
    }
}
