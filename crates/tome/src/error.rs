use thiserror::Error;

/// Tome-wide error type for the document store.
///
/// A query that matches nothing is never an error: update and delete report a
/// zero count instead. Errors are reserved for malformed input.
#[derive(Error, Debug)]
pub enum TomeError {
    /// I/O operations failed (loading seed files and the like)
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// A filter, projection, sort, update or pipeline stage is malformed
    #[error("Invalid query: {reason}")]
    InvalidQuery {
        reason: String,
    },

    /// A value handed to insert is not a document
    #[error("Invalid document: {reason}")]
    InvalidDocument {
        reason: String,
    },

    /// Collection not found in store
    #[error("Collection '{name}' not found in store")]
    CollectionNotFound {
        name: String,
    },

    /// Invalid collection name format
    #[error("Invalid collection name: {name}")]
    InvalidCollectionName {
        name: String,
    },

    /// No index with this name exists on the collection
    #[error("Index '{name}' not found")]
    IndexNotFound {
        name: String,
    },
}

impl TomeError {
    /// Shorthand for building an [`TomeError::InvalidQuery`].
    pub(crate) fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }
}

/// Result type alias for Tome operations.
pub type Result<T> = std::result::Result<T, TomeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_query_display() {
        let err = TomeError::invalid_query("unknown operator '$foo'");
        assert_eq!(err.to_string(), "Invalid query: unknown operator '$foo'");
    }

    #[test]
    fn test_json_error_conversion() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TomeError = source.into();
        assert!(matches!(err, TomeError::Json { .. }));
    }

    #[test]
    fn test_index_not_found_display() {
        let err = TomeError::IndexNotFound {
            name: "title_1".to_owned(),
        };
        assert_eq!(err.to_string(), "Index 'title_1' not found");
    }
}
