//! Error types for the lqdump-core library.
//!
//! Only conditions that stop a pipeline stage are errors. Skipped data
//! blocks and rows are reported as [`DecodeWarning`](crate::decode::DecodeWarning)
//! values alongside the decoded output.

use thiserror::Error;

/// Result type alias for lqdump operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all lqdump operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The reflection tree JSON could not be parsed at all
    #[error("failed to parse reflection JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A node in the reflection tree has a malformed payload
    #[error("invalid reflection node at '{path}': {details}")]
    InvalidReflection {
        /// Dotted path of the offending node
        path: String,
        /// Detailed description of the issue
        details: String,
    },

    /// A protocol document failed to compile
    #[error("failed to compile '{file}': {details}")]
    SchemaCompile {
        /// Virtual file name the document was compiled as
        file: String,
        /// Compiler diagnostic
        details: String,
    },

    /// A required message type is absent from a compiled schema
    #[error("message type '{name}' not found in schema")]
    MissingMessage {
        /// Message name that was looked up
        name: String,
    },

    /// A required field is absent from a compiled message type
    #[error("message type '{message}' has no field '{field}'")]
    MissingField {
        /// Full name of the message type
        message: String,
        /// Field name that was looked up
        field: String,
    },

    /// A metadata field of the configuration table has an unusable value
    #[error("invalid value in '{message}.{field}': {details}")]
    InvalidTable {
        /// Full name of the message type
        message: String,
        /// Field name that was read
        field: String,
        /// What was wrong with the value
        details: String,
    },

    /// The configuration blob failed to decode against its schema
    #[error("failed to decode configuration table: {0}")]
    TableDecode(#[from] prost::DecodeError),
}

impl Error {
    /// Creates a new reflection error
    pub fn invalid_reflection(path: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidReflection {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Creates a new schema compilation error
    pub fn schema_compile(file: impl Into<String>, details: impl ToString) -> Self {
        Self::SchemaCompile {
            file: file.into(),
            details: details.to_string(),
        }
    }

    /// Creates a new missing message error
    pub fn missing_message(name: impl Into<String>) -> Self {
        Self::MissingMessage { name: name.into() }
    }

    /// Creates a new missing field error
    pub fn missing_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            message: message.into(),
            field: field.into(),
        }
    }

    /// Creates a new invalid table value error
    pub fn invalid_table(
        message: impl Into<String>,
        field: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::InvalidTable {
            message: message.into(),
            field: field.into(),
            details: details.into(),
        }
    }

    /// Returns true if this error aborts the whole decode stage
    ///
    /// Reflection errors only affect the rendered document, every other
    /// variant leaves the decoder with no usable schema or table.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Json(_) | Self::InvalidReflection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::schema_compile("derived.proto", "unexpected token");
        assert!(err.to_string().contains("derived.proto"));
        assert!(err.to_string().contains("unexpected token"));

        let err = Error::missing_field("lq.config.ConfigTables", "datas");
        assert_eq!(
            err.to_string(),
            "message type 'lq.config.ConfigTables' has no field 'datas'"
        );
    }

    #[test]
    fn test_is_fatal() {
        assert!(Error::schema_compile("x.proto", "boom").is_fatal());
        assert!(Error::missing_message("ConfigTables").is_fatal());
        assert!(Error::invalid_table("lq.config.FieldSchema", "pb_index", "-5").is_fatal());
        assert!(!Error::invalid_reflection("lq.Foo", "bad id").is_fatal());
    }
}
