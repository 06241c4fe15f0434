//! Error kinds raised by the structure and interface pipeline.

use thiserror::Error;

/// Failures while obtaining a structure or computing its contacts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// Fetching, decompressing or parsing failed. Permanent for the process.
    #[error("structure {id} is unavailable: {reason}")]
    StructureUnavailable {
        /// Structure identifier
        id: String,
        /// What went wrong
        reason: String,
    },

    /// A remote collaborator could not be reached or answered with an error status.
    #[error("remote access to {url} failed: {reason}")]
    RemoteAccess {
        /// Requested URL
        url: String,
        /// Transport error or HTTP status
        reason: String,
        /// Whether another attempt may succeed
        transient: bool,
    },

    /// The contact computation itself failed. Safe to retry on a later call.
    #[error("contact computation failed for {id}: {reason}")]
    GeometryComputation {
        /// Structure identifier
        id: String,
        /// What went wrong
        reason: String,
    },

    /// The identifier does not have the shape the backend expects.
    #[error("malformed structure identifier '{0}'")]
    MalformedIdentifier(String),

    /// The query was abandoned before the operation completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl StructureError {
    pub(crate) fn unavailable(id: &str, reason: impl ToString) -> Self {
        StructureError::StructureUnavailable {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Failures raised by the evidence providers of the interface mapper.
#[derive(Error, Debug)]
pub enum InterfaceError {
    /// The structure behind the evidence could not be used.
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// An evidence record could not be read or has an unexpected shape.
    #[error("malformed {provider} evidence: {reason}")]
    Evidence {
        /// Name of the provider, e.g. `EPPIC`
        provider: &'static str,
        /// What is wrong with the record
        reason: String,
    },

    /// An evidence file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reading or writing settings files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid TOML for [`Settings`](crate::config::Settings).
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be written as TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StructureError::unavailable("1abc", "parser rejected the file");
        assert_eq!(
            err.to_string(),
            "structure 1abc is unavailable: parser rejected the file"
        );

        let err = StructureError::MalformedIdentifier("zz".to_string());
        assert_eq!(err.to_string(), "malformed structure identifier 'zz'");

        let err = InterfaceError::Evidence {
            provider: "EPPIC",
            reason: "missing chain".to_string(),
        };
        assert_eq!(err.to_string(), "malformed EPPIC evidence: missing chain");
    }
}
