//! Error taxonomy for listing, searching and normalizing resources.

use crate::record::ResultSet;

/// Boxed error used for credential sources with unrelated error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested resource kind is not one of the supported kinds.
    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),

    /// The bulk listing request to the control plane failed.
    #[error("control plane request failed: {0}")]
    Transport(#[from] kube::Error),

    /// The bulk listing is not a JSON object holding an `items` array.
    #[error("malformed resource listing: {0}")]
    Listing(#[source] serde_json::Error),

    /// A matched document could not be decoded into a record.
    #[error("failed to decode resource document: {0}")]
    Decode(#[source] serde_json::Error),

    /// Some records were decoded but at least one candidate failed.
    ///
    /// `partial` holds every record that decoded successfully.
    #[error("{source} ({} records recovered)", .partial.records.len())]
    Partial {
        /// The records that were recovered.
        partial: ResultSet,
        /// The error collected while decoding.
        source: Box<Error>,
    },

    /// Container views were requested from a result set that does not hold pods.
    #[error("cannot read containers from {0} results")]
    NotPods(String),

    /// No usable cluster configuration could be found or built.
    #[error("cluster configuration unavailable: {0}")]
    Config(#[source] BoxError),
}

impl Error {
    /// Returns the records recovered alongside a [`Error::Partial`] failure.
    #[must_use]
    pub fn partial(&self) -> Option<&ResultSet> {
        match self {
            Self::Partial { partial, .. } => Some(partial),
            _ => None,
        }
    }

    pub(crate) fn config(error: impl Into<BoxError>) -> Self {
        Self::Config(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_exposes_recovered_records() {
        let source = serde_json::from_str::<u32>("x").unwrap_err();
        let err = Error::Partial {
            partial: ResultSet::new("Pod"),
            source: Box::new(Error::Decode(source)),
        };

        assert_eq!(err.partial().map(|p| p.kind.as_str()), Some("Pod"));
        assert!(err.to_string().contains("0 records recovered"));
    }

    #[test]
    fn other_errors_have_no_partial() {
        let err = Error::UnsupportedKind("widgets".to_string());

        assert!(err.partial().is_none());
        assert_eq!(err.to_string(), "unsupported resource kind: widgets");
    }
}
