use thiserror::Error;

use crate::api::dictionary::TicketStatus;
use crate::api::ApiError;

/// Errors raised by the provider outside the HTTP layer
#[derive(Debug, Error)]
pub enum Error {
    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: ApiError,
    },

    #[error("waiting for {target} was cancelled")]
    Cancelled { target: String },

    #[error("ticket {ticket} finished with status {status}")]
    TicketFailed { ticket: String, status: TicketStatus },

    #[error("ticket {ticket} succeeded without reporting an object id")]
    MissingObjectId { ticket: String },

    #[error("filter value '{value}' for field '{field}' is not a valid {kind}")]
    Coercion {
        field: String,
        value: String,
        kind: &'static str,
    },

    #[error("cannot filter on unknown field '{0}'")]
    UnknownFilterField(String),

    #[error("failed to map {item}: {reason}")]
    Mapping { item: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn api(context: impl Into<String>, source: ApiError) -> Self {
        Error::Api {
            context: context.into(),
            source,
        }
    }

    pub fn mapping(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Mapping {
            item: item.into(),
            reason: reason.into(),
        }
    }

    /// The remote object does not exist (404, or 403 for some object types)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { source, .. } if source.is_not_found())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_looks_through_context() {
        let err = Error::api(
            "reading disk 3",
            ApiError::ApiError {
                status: 404,
                message: "gone".to_string(),
                details: None,
            },
        );
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "reading disk 3: API returned error (HTTP 404): gone"
        );

        let err = Error::api("reading disk 3", ApiError::ServiceUnavailable);
        assert!(!err.is_not_found());
    }

    #[test]
    fn ticket_failure_reports_status_verbatim() {
        let err = Error::TicketFailed {
            ticket: "T1".to_string(),
            status: TicketStatus::Unknown(12),
        };
        assert_eq!(err.to_string(), "ticket T1 finished with status unknown (12)");
    }
}
