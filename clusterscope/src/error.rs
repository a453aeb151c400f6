use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryError>;

/// Error taxonomy shared by every query operation.
///
/// Backing `kube::Error`s are classified into these variants by
/// [`classify_kube_error`]; the original cause is always chained via
/// `source`, never replaced.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Malformed input: an empty required name or namespace, or a selector
    /// the backing query engine rejected.
    #[error("invalid argument for {kind} query: {reason}")]
    InvalidArgument { kind: String, reason: String },

    /// A by-name lookup matched no record.
    #[error("{kind} {name:?} not found")]
    NotFound { kind: String, name: String },

    /// The backing connection could not be reached or the transport failed.
    #[error("cluster unavailable while {action}")]
    Unavailable {
        action: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The caller abandoned the call before the cluster answered.
    ///
    /// Dropping an in-flight query future cancels it without producing a
    /// value, so this library never constructs the variant itself; callers
    /// composing their own cancellation can.
    #[error("cancelled while {action}")]
    Cancelled { action: String },

    /// A configured deadline elapsed before the backing call completed.
    #[error("deadline exceeded while {action}")]
    DeadlineExceeded { action: String },

    /// Any backing error not otherwise classified.
    #[error("{action} failed")]
    Unknown {
        action: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Map a `kube::Error` onto the taxonomy, attaching operation context.
///
/// `key` is the argument being resolved (a name or a selector), `action` a
/// human-readable description of the operation.
pub(crate) fn classify_kube_error(
    kind: &str,
    key: &str,
    action: &str,
    err: kube::Error,
) -> QueryError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => QueryError::NotFound {
            kind: kind.to_string(),
            name: key.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 400 || ae.code == 422 => QueryError::InvalidArgument {
            kind: kind.to_string(),
            reason: ae.message,
        },
        err @ (kube::Error::HyperError(_) | kube::Error::Service(_)) => QueryError::Unavailable {
            action: action.to_string(),
            source: Box::new(err),
        },
        err => QueryError::Unknown {
            action: action.to_string(),
            source: Box::new(err),
        },
    }
}

/// Reject empty required string arguments before any network call is made.
pub(crate) fn require_nonempty(kind: &str, field: &str, value: &str) -> QueryResult<()> {
    if value.trim().is_empty() {
        return Err(QueryError::InvalidArgument {
            kind: kind.to_string(),
            reason: format!("{} must not be empty", field),
        });
    }
    Ok(())
}
