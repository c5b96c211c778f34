//! Domain error types.

/// Top-level error type for stockpick.
///
/// The first five variants are the ingestion/scoring taxonomy; none of them
/// is retried anywhere in this crate. `Persistence` covers a single failed
/// record write and is recorded and skipped by batch callers rather than
/// escalated.
#[derive(Debug, thiserror::Error)]
pub enum StockpickError {
    #[error("invalid request: {reason}")]
    Validation { reason: String },

    #[error("invalid scoring input: {reason}")]
    InvalidInput { reason: String },

    #[error("provider fetch failed for {symbol}: {reason}")]
    TransientFetch { symbol: String, reason: String },

    #[error("no profile available for unknown symbol {symbol}")]
    NotFound { symbol: String },

    #[error("failed to persist {entity}: {reason}")]
    Persistence { entity: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StockpickError> for std::process::ExitCode {
    fn from(err: &StockpickError) -> Self {
        let code: u8 = match err {
            StockpickError::Io(_) => 1,
            StockpickError::ConfigParse { .. }
            | StockpickError::ConfigMissing { .. }
            | StockpickError::ConfigInvalid { .. } => 2,
            StockpickError::Database { .. }
            | StockpickError::DatabaseQuery { .. }
            | StockpickError::Persistence { .. } => 3,
            StockpickError::Validation { .. } | StockpickError::InvalidInput { .. } => 4,
            StockpickError::TransientFetch { .. } | StockpickError::NotFound { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = StockpickError::NotFound {
            symbol: "ZZZZ".into(),
        };
        assert!(err.to_string().contains("ZZZZ"));

        let err = StockpickError::TransientFetch {
            symbol: "AAPL".into(),
            reason: "connection refused".into(),
        };
        assert!(err.to_string().contains("AAPL"));
        assert!(err.to_string().contains("connection refused"));
    }
}
