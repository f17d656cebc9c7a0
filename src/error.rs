use thiserror::Error;

/// Failure modes of the document/market collaborators.
///
/// `NotFound` and `Malformed` are expected, non-fatal outcomes: the period
/// fallback resolver treats both as "try the next report". `Unreachable`
/// advances fallback the same way but is surfaced distinctly in diagnostics.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("document not found")]
    NotFound,
    #[error("document malformed: {0}")]
    Malformed(String),
    #[error("source unreachable: {0}")]
    Unreachable(String),
}

/// Terminal failure of one entity's reconciliation. Never aborts a batch;
/// the orchestrator records it against the entity id only.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no usable report for {code} FY{year} in any period/scope ({attempts} fetch attempts)")]
    Exhausted {
        code: String,
        year: i32,
        attempts: usize,
    },
    #[error("no market listing found for {code}")]
    MarketDataMissing { code: String },
    #[error("reconciliation task failed unexpectedly: {0}")]
    Unexpected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_error_names_entity_and_year() {
        let err = ReconcileError::Exhausted {
            code: "005930".to_string(),
            year: 2024,
            attempts: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains("005930"));
        assert!(msg.contains("2024"));
    }
}
