use chrono::NaiveDate;

/// Errors that abort a whole request. Data gaps (unresolvable cohort, empty
/// buckets) are `None` values in the outputs, and malformed records are
/// skipped where they are read, so neither appears here.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("invalid date window: end {end} precedes start {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("invalid level filter {raw:?}: expected \"<cohort> - <level>\"")]
    InvalidLevelFilter { raw: String },

    #[error("unsupported week mode {raw:?}: expected calendar or program")]
    InvalidWeekMode { raw: String },

    #[error("query {query} failed")]
    Upstream {
        query: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("query {query} cancelled by caller")]
    Cancelled { query: &'static str },
}

impl MetricsError {
    pub fn upstream(query: &'static str, source: sqlx::Error) -> Self {
        MetricsError::Upstream { query, source }
    }
}
