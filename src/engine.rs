use std::future::Future;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::error::MetricsError;
use crate::filters::{DateWindow, LevelFilter, WeekMode};
use crate::models::{BuilderCompletion, CohortNpsSummary, WeeklyNpsRow};
use crate::{completion, db, enrollment, nps};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Label of the first cohort ever tracked. Curriculum days that predate
    /// cohort tagging count for this cohort.
    pub legacy_cohort: String,
}

/// Read-only aggregation facade over the record store. Every method is a
/// pure function of the store snapshot and its arguments; fetches race the
/// caller's cancellation token and abort cleanly, since nothing here
/// writes.
pub struct MetricsEngine {
    pool: PgPool,
    config: EngineConfig,
}

impl MetricsEngine {
    pub fn new(pool: PgPool, config: EngineConfig) -> Self {
        MetricsEngine { pool, config }
    }

    pub async fn completion(
        &self,
        window: &DateWindow,
        level_filter: Option<&LevelFilter>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BuilderCompletion>, MetricsError> {
        let enrollments = guarded(cancel, "fetch_enrollments", db::fetch_enrollments(&self.pool)).await?;
        let builders = guarded(cancel, "fetch_builders", db::fetch_builders(&self.pool)).await?;
        let rows = guarded(
            cancel,
            "fetch_analysis_rows",
            db::fetch_analysis_rows(&self.pool, window),
        )
        .await?;

        let assignments = enrollment::resolve(&enrollments);
        Ok(completion::completion_report(
            &builders,
            &assignments,
            &rows,
            window,
            level_filter,
            &self.config.legacy_cohort,
        ))
    }

    pub async fn weekly_nps(
        &self,
        window: &DateWindow,
        cohort_filter: Option<&str>,
        mode: WeekMode,
        cancel: &CancellationToken,
    ) -> Result<Vec<WeeklyNpsRow>, MetricsError> {
        let enrollments = guarded(cancel, "fetch_enrollments", db::fetch_enrollments(&self.pool)).await?;
        let responses = guarded(
            cancel,
            "fetch_survey_responses",
            db::fetch_survey_responses(&self.pool, window),
        )
        .await?;

        let assignments = enrollment::resolve(&enrollments);
        Ok(nps::weekly_nps(
            &responses,
            &assignments,
            window,
            cohort_filter,
            mode,
        ))
    }

    /// Summary rows are derived from the calendar-mode weekly buckets, so
    /// they always agree with the weekly series.
    pub async fn cohort_summary(
        &self,
        window: &DateWindow,
        cohort_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CohortNpsSummary>, MetricsError> {
        let weekly = self
            .weekly_nps(window, cohort_filter, WeekMode::Calendar, cancel)
            .await?;
        Ok(nps::cohort_summary(&weekly))
    }
}

/// Race a store query against the caller's cancellation signal. Dropping
/// the query future aborts it; the engine holds no partial state.
async fn guarded<T, F>(
    cancel: &CancellationToken,
    query: &'static str,
    fut: F,
) -> Result<T, MetricsError>
where
    F: Future<Output = Result<T, MetricsError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(MetricsError::Cancelled { query }),
        result = fut => result,
    }
}
