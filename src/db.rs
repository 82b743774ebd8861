use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::MetricsError;
use crate::filters::DateWindow;
use crate::models::{AnalysisRow, BuilderRow, EnrollmentRow, SurveyResponseRow};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_enrollments(pool: &PgPool) -> Result<Vec<EnrollmentRow>, MetricsError> {
    let records = sqlx::query(
        "SELECT builder_email, cohort, level FROM builder_metrics.enrollments",
    )
    .fetch_all(pool)
    .await
    .map_err(|err| MetricsError::upstream("fetch_enrollments", err))?;

    let mut enrollments = Vec::new();
    for row in records {
        enrollments.push(EnrollmentRow {
            builder_email: row.get("builder_email"),
            cohort: row.get("cohort"),
            level: row.get("level"),
        });
    }

    Ok(enrollments)
}

pub async fn fetch_builders(pool: &PgPool) -> Result<Vec<BuilderRow>, MetricsError> {
    let records = sqlx::query(
        "SELECT user_id, first_name || ' ' || last_name AS name, email \
         FROM builder_metrics.users \
         WHERE role = 'builder'",
    )
    .fetch_all(pool)
    .await
    .map_err(|err| MetricsError::upstream("fetch_builders", err))?;

    let mut builders = Vec::new();
    for row in records {
        builders.push(BuilderRow {
            user_id: row.get("user_id"),
            name: row.get("name"),
            email: row.get("email"),
        });
    }

    Ok(builders)
}

/// Grading passes inside the window, joined with the grader's email, the
/// task's deliverable type, and the raw cohort tag of the task's curriculum
/// day. The joins are LEFT so orphaned tasks still surface; cohort scoping
/// happens in Rust through the shared membership predicate, never inline
/// here.
pub async fn fetch_analysis_rows(
    pool: &PgPool,
    window: &DateWindow,
) -> Result<Vec<AnalysisRow>, MetricsError> {
    let records = sqlx::query(
        "SELECT tar.task_id, tar.user_id, u.email, tar.curriculum_date, tar.analysis, \
         t.deliverable_type, cd.cohort AS day_cohort \
         FROM builder_metrics.task_analysis_results tar \
         JOIN builder_metrics.users u ON u.user_id = tar.user_id \
         LEFT JOIN builder_metrics.tasks t ON t.id = tar.task_id \
         LEFT JOIN builder_metrics.time_blocks tb ON tb.id = t.block_id \
         LEFT JOIN builder_metrics.curriculum_days cd ON cd.id = tb.day_id \
         WHERE tar.curriculum_date BETWEEN $1 AND $2 \
           AND u.role = 'builder'",
    )
    .bind(window.start())
    .bind(window.end())
    .fetch_all(pool)
    .await
    .map_err(|err| MetricsError::upstream("fetch_analysis_rows", err))?;

    let mut rows = Vec::new();
    for row in records {
        rows.push(AnalysisRow {
            task_id: row.get("task_id"),
            user_id: row.get("user_id"),
            email: row.get("email"),
            curriculum_date: row.get("curriculum_date"),
            analysis: row.get("analysis"),
            deliverable_type: row
                .get::<Option<String>, _>("deliverable_type")
                .unwrap_or_default(),
            day_cohort: row.get("day_cohort"),
        });
    }

    Ok(rows)
}

pub async fn fetch_survey_responses(
    pool: &PgPool,
    window: &DateWindow,
) -> Result<Vec<SurveyResponseRow>, MetricsError> {
    let records = sqlx::query(
        "SELECT sr.id, sr.user_id, u.email, \
         u.first_name || ' ' || u.last_name AS responder_name, \
         sr.cohort, sr.task_date, sr.program_week, sr.referral_likelihood, \
         sr.what_we_did_well, sr.what_to_improve \
         FROM builder_metrics.survey_responses sr \
         JOIN builder_metrics.users u ON u.user_id = sr.user_id \
         WHERE sr.task_date BETWEEN $1 AND $2",
    )
    .bind(window.start())
    .bind(window.end())
    .fetch_all(pool)
    .await
    .map_err(|err| MetricsError::upstream("fetch_survey_responses", err))?;

    let mut responses = Vec::new();
    for row in records {
        responses.push(SurveyResponseRow {
            id: row.get("id"),
            user_id: row.get("user_id"),
            email: row.get("email"),
            responder_name: row.get("responder_name"),
            cohort: row.get("cohort"),
            task_date: row.get("task_date"),
            program_week: row.get("program_week"),
            referral_likelihood: row.get("referral_likelihood"),
            what_we_did_well: row.get("what_we_did_well"),
            what_to_improve: row.get("what_to_improve"),
        });
    }

    Ok(responses)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let users = vec![
        (101_i64, "Avery", "Lee", "avery.lee@example.com", "builder"),
        (102, "Jules", "Moreno", "jules.moreno@example.com", "builder"),
        (103, "Kiara", "Patel", "kiara.patel@example.com", "builder"),
        (104, "Sam", "Okafor", "sam.okafor@example.com", "builder"),
        (105, "Dana", "Wright", "dana.wright@example.com", "staff"),
    ];

    for (user_id, first_name, last_name, email, role) in users {
        sqlx::query(
            r#"
            INSERT INTO builder_metrics.users (user_id, first_name, last_name, email, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name,
                role = EXCLUDED.role
            "#,
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(role)
        .execute(pool)
        .await?;
    }

    // Avery carries a duplicate enrollment on purpose; the resolver keeps
    // the (cohort, level) maximum. Sam's row has no level and is never
    // selected.
    let enrollments = vec![
        ("avery.lee@example.com", "March 2025", "L1", (2025, 3, 1)),
        ("Avery.Lee@example.com", "March 2025", "L2", (2025, 5, 17)),
        ("jules.moreno@example.com", "March 2025", "L2", (2025, 5, 17)),
        ("kiara.patel@example.com", "June 2025", "L1", (2025, 6, 1)),
        ("sam.okafor@example.com", "June 2025", "", (2025, 6, 1)),
    ];

    for (builder_email, cohort, level, (y, m, d)) in enrollments {
        sqlx::query(
            r#"
            INSERT INTO builder_metrics.enrollments (id, builder_email, cohort, level, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(builder_email)
        .bind(cohort)
        .bind(level)
        .bind(NaiveDate::from_ymd_opt(y, m, d).context("invalid date")?)
        .execute(pool)
        .await?;
    }

    // Day 1 predates cohort tagging; its tasks count for the legacy cohort.
    let curriculum_days = vec![
        (1_i64, (2025, 3, 3), None::<&str>),
        (2, (2025, 5, 19), Some("March 2025")),
        (3, (2025, 6, 9), Some("June 2025")),
    ];

    for (id, (y, m, d), cohort) in curriculum_days {
        sqlx::query(
            r#"
            INSERT INTO builder_metrics.curriculum_days (id, day_date, cohort)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(NaiveDate::from_ymd_opt(y, m, d).context("invalid date")?)
        .bind(cohort)
        .execute(pool)
        .await?;
    }

    let time_blocks = vec![(10_i64, 1_i64), (20, 2), (30, 3)];
    for (id, day_id) in time_blocks {
        sqlx::query(
            r#"
            INSERT INTO builder_metrics.time_blocks (id, day_id)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(day_id)
        .execute(pool)
        .await?;
    }

    let tasks = vec![
        (1001_i64, 10_i64, "Problem statement writeup", "text"),
        (1002, 20, "Prototype walkthrough", "video"),
        (1003, 20, "Launch plan doc", "document"),
        (1004, 30, "Demo link", "link"),
        (1005, 30, "Daily standup reflection", "reflection"),
    ];

    for (id, block_id, task_title, deliverable_type) in tasks {
        sqlx::query(
            r#"
            INSERT INTO builder_metrics.tasks (id, block_id, task_title, deliverable_type)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(block_id)
        .bind(task_title)
        .bind(deliverable_type)
        .execute(pool)
        .await?;
    }

    let analyses = vec![
        (
            1001_i64,
            101_i64,
            (2025, 3, 3),
            r#"{"completion_score": 91, "criteria_met": ["clear problem framing", "cites evidence"]}"#,
        ),
        (
            1002,
            101,
            (2025, 5, 19),
            r#"{"completion_score": "78", "criteria_met": ["working demo"]}"#,
        ),
        (
            1003,
            102,
            (2025, 5, 19),
            r#"{"completion_score": 84, "criteria_met": ["milestones", "owner per milestone"]}"#,
        ),
        // Placeholder written on submission receipt; filtered out of every
        // aggregate.
        (
            1003,
            101,
            (2025, 5, 19),
            r#"{"completion_score": 0, "criteria_met": ["Submission received"]}"#,
        ),
        (
            1004,
            103,
            (2025, 6, 9),
            r#"{"completion_score": 88, "criteria_met": ["link resolves", "readme"]}"#,
        ),
        // Malformed blob; skipped with a warning at read time.
        (1004, 104, (2025, 6, 9), r#"{"completion_score": "#),
    ];

    for (task_id, user_id, (y, m, d), analysis) in analyses {
        sqlx::query(
            r#"
            INSERT INTO builder_metrics.task_analysis_results
            (id, task_id, user_id, curriculum_date, analysis)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(user_id)
        .bind(NaiveDate::from_ymd_opt(y, m, d).context("invalid date")?)
        .bind(analysis)
        .execute(pool)
        .await?;
    }

    let responses = vec![
        (101_i64, "March 2025", (2025, 5, 19), Some(11), 9, "Pace picked up", "More pairing time"),
        (102, "March 2025", (2025, 5, 20), Some(11), 7, "Good guest speaker", "Earlier feedback"),
        (103, "June 2025", (2025, 6, 9), Some(1), 10, "Strong kickoff", ""),
        (103, "", (2025, 6, 11), Some(1), 5, "", "Unclear task briefs"),
    ];

    for (user_id, cohort, (y, m, d), program_week, likelihood, went_well, to_improve) in responses {
        sqlx::query(
            r#"
            INSERT INTO builder_metrics.survey_responses
            (id, user_id, cohort, task_date, program_week, referral_likelihood,
             what_we_did_well, what_to_improve)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(cohort)
        .bind(NaiveDate::from_ymd_opt(y, m, d).context("invalid date")?)
        .bind(program_week)
        .bind(likelihood)
        .bind(went_well)
        .bind(to_improve)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Bulk enrollment import. Rows append as-is: duplicate emails are expected
/// from repeated exports, and the read-time resolver picks the canonical
/// record.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        builder_email: String,
        cohort: String,
        level: String,
        created_at: NaiveDate,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        sqlx::query(
            r#"
            INSERT INTO builder_metrics.enrollments (id, builder_email, cohort, level, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.builder_email)
        .bind(&row.cohort)
        .bind(&row.level)
        .bind(row.created_at)
        .execute(pool)
        .await?;
        inserted += 1;
    }

    Ok(inserted)
}
