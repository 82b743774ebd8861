use std::fmt;

use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EnrollmentRow {
    pub builder_email: String,
    pub cohort: String,
    pub level: String,
}

/// The single (cohort, level) pair selected as authoritative for a builder
/// after deduplicating their enrollment rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortAssignment {
    pub cohort: String,
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct BuilderRow {
    pub user_id: i64,
    pub name: String,
    pub email: String,
}

/// One grading pass over a task submission, joined with the task's
/// deliverable type and the raw cohort tag of its curriculum day.
/// `day_cohort` is None for legacy rows that predate cohort tagging and for
/// tasks with no curriculum-day linkage.
#[derive(Debug, Clone)]
pub struct AnalysisRow {
    pub task_id: i64,
    pub user_id: i64,
    pub email: String,
    pub curriculum_date: NaiveDate,
    pub analysis: String,
    pub deliverable_type: String,
    pub day_cohort: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SurveyResponseRow {
    pub id: Uuid,
    pub user_id: i64,
    pub email: String,
    pub responder_name: String,
    pub cohort: String,
    pub task_date: NaiveDate,
    pub program_week: Option<i32>,
    pub referral_likelihood: i32,
    pub what_we_did_well: String,
    pub what_to_improve: String,
}

#[derive(Debug, Clone)]
pub struct BuilderCompletion {
    pub user_id: i64,
    pub name: String,
    pub cohort: String,
    pub level: String,
    pub percentage: Option<i64>,
}

/// Week identity for an NPS bucket. Calendar keys are comparable across
/// cohorts; program keys are only comparable within one cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WeekKey {
    Calendar(NaiveDate),
    Program(i32),
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekKey::Calendar(start) => write!(f, "{start}"),
            WeekKey::Program(week) => write!(f, "week {week}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeeklyNpsRow {
    pub cohort: String,
    pub week: WeekKey,
    pub nps: Option<f64>,
    pub promoters: i64,
    pub detractors: i64,
    pub passives: i64,
    pub total_responses: i64,
}

#[derive(Debug, Clone)]
pub struct CohortNpsSummary {
    pub cohort: String,
    pub nps_this_week: Option<f64>,
    pub nps_all_time: Option<f64>,
}
