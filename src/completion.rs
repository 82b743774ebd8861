use std::collections::{HashMap, HashSet};

use crate::cohort;
use crate::filters::{DateWindow, LevelFilter};
use crate::grading;
use crate::models::{AnalysisRow, BuilderCompletion, BuilderRow, CohortAssignment};

/// Per-builder task completion against their cohort.
///
/// The denominator for a cohort is the number of distinct tasks that were
/// actually graded at least once for anyone in that cohort inside the
/// window. A task scheduled but never graded does not count. The numerator
/// is the builder's own distinct graded tasks, further restricted to
/// gradeable deliverable types. A builder whose cohort cannot be resolved,
/// or whose cohort has no graded tasks yet, reports no percentage.
pub fn completion_report(
    builders: &[BuilderRow],
    assignments: &HashMap<String, CohortAssignment>,
    rows: &[AnalysisRow],
    window: &DateWindow,
    level_filter: Option<&LevelFilter>,
    legacy_cohort: &str,
) -> Vec<BuilderCompletion> {
    let mut cohort_tasks: HashMap<String, HashSet<i64>> = HashMap::new();
    let mut builder_tasks: HashMap<i64, HashSet<i64>> = HashMap::new();

    for row in rows {
        if !window.contains(row.curriculum_date) || !grading::is_graded(&row.analysis) {
            continue;
        }

        let Some(assignment) = assignments.get(&row.email.to_lowercase()) else {
            // A grading pass for someone with no canonical enrollment
            // counts toward no cohort.
            continue;
        };

        if !cohort::in_cohort_scope(row.day_cohort.as_deref(), &assignment.cohort, legacy_cohort) {
            continue;
        }

        cohort_tasks
            .entry(assignment.cohort.clone())
            .or_default()
            .insert(row.task_id);

        if grading::is_gradeable_deliverable(&row.deliverable_type) {
            builder_tasks.entry(row.user_id).or_default().insert(row.task_id);
        }
    }

    let mut report = Vec::new();

    for builder in builders {
        let assignment = assignments.get(&builder.email.to_lowercase());

        if let Some(filter) = level_filter {
            match assignment {
                Some(assignment) if filter.matches(assignment) => {}
                _ => continue,
            }
        }

        let percentage = assignment.and_then(|assignment| {
            let denominator = cohort_tasks
                .get(&assignment.cohort)
                .map(HashSet::len)
                .unwrap_or(0);
            if denominator == 0 {
                return None;
            }
            let numerator = builder_tasks
                .get(&builder.user_id)
                .map(HashSet::len)
                .unwrap_or(0);
            Some((100.0 * numerator as f64 / denominator as f64).round() as i64)
        });

        report.push(BuilderCompletion {
            user_id: builder.user_id,
            name: builder.name.clone(),
            cohort: assignment.map(|a| a.cohort.clone()).unwrap_or_default(),
            level: assignment.map(|a| a.level.clone()).unwrap_or_default(),
            percentage,
        });
    }

    report.sort_by(|a, b| {
        (a.cohort.as_str(), a.name.as_str(), a.user_id)
            .cmp(&(b.cohort.as_str(), b.name.as_str(), b.user_id))
    });
    report
}
