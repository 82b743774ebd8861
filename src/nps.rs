use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};

use crate::filters::{DateWindow, WeekMode};
use crate::models::{CohortAssignment, CohortNpsSummary, SurveyResponseRow, WeekKey, WeeklyNpsRow};

/// Program weeks run Saturday through Wednesday; every response date maps to
/// the most recent Saturday on or before it, which anchors the calendar
/// bucket on a timeline shared by all cohorts.
pub fn calendar_week_start(date: NaiveDate) -> NaiveDate {
    let days_from_saturday = (date.weekday().num_days_from_sunday() + 1) % 7;
    date - Duration::days(i64::from(days_from_saturday))
}

pub fn nps_score(promoters: i64, detractors: i64, total: i64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(100.0 * (promoters - detractors) as f64 / total as f64)
}

#[derive(Debug, Default, Clone, Copy)]
struct BucketCounts {
    promoters: i64,
    detractors: i64,
    passives: i64,
    total: i64,
}

/// Weekly NPS per cohort. Buckets exist only for (cohort, week) pairs with
/// at least one response; consumers handle the gaps. In program mode,
/// responses without a program_week are skipped.
pub fn weekly_nps(
    responses: &[SurveyResponseRow],
    assignments: &HashMap<String, CohortAssignment>,
    window: &DateWindow,
    cohort_filter: Option<&str>,
    mode: WeekMode,
) -> Vec<WeeklyNpsRow> {
    let mut buckets: BTreeMap<(String, WeekKey), BucketCounts> = BTreeMap::new();

    for response in responses {
        if !window.contains(response.task_date) {
            continue;
        }
        let Some(cohort) = attribute_cohort(response, assignments) else {
            continue;
        };
        if let Some(filter) = cohort_filter {
            if cohort != filter {
                continue;
            }
        }
        let week = match mode {
            WeekMode::Calendar => WeekKey::Calendar(calendar_week_start(response.task_date)),
            WeekMode::Program => match response.program_week {
                Some(week) => WeekKey::Program(week),
                None => continue,
            },
        };

        let counts = buckets.entry((cohort, week)).or_default();
        counts.total += 1;
        match response.referral_likelihood {
            n if n >= 9 => counts.promoters += 1,
            n if n <= 6 => counts.detractors += 1,
            _ => counts.passives += 1,
        }
    }

    buckets
        .into_iter()
        .map(|((cohort, week), counts)| WeeklyNpsRow {
            cohort,
            week,
            nps: nps_score(counts.promoters, counts.detractors, counts.total),
            promoters: counts.promoters,
            detractors: counts.detractors,
            passives: counts.passives,
            total_responses: counts.total,
        })
        .collect()
}

/// A response belongs to its own cohort tag when one is present; untagged
/// responses borrow the responder's canonical enrollment cohort. Responses
/// that resolve to neither are dropped from cohort-grouped output.
fn attribute_cohort(
    response: &SurveyResponseRow,
    assignments: &HashMap<String, CohortAssignment>,
) -> Option<String> {
    if !response.cohort.trim().is_empty() {
        return Some(response.cohort.clone());
    }
    assignments
        .get(&response.email.to_lowercase())
        .filter(|assignment| !assignment.cohort.is_empty())
        .map(|assignment| assignment.cohort.clone())
}

/// Per-cohort summary over calendar-mode buckets: the latest week's NPS and
/// the all-time score. All-time counts are summed from the weekly buckets
/// rather than recomputed from raw responses, so the summary can never
/// disagree with the weekly series.
pub fn cohort_summary(weekly: &[WeeklyNpsRow]) -> Vec<CohortNpsSummary> {
    let latest_week = weekly.iter().map(|row| row.week).max();

    let mut totals: BTreeMap<String, BucketCounts> = BTreeMap::new();
    let mut this_week: HashMap<String, Option<f64>> = HashMap::new();

    for row in weekly {
        let counts = totals.entry(row.cohort.clone()).or_default();
        counts.promoters += row.promoters;
        counts.detractors += row.detractors;
        counts.passives += row.passives;
        counts.total += row.total_responses;

        if Some(row.week) == latest_week {
            this_week.insert(row.cohort.clone(), row.nps);
        }
    }

    totals
        .into_iter()
        .map(|(cohort, counts)| CohortNpsSummary {
            nps_this_week: this_week.get(&cohort).copied().flatten(),
            nps_all_time: nps_score(counts.promoters, counts.detractors, counts.total),
            cohort,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::new(date(6, 1), date(7, 31)).unwrap()
    }

    fn response(
        email: &str,
        cohort: &str,
        task_date: NaiveDate,
        program_week: Option<i32>,
        likelihood: i32,
    ) -> SurveyResponseRow {
        SurveyResponseRow {
            id: Uuid::nil(),
            user_id: 1,
            email: email.to_string(),
            responder_name: "Avery Lee".to_string(),
            cohort: cohort.to_string(),
            task_date,
            program_week,
            referral_likelihood: likelihood,
            what_we_did_well: String::new(),
            what_to_improve: String::new(),
        }
    }

    fn no_assignments() -> HashMap<String, CohortAssignment> {
        HashMap::new()
    }

    #[test]
    fn week_start_rolls_back_to_saturday() {
        // 2025-06-07 is a Saturday.
        assert_eq!(calendar_week_start(date(6, 7)), date(6, 7));
        assert_eq!(calendar_week_start(date(6, 8)), date(6, 7));
        assert_eq!(calendar_week_start(date(6, 11)), date(6, 7));
        assert_eq!(calendar_week_start(date(6, 13)), date(6, 7));
        assert_eq!(calendar_week_start(date(6, 14)), date(6, 14));
    }

    #[test]
    fn six_promoters_one_detractor_three_passives_is_fifty() {
        let mut responses = Vec::new();
        for _ in 0..6 {
            responses.push(response("a@x.com", "June 2025", date(6, 9), Some(1), 10));
        }
        responses.push(response("a@x.com", "June 2025", date(6, 9), Some(1), 4));
        for _ in 0..3 {
            responses.push(response("a@x.com", "June 2025", date(6, 9), Some(1), 7));
        }

        let rows = weekly_nps(
            &responses,
            &no_assignments(),
            &window(),
            None,
            WeekMode::Calendar,
        );
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.promoters, 6);
        assert_eq!(row.detractors, 1);
        assert_eq!(row.passives, 3);
        assert_eq!(row.total_responses, 10);
        assert_eq!(row.nps, Some(50.0));
    }

    #[test]
    fn classification_boundaries() {
        let responses = vec![
            response("a@x.com", "June 2025", date(6, 9), None, 9),
            response("a@x.com", "June 2025", date(6, 9), None, 8),
            response("a@x.com", "June 2025", date(6, 9), None, 7),
            response("a@x.com", "June 2025", date(6, 9), None, 6),
            response("a@x.com", "June 2025", date(6, 9), None, 0),
        ];
        let rows = weekly_nps(
            &responses,
            &no_assignments(),
            &window(),
            None,
            WeekMode::Calendar,
        );
        let row = &rows[0];
        assert_eq!(row.promoters, 1);
        assert_eq!(row.passives, 2);
        assert_eq!(row.detractors, 2);
    }

    #[test]
    fn program_mode_groups_by_program_week_and_skips_untagged() {
        let responses = vec![
            response("a@x.com", "June 2025", date(6, 9), Some(1), 10),
            response("a@x.com", "June 2025", date(6, 16), Some(2), 2),
            response("a@x.com", "June 2025", date(6, 23), None, 9),
        ];
        let rows = weekly_nps(
            &responses,
            &no_assignments(),
            &window(),
            None,
            WeekMode::Program,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].week, WeekKey::Program(1));
        assert_eq!(rows[0].nps, Some(100.0));
        assert_eq!(rows[1].week, WeekKey::Program(2));
        assert_eq!(rows[1].nps, Some(-100.0));
    }

    #[test]
    fn untagged_responses_borrow_the_enrollment_cohort() {
        let mut assignments = HashMap::new();
        assignments.insert(
            "avery@example.com".to_string(),
            CohortAssignment {
                cohort: "March 2025".to_string(),
                level: "L2".to_string(),
            },
        );
        let responses = vec![
            response("Avery@Example.com", "", date(6, 9), Some(1), 10),
            response("ghost@example.com", "", date(6, 9), Some(1), 0),
        ];

        let rows = weekly_nps(&responses, &assignments, &window(), None, WeekMode::Calendar);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cohort, "March 2025");
        assert_eq!(rows[0].total_responses, 1);
    }

    #[test]
    fn cohort_filter_drops_other_cohorts() {
        let responses = vec![
            response("a@x.com", "June 2025", date(6, 9), Some(1), 10),
            response("b@x.com", "March 2025", date(6, 9), Some(5), 10),
        ];
        let rows = weekly_nps(
            &responses,
            &no_assignments(),
            &window(),
            Some("June 2025"),
            WeekMode::Calendar,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cohort, "June 2025");
    }

    #[test]
    fn buckets_are_sparse_and_ordered() {
        let responses = vec![
            response("a@x.com", "June 2025", date(7, 7), Some(5), 10),
            response("a@x.com", "June 2025", date(6, 9), Some(1), 10),
            response("b@x.com", "March 2025", date(6, 9), Some(14), 2),
        ];
        let rows = weekly_nps(
            &responses,
            &no_assignments(),
            &window(),
            None,
            WeekMode::Calendar,
        );
        // No zero-filled weeks between 6-07 and 7-05, and rows group by
        // cohort before week.
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cohort, "June 2025");
        assert_eq!(rows[0].week, WeekKey::Calendar(date(6, 7)));
        assert_eq!(rows[1].week, WeekKey::Calendar(date(7, 5)));
        assert_eq!(rows[2].cohort, "March 2025");
    }

    #[test]
    fn all_time_summary_matches_direct_computation() {
        let mut responses = Vec::new();
        // Week of 6-07: 3 promoters, 1 detractor. Week of 6-14: 1 promoter,
        // 2 passives, 1 detractor.
        for _ in 0..3 {
            responses.push(response("a@x.com", "June 2025", date(6, 9), Some(1), 9));
        }
        responses.push(response("a@x.com", "June 2025", date(6, 10), Some(1), 3));
        responses.push(response("a@x.com", "June 2025", date(6, 16), Some(2), 10));
        responses.push(response("a@x.com", "June 2025", date(6, 16), Some(2), 7));
        responses.push(response("a@x.com", "June 2025", date(6, 17), Some(2), 8));
        responses.push(response("a@x.com", "June 2025", date(6, 17), Some(2), 1));

        let weekly = weekly_nps(
            &responses,
            &no_assignments(),
            &window(),
            None,
            WeekMode::Calendar,
        );
        let summary = cohort_summary(&weekly);
        assert_eq!(summary.len(), 1);

        // Direct computation over the raw set: 4 promoters, 2 detractors,
        // 8 responses.
        let direct = nps_score(4, 2, 8).unwrap();
        let from_buckets = summary[0].nps_all_time.unwrap();
        assert!((direct - from_buckets).abs() < f64::EPSILON);
    }

    #[test]
    fn this_week_is_the_latest_calendar_bucket() {
        let responses = vec![
            response("a@x.com", "June 2025", date(6, 9), Some(1), 10),
            response("a@x.com", "June 2025", date(6, 16), Some(2), 0),
            response("b@x.com", "March 2025", date(6, 9), Some(14), 10),
        ];
        let weekly = weekly_nps(
            &responses,
            &no_assignments(),
            &window(),
            None,
            WeekMode::Calendar,
        );
        let summary = cohort_summary(&weekly);

        let june = summary.iter().find(|s| s.cohort == "June 2025").unwrap();
        assert_eq!(june.nps_this_week, Some(-100.0));
        assert_eq!(june.nps_all_time, Some(0.0));

        // March 2025 has no bucket in the latest week.
        let march = summary.iter().find(|s| s.cohort == "March 2025").unwrap();
        assert_eq!(march.nps_this_week, None);
        assert_eq!(march.nps_all_time, Some(100.0));
    }

    #[test]
    fn empty_input_produces_empty_output() {
        let rows = weekly_nps(&[], &no_assignments(), &window(), None, WeekMode::Calendar);
        assert!(rows.is_empty());
        assert!(cohort_summary(&rows).is_empty());
    }
}
