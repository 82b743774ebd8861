use std::fmt::Write;

use crate::filters::DateWindow;
use crate::models::{BuilderCompletion, CohortNpsSummary, SurveyResponseRow, WeeklyNpsRow};

fn fmt_percentage(percentage: Option<i64>) -> String {
    match percentage {
        Some(value) => format!("{value}%"),
        None => "n/a".to_string(),
    }
}

fn fmt_nps(nps: Option<f64>) -> String {
    match nps {
        Some(value) => format!("{value:.0}"),
        None => "n/a".to_string(),
    }
}

pub fn build_report(
    window: &DateWindow,
    completion: &[BuilderCompletion],
    weekly: &[WeeklyNpsRow],
    summary: &[CohortNpsSummary],
    responses: &[SurveyResponseRow],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Builder Metrics Report");
    let _ = writeln!(
        output,
        "Window {} to {}",
        window.start(),
        window.end()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Task Completion");

    if completion.is_empty() {
        let _ = writeln!(output, "No builders matched this window.");
    } else {
        for entry in completion {
            let _ = writeln!(
                output,
                "- {} ({} - {}): {}",
                entry.name,
                if entry.cohort.is_empty() { "unassigned" } else { &entry.cohort },
                if entry.level.is_empty() { "?" } else { &entry.level },
                fmt_percentage(entry.percentage)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly NPS by Cohort (calendar weeks)");

    if weekly.is_empty() {
        let _ = writeln!(output, "No survey responses recorded for this window.");
    } else {
        for row in weekly {
            let _ = writeln!(
                output,
                "- {} {}: NPS {} ({} promoters / {} passives / {} detractors of {})",
                row.cohort,
                row.week,
                fmt_nps(row.nps),
                row.promoters,
                row.passives,
                row.detractors,
                row.total_responses
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohort Summary");

    if summary.is_empty() {
        let _ = writeln!(output, "No cohorts with responses in this window.");
    } else {
        for row in summary {
            let _ = writeln!(
                output,
                "- {}: this week {}, all time {}",
                row.cohort,
                fmt_nps(row.nps_this_week),
                fmt_nps(row.nps_all_time)
            );
        }
    }

    let mut recent: Vec<&SurveyResponseRow> = responses.iter().collect();
    recent.sort_by(|a, b| b.task_date.cmp(&a.task_date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Feedback");

    if recent.is_empty() {
        let _ = writeln!(output, "No feedback submitted for this window.");
    } else {
        for response in recent.iter().take(5) {
            let note = if !response.what_to_improve.is_empty() {
                &response.what_to_improve
            } else {
                &response.what_we_did_well
            };
            let _ = writeln!(
                output,
                "- {} on {} (score {}): {}",
                response.responder_name,
                response.task_date,
                response.referral_likelihood,
                if note.is_empty() { "(no comment)" } else { note }
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeekKey;
    use chrono::NaiveDate;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn report_covers_all_sections() {
        let window = DateWindow::new(date(6, 1), date(6, 30)).unwrap();
        let completion = vec![BuilderCompletion {
            user_id: 1,
            name: "Avery Lee".to_string(),
            cohort: "June 2025".to_string(),
            level: "L1".to_string(),
            percentage: Some(25),
        }];
        let weekly = vec![WeeklyNpsRow {
            cohort: "June 2025".to_string(),
            week: WeekKey::Calendar(date(6, 7)),
            nps: Some(50.0),
            promoters: 6,
            detractors: 1,
            passives: 3,
            total_responses: 10,
        }];
        let summary = vec![CohortNpsSummary {
            cohort: "June 2025".to_string(),
            nps_this_week: Some(50.0),
            nps_all_time: Some(50.0),
        }];

        let report = build_report(&window, &completion, &weekly, &summary, &[]);
        assert!(report.contains("# Builder Metrics Report"));
        assert!(report.contains("- Avery Lee (June 2025 - L1): 25%"));
        assert!(report.contains("NPS 50 (6 promoters / 3 passives / 1 detractors of 10)"));
        assert!(report.contains("- June 2025: this week 50, all time 50"));
        assert!(report.contains("No feedback submitted for this window."));
    }

    #[test]
    fn empty_window_reports_placeholders() {
        let window = DateWindow::new(date(6, 1), date(6, 30)).unwrap();
        let report = build_report(&window, &[], &[], &[], &[]);
        assert!(report.contains("No builders matched this window."));
        assert!(report.contains("No survey responses recorded for this window."));
        assert!(report.contains("No cohorts with responses in this window."));
    }

    #[test]
    fn null_metrics_render_as_na() {
        let window = DateWindow::new(date(6, 1), date(6, 30)).unwrap();
        let completion = vec![BuilderCompletion {
            user_id: 2,
            name: "Sam Okafor".to_string(),
            cohort: String::new(),
            level: String::new(),
            percentage: None,
        }];
        let report = build_report(&window, &completion, &[], &[], &[]);
        assert!(report.contains("- Sam Okafor (unassigned - ?): n/a"));
    }
}
