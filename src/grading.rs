use serde_json::Value;

/// Deliverable types that can receive a grade at all.
const GRADEABLE_DELIVERABLES: [&str; 4] = ["text", "link", "document", "video"];

pub fn is_gradeable_deliverable(deliverable_type: &str) -> bool {
    GRADEABLE_DELIVERABLES.contains(&deliverable_type)
}

/// Whether an analysis blob represents a genuine evaluated submission rather
/// than the placeholder written when a submission arrives ungraded.
///
/// Graded means: completion_score parses as a number, is non-zero, and the
/// criteria list is not the auto-generated placeholder. Blobs that fail to
/// parse as JSON are logged and excluded; a missing or null score is the
/// normal shape of an ungraded record and is excluded quietly.
pub fn is_graded(analysis: &str) -> bool {
    let blob: Value = match serde_json::from_str(analysis) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "skipping unparseable analysis blob");
            return false;
        }
    };

    match completion_score(&blob) {
        Some(score) if score != 0.0 => !is_placeholder_criteria(&blob),
        _ => false,
    }
}

/// The upstream grading pipeline scores as JSON numbers, but older rows
/// carry the score as a numeric string; both count.
fn completion_score(blob: &Value) -> Option<f64> {
    match blob.get("completion_score")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The grading pipeline writes criteria_met = ["Submission received"] when a
/// submission arrives before any real grading pass. The match is exact; if
/// the pipeline ever rewords that sentinel this predicate is the single
/// place to update.
pub fn is_placeholder_criteria(blob: &Value) -> bool {
    match blob.get("criteria_met").and_then(Value::as_array) {
        Some(items) => items.len() == 1 && items[0].as_str() == Some("Submission received"),
        None => false,
    }
}
