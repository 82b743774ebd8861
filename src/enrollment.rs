use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::models::{CohortAssignment, EnrollmentRow};

/// Collapse duplicate enrollment rows into one canonical (cohort, level)
/// pair per lower-cased email. The winner maximizes (cohort, level)
/// lexicographically; the ordering is a reproducible tie-break, not a
/// ranking with business meaning. Rows missing an email or a level are
/// never selected. An email with no surviving rows simply has no entry.
pub fn resolve(rows: &[EnrollmentRow]) -> HashMap<String, CohortAssignment> {
    let mut canonical: HashMap<String, CohortAssignment> = HashMap::new();

    for row in rows {
        if row.builder_email.trim().is_empty() || row.level.trim().is_empty() {
            continue;
        }

        let key = row.builder_email.trim().to_lowercase();
        let candidate = CohortAssignment {
            cohort: row.cohort.clone(),
            level: row.level.clone(),
        };

        match canonical.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                if (candidate.cohort.as_str(), candidate.level.as_str())
                    > (current.cohort.as_str(), current.level.as_str())
                {
                    slot.insert(candidate);
                }
            }
        }
    }

    canonical
}
