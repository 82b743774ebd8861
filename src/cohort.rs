/// Whether a task tagged `raw_cohort` (via its curriculum day) is in scope
/// for a builder whose canonical cohort is `user_cohort`.
///
/// Curriculum days created before cohort tagging existed carry a null or
/// empty tag; in practice those days all belonged to the first cohort ever
/// tracked, so untagged days count for `legacy_cohort` and nobody else.
/// Every cohort-membership decision in the engine goes through this one
/// predicate.
pub fn in_cohort_scope(
    raw_cohort: Option<&str>,
    user_cohort: &str,
    legacy_cohort: &str,
) -> bool {
    match raw_cohort {
        Some(tag) if !tag.trim().is_empty() => tag == user_cohort,
        _ => user_cohort == legacy_cohort,
    }
}
