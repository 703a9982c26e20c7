use super::config::ScoringConstants;

/// Rank-based fit of `target` against an ordered preference list.
pub(crate) fn rank_fit(preferences: &[String], target: Option<&str>, constants: &ScoringConstants) -> f64 {
    let Some(target) = target else {
        return constants.unspecified_program_score;
    };
    if preferences.is_empty() {
        return constants.no_preferences_score;
    }

    match preferences
        .iter()
        .position(|preference| preference.eq_ignore_ascii_case(target))
    {
        Some(rank) => (constants.preference_top_score - constants.preference_rank_step * rank as f64)
            .max(constants.preference_floor_score),
        None => constants.unlisted_preference_score,
    }
}
