use std::cmp::Ordering;

use super::domain::MatchResult;

/// Descending score, then ascending program id.
fn compare_results(left: &MatchResult, right: &MatchResult) -> Ordering {
    right
        .overall_score
        .cmp(&left.overall_score)
        .then_with(|| left.program_id.cmp(&right.program_id))
}

pub fn rank_results(results: &mut [MatchResult]) {
    results.sort_by(compare_results);
}
