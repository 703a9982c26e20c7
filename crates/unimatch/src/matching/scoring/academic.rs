use super::super::domain::{ProgramRequirements, StudentAcademicProfile};
use super::super::flags::MatchVariants;
use super::config::ScoringConstants;

pub(crate) struct PointsAssessment {
    pub score: f64,
    pub adjustments: Vec<String>,
}

/// Baseline curve: monotonic non-decreasing in `points`.
pub(crate) fn baseline_curve(points: u8, minimum: u8, constants: &ScoringConstants) -> f64 {
    let points = f64::from(points);
    let minimum = f64::from(minimum);
    let buffer = f64::from(constants.buffer_points.max(1));
    let falloff = f64::from(constants.falloff_points.max(1));

    if points >= minimum + buffer {
        100.0
    } else if points >= minimum {
        constants.threshold_score + (100.0 - constants.threshold_score) * (points - minimum) / buffer
    } else if points > minimum - falloff {
        let progress = (points - (minimum - falloff)) / falloff;
        constants.threshold_score * progress * progress
    } else {
        0.0
    }
}

/// Logistic curve used by the V10 variant; still monotonic and saturating at the buffer.
pub(crate) fn v10_curve(points: u8, minimum: u8, constants: &ScoringConstants) -> f64 {
    if points >= minimum.saturating_add(constants.buffer_points) {
        return 100.0;
    }
    let center = f64::from(minimum) - constants.v10_center_offset;
    let exponent = -constants.v10_steepness * (f64::from(points) - center);
    100.0 / (1.0 + exponent.exp())
}

fn implausibility(student: &StudentAcademicProfile, constants: &ScoringConstants) -> Option<String> {
    let higher = student.higher_level_count();
    if higher > constants.max_higher_level_courses {
        return Some(format!(
            "profile lists {higher} HL courses (max {}), points discounted",
            constants.max_higher_level_courses
        ));
    }
    if student.courses.len() > constants.max_courses {
        return Some(format!(
            "profile lists {} courses (max {}), points discounted",
            student.courses.len(),
            constants.max_courses
        ));
    }
    None
}

pub(crate) fn assess_points(
    student: &StudentAcademicProfile,
    program: &ProgramRequirements,
    variants: &MatchVariants,
    constants: &ScoringConstants,
) -> PointsAssessment {
    let mut adjustments = Vec::new();

    let mut score = match (program.min_points, student.points) {
        (None, _) => constants.no_minimum_score,
        (Some(_), None) => {
            return PointsAssessment {
                score: constants.unknown_points_score,
                adjustments,
            };
        }
        (Some(minimum), Some(points)) => {
            let mut score = if variants.v10_curve {
                v10_curve(points, minimum, constants)
            } else {
                baseline_curve(points, minimum, constants)
            };
            if variants.selectivity_boost
                && minimum >= constants.selective_minimum
                && points >= minimum
            {
                score = (score + constants.selectivity_bonus).min(100.0);
                adjustments.push(format!(
                    "selectivity boost: meets a {minimum}-point minimum"
                ));
            }
            score
        }
    };

    if variants.anti_gaming {
        if let Some(note) = implausibility(student, constants) {
            score *= constants.implausible_discount;
            adjustments.push(note);
        }
    }

    PointsAssessment {
        score: score.clamp(0.0, 100.0),
        adjustments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_curve_hits_documented_anchors() {
        let constants = ScoringConstants::default();
        assert_eq!(baseline_curve(38, 34, &constants), 100.0);
        assert_eq!(baseline_curve(37, 34, &constants), 100.0);
        assert_eq!(baseline_curve(34, 34, &constants), 85.0);
        assert_eq!(baseline_curve(26, 34, &constants), 0.0);
        assert!(baseline_curve(30, 34, &constants) > 0.0);
    }

    #[test]
    fn curves_are_monotonic_for_every_minimum() {
        let constants = ScoringConstants::default();
        for minimum in 0..=45u8 {
            let mut previous_baseline = -1.0;
            let mut previous_v10 = -1.0;
            for points in 0..=45u8 {
                let baseline = baseline_curve(points, minimum, &constants);
                let v10 = v10_curve(points, minimum, &constants);
                assert!(baseline >= previous_baseline, "baseline dips at {points}/{minimum}");
                assert!(v10 >= previous_v10, "v10 dips at {points}/{minimum}");
                assert!((0.0..=100.0).contains(&baseline));
                assert!((0.0..=100.0).contains(&v10));
                previous_baseline = baseline;
                previous_v10 = v10;
            }
        }
    }
}
