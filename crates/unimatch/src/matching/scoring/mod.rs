mod academic;
mod config;
mod preferences;
mod requirements;
mod weights;

pub use config::ScoringConstants;
pub use weights::{MatchMode, MatchWeights, WeightError, WeightTable};

use super::domain::{
    MatchConfidence, MatchResult, PointsSource, ProgramRequirements, ScoreBreakdown,
    StudentAcademicProfile,
};
use super::flags::MatchVariants;

/// Everything a single score depends on.
#[derive(Debug, Clone, Copy)]
pub struct MatchInput<'a> {
    pub student: &'a StudentAcademicProfile,
    pub program: &'a ProgramRequirements,
    pub weights: MatchWeights,
    pub variants: MatchVariants,
}

impl<'a> MatchInput<'a> {
    pub fn new(
        student: &'a StudentAcademicProfile,
        program: &'a ProgramRequirements,
        weights: MatchWeights,
    ) -> Self {
        Self {
            student,
            program,
            weights,
            variants: MatchVariants::default(),
        }
    }

    pub fn with_variants(mut self, variants: MatchVariants) -> Self {
        self.variants = variants;
        self
    }
}

/// Stateless scorer applying the curve constants to a student/program pair.
#[derive(Debug, Clone, Default)]
pub struct MatchScorer {
    constants: ScoringConstants,
}

impl MatchScorer {
    pub fn score(&self, input: &MatchInput<'_>) -> MatchResult {
        let MatchInput {
            student,
            program,
            weights,
            variants,
        } = *input;
        let constants = &self.constants;

        let points = academic::assess_points(student, program, &variants, constants);
        let checks = requirements::check_groups(student, &program.requirement_groups);
        let ratio = requirements::satisfaction_ratio(&checks);
        let academic =
            points.score * (constants.requirement_floor + (1.0 - constants.requirement_floor) * ratio);

        let field = preferences::rank_fit(
            &student.preferred_fields,
            program.field_id.as_deref(),
            constants,
        );
        let location = preferences::rank_fit(
            &student.preferred_countries,
            program.country_code.as_deref(),
            constants,
        );

        let breakdown = ScoreBreakdown {
            academic: to_scale(academic),
            field: to_scale(field),
            location: to_scale(location),
            points: to_scale(points.score),
            requirements: to_scale(ratio * 100.0),
        };

        let combined = weights.academic * f64::from(breakdown.academic)
            + weights.field * f64::from(breakdown.field)
            + weights.location * f64::from(breakdown.location);
        let slack = 100.0 * weights::WEIGHT_SUM_TOLERANCE + 1e-9;
        debug_assert!(
            (-slack..=100.0 + slack).contains(&combined),
            "combined score {combined} escaped 0-100 for {}",
            program.program_id
        );

        let confidence = variants.confidence.then(|| confidence_for(student));

        MatchResult {
            program_id: program.program_id.clone(),
            overall_score: to_scale(combined),
            breakdown,
            requirements_met: checks.iter().all(|check| check.met),
            requirements: checks,
            adjustments: points.adjustments,
            confidence,
        }
    }
}

fn to_scale(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn confidence_for(student: &StudentAcademicProfile) -> MatchConfidence {
    let has_preferences =
        !student.preferred_fields.is_empty() || !student.preferred_countries.is_empty();
    match student.points_source {
        PointsSource::Achieved if has_preferences => MatchConfidence::High,
        PointsSource::Achieved | PointsSource::Predicted => MatchConfidence::Medium,
        PointsSource::Missing => MatchConfidence::Low,
    }
}

/// Score with the default constants.
pub fn calculate_match(input: &MatchInput<'_>) -> MatchResult {
    MatchScorer::default().score(input)
}
