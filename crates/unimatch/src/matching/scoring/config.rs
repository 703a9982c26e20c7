use serde::{Deserialize, Serialize};

/// Curve and fall-off constants used by the scorer.
///
/// Points scoring (baseline): at or above `minimum + buffer_points` scores 100; between the
/// minimum and the buffer the score climbs linearly from `threshold_score`; below the minimum
/// it falls off quadratically to 0 across `falloff_points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConstants {
    pub no_minimum_score: f64,
    pub unknown_points_score: f64,
    pub threshold_score: f64,
    pub buffer_points: u8,
    pub falloff_points: u8,
    /// Share of the points score kept when no requirement group is met.
    pub requirement_floor: f64,
    pub preference_top_score: f64,
    pub preference_rank_step: f64,
    pub preference_floor_score: f64,
    pub unlisted_preference_score: f64,
    pub no_preferences_score: f64,
    pub unspecified_program_score: f64,
    pub v10_steepness: f64,
    pub v10_center_offset: f64,
    pub selective_minimum: u8,
    pub selectivity_bonus: f64,
    pub max_higher_level_courses: usize,
    pub max_courses: usize,
    pub implausible_discount: f64,
}

impl Default for ScoringConstants {
    fn default() -> Self {
        Self {
            no_minimum_score: 85.0,
            unknown_points_score: 50.0,
            threshold_score: 85.0,
            buffer_points: 3,
            falloff_points: 8,
            requirement_floor: 0.5,
            preference_top_score: 100.0,
            preference_rank_step: 15.0,
            preference_floor_score: 55.0,
            unlisted_preference_score: 20.0,
            no_preferences_score: 60.0,
            unspecified_program_score: 50.0,
            v10_steepness: 0.6,
            v10_center_offset: 2.0,
            selective_minimum: 38,
            selectivity_bonus: 5.0,
            max_higher_level_courses: 4,
            max_courses: 6,
            implausible_discount: 0.85,
        }
    }
}
