//! Student-to-program matching: profile flattening, weighted scoring with flag-gated
//! variants, result caching, and the HTTP surface over them.

pub mod batch;
pub mod cache;
pub mod domain;
pub mod flags;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod transform;
pub mod warmer;

#[cfg(test)]
mod tests;

pub use batch::rank_results;
pub use cache::{
    CacheError, CacheStats, CacheStore, InMemoryCacheStore, MatchCache, RedisCacheStore,
};
pub use domain::{
    CourseLevel, CourseRequirement, MatchConfidence, MatchResult, PointsSource, ProgramId,
    ProgramRequirements, RawProgram, RawStudentProfile, RequirementCheck, RequirementGroup,
    ScoreBreakdown, StudentAcademicProfile, StudentId,
};
pub use flags::{
    EvaluationContext, FeatureFlagConfig, FeatureFlagResolver, FlagParseError, FlagSetting,
    MatchVariants,
};
pub use repository::{ProgramRepository, RepositoryError, StudentRepository};
pub use router::matching_router;
pub use scoring::{
    calculate_match, MatchInput, MatchMode, MatchScorer, MatchWeights, ScoringConstants,
    WeightError, WeightTable,
};
pub use service::{MatchServiceError, MatchingService};
pub use transform::{transform_program, transform_student, TransformError};
pub use warmer::{warm_programs_cache, WarmError, WarmReport};
