use std::sync::Arc;

use tracing::debug;

use super::cache::{CacheStats, MatchCache};
use super::domain::{
    MatchResult, ProgramId, ProgramRequirements, StudentAcademicProfile, StudentId,
};
use super::flags::{EvaluationContext, FeatureFlagResolver, MatchVariants};
use super::repository::{ProgramRepository, RepositoryError, StudentRepository};
use super::scoring::{MatchInput, MatchMode, MatchWeights, WeightError, WeightTable};
use super::transform::{transform_program, transform_student, TransformError};
use super::warmer::{load_catalog, warm_programs_cache, WarmError, WarmReport};

/// Service composing the repositories, flag resolver, weight table, and match cache.
pub struct MatchingService<S, P> {
    students: Arc<S>,
    programs: Arc<P>,
    cache: Arc<MatchCache>,
    flags: FeatureFlagResolver,
    weights: WeightTable,
}

impl<S, P> MatchingService<S, P>
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    pub fn new(
        students: Arc<S>,
        programs: Arc<P>,
        cache: Arc<MatchCache>,
        flags: FeatureFlagResolver,
        weights: WeightTable,
    ) -> Self {
        Self {
            students,
            programs,
            cache,
            flags,
            weights,
        }
    }

    pub fn cache(&self) -> &MatchCache {
        &self.cache
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    fn variants_for(&self, student_id: &StudentId) -> MatchVariants {
        self.flags
            .variants_for(&EvaluationContext::for_user(student_id.0.clone()))
    }

    fn load_student(&self, student_id: &StudentId) -> Result<StudentAcademicProfile, MatchServiceError> {
        let raw = self
            .students
            .fetch(student_id)?
            .ok_or_else(|| MatchServiceError::StudentNotFound(student_id.clone()))?;

        transform_student(&raw).map_err(|error| match error {
            TransformError::ProfileIncomplete(_) => {
                MatchServiceError::ProfileIncomplete(student_id.clone())
            }
            other => MatchServiceError::InvalidProfile(other),
        })
    }

    fn load_program(&self, program_id: &ProgramId) -> Result<ProgramRequirements, MatchServiceError> {
        let raw = self
            .programs
            .fetch(program_id)?
            .ok_or_else(|| MatchServiceError::ProgramNotFound(program_id.clone()))?;

        transform_program(&raw).map_err(|source| MatchServiceError::InvalidProgram {
            program_id: program_id.clone(),
            source,
        })
    }

    fn catalog(&self) -> Result<Vec<ProgramRequirements>, MatchServiceError> {
        if let Some(catalog) = self.cache.cached_catalog() {
            return Ok(catalog);
        }

        let (catalog, _) = load_catalog(self.programs.as_ref())?;
        if let Err(error) = self.cache.store_catalog(&catalog) {
            debug!(%error, "catalog snapshot not cached");
        }
        Ok(catalog)
    }

    /// Score one program for a student under a named mode.
    pub fn match_program(
        &self,
        student_id: &StudentId,
        program_id: &ProgramId,
        mode: MatchMode,
    ) -> Result<MatchResult, MatchServiceError> {
        let student = self.load_student(student_id)?;
        let program = self.load_program(program_id)?;
        let input = MatchInput::new(&student, &program, self.weights.weights_for(mode))
            .with_variants(self.variants_for(student_id));

        Ok(self.cache.get_cached_match(student_id, &input))
    }

    /// Rank the whole catalog for a student under a named mode.
    pub fn match_catalog(
        &self,
        student_id: &StudentId,
        mode: MatchMode,
    ) -> Result<Vec<MatchResult>, MatchServiceError> {
        self.match_catalog_with_weights(student_id, self.weights.weights_for(mode))
    }

    /// Rank the whole catalog for a student under caller-supplied weights.
    pub fn match_catalog_with_weights(
        &self,
        student_id: &StudentId,
        weights: MatchWeights,
    ) -> Result<Vec<MatchResult>, MatchServiceError> {
        let weights = weights.validate()?;
        let student = self.load_student(student_id)?;
        let programs = self.catalog()?;
        let variants = self.variants_for(student_id);

        Ok(self
            .cache
            .get_cached_matches(student_id, &student, &programs, weights, variants))
    }

    /// Hook for profile edits (points, courses, preferences).
    pub fn student_updated(&self, student_id: &StudentId) -> usize {
        self.cache.invalidate_student_cache(student_id)
    }

    /// Hook for admin edits to a program's requirements.
    pub fn program_updated(&self, program_id: &ProgramId) -> usize {
        self.cache.invalidate_program_cache(program_id)
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear_all_match_cache()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.get_cache_stats()
    }

    pub fn enabled_variants(&self, student_id: &StudentId) -> Vec<&'static str> {
        self.flags
            .enabled_variants(&EvaluationContext::for_user(student_id.0.clone()))
    }

    pub fn warm_catalog(&self) -> Result<WarmReport, WarmError> {
        warm_programs_cache(self.programs.as_ref(), &self.cache)
    }
}

/// Error raised by the matching service.
#[derive(Debug, thiserror::Error)]
pub enum MatchServiceError {
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("program {0} not found")]
    ProgramNotFound(ProgramId),
    #[error("student {0} must complete onboarding before matches are available")]
    ProfileIncomplete(StudentId),
    #[error("student profile is invalid: {0}")]
    InvalidProfile(TransformError),
    #[error("program {program_id} is invalid: {source}")]
    InvalidProgram {
        program_id: ProgramId,
        source: TransformError,
    },
    #[error(transparent)]
    InvalidWeights(#[from] WeightError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
