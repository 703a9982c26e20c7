use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::cache::{CacheError, MatchCache};
use super::domain::ProgramRequirements;
use super::repository::{ProgramRepository, RepositoryError};
use super::transform::transform_program;

/// Summary of a catalog warm-up pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    pub programs: usize,
    pub skipped: usize,
    pub warmed_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum WarmError {
    #[error("could not load program catalog: {0}")]
    Repository(#[from] RepositoryError),
    #[error("could not store program catalog: {0}")]
    Cache(#[from] CacheError),
}

/// Lists and transforms the catalog, skipping malformed programs.
pub(crate) fn load_catalog<P>(programs: &P) -> Result<(Vec<ProgramRequirements>, usize), RepositoryError>
where
    P: ProgramRepository + ?Sized,
{
    let raw = programs.list()?;
    let mut catalog = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for program in &raw {
        match transform_program(program) {
            Ok(program) => catalog.push(program),
            Err(error) => {
                skipped += 1;
                warn!(program = %program.id, %error, "skipping malformed program in catalog");
            }
        }
    }

    Ok((catalog, skipped))
}

/// Pre-load the transformed program catalog into the cache.
pub fn warm_programs_cache<P>(programs: &P, cache: &MatchCache) -> Result<WarmReport, WarmError>
where
    P: ProgramRepository + ?Sized,
{
    let (catalog, skipped) = load_catalog(programs)?;
    cache.store_catalog(&catalog)?;

    let report = WarmReport {
        programs: catalog.len(),
        skipped,
        warmed_at: Utc::now(),
    };
    info!(programs = report.programs, skipped, "program catalog cache warmed");
    Ok(report)
}
