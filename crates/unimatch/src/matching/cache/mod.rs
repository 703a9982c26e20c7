pub(crate) mod keys;
pub mod redis;
pub(crate) mod store;

pub use self::redis::RedisCacheStore;
pub use store::{CacheError, CacheStore, InMemoryCacheStore};

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::batch::rank_results;
use super::domain::{MatchResult, ProgramId, ProgramRequirements, StudentAcademicProfile, StudentId};
use super::flags::MatchVariants;
use super::scoring::{MatchInput, MatchScorer, MatchWeights};

pub const DEFAULT_MATCH_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(3600);

/// Key counts reported for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub match_keys: usize,
    pub batch_keys: usize,
    pub total_keys: usize,
}

/// Memoizes scorer output. Backend failures degrade to direct computation.
pub struct MatchCache {
    store: Arc<dyn CacheStore>,
    scorer: MatchScorer,
    ttl: Duration,
    catalog_ttl: Duration,
}

impl MatchCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            scorer: MatchScorer::default(),
            ttl: DEFAULT_MATCH_TTL,
            catalog_ttl: DEFAULT_CATALOG_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_catalog_ttl(mut self, ttl: Duration) -> Self {
        self.catalog_ttl = ttl;
        self
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(error) => {
                debug!(key, %error, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                debug!(key, %error, "cache entry undecodable, treating as miss");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let encoded = serde_json::to_string(value)?;
        self.store.set(key, &encoded, ttl)
    }

    fn write_quietly<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(error) = self.write(key, value, self.ttl) {
            debug!(key, %error, "cache write failed, result returned uncached");
        }
    }

    fn delete_quietly(&self, pattern: &str) -> usize {
        self.store.delete_matching(pattern).unwrap_or_else(|error| {
            debug!(pattern, %error, "cache invalidation failed, entries expire by ttl");
            0
        })
    }

    fn count_quietly(&self, pattern: &str) -> usize {
        self.store.count_matching(pattern).unwrap_or_else(|error| {
            debug!(pattern, %error, "cache key count failed");
            0
        })
    }

    /// Single pair lookup; a hit never re-invokes the scorer.
    pub fn get_cached_match(&self, student_id: &StudentId, input: &MatchInput<'_>) -> MatchResult {
        let hash = keys::configuration_hash(&input.weights, &input.variants);
        let key = keys::match_key(student_id, &input.program.program_id, &hash);

        if let Some(hit) = self.read::<MatchResult>(&key) {
            return hit;
        }

        let result = self.scorer.score(input);
        self.write_quietly(&key, &result);
        result
    }

    /// Ranked results for a catalog, stored under one batch key per configuration.
    pub fn get_cached_matches(
        &self,
        student_id: &StudentId,
        student: &StudentAcademicProfile,
        programs: &[ProgramRequirements],
        weights: MatchWeights,
        variants: MatchVariants,
    ) -> Vec<MatchResult> {
        let hash = keys::configuration_hash(&weights, &variants);
        let key = keys::batch_key(student_id, &hash);

        if let Some(hit) = self.read::<Vec<MatchResult>>(&key) {
            return hit;
        }

        let mut results: Vec<MatchResult> = programs
            .iter()
            .map(|program| {
                let input = MatchInput::new(student, program, weights).with_variants(variants);
                self.get_cached_match(student_id, &input)
            })
            .collect();
        rank_results(&mut results);

        self.write_quietly(&key, &results);
        results
    }

    pub fn invalidate_student_cache(&self, student_id: &StudentId) -> usize {
        let removed = self.delete_quietly(&keys::student_match_keys(student_id))
            + self.delete_quietly(&keys::student_batch_keys(student_id));
        debug!(student = %student_id, removed, "invalidated student match cache");
        removed
    }

    /// Drops pair entries for the program plus every batch list and the catalog snapshot,
    /// since all of them may embed the old requirements.
    pub fn invalidate_program_cache(&self, program_id: &ProgramId) -> usize {
        let removed = self.delete_quietly(&keys::program_match_keys(program_id))
            + self.delete_quietly(keys::ALL_BATCH_KEYS)
            + self.delete_quietly(keys::CATALOG_KEY);
        debug!(program = %program_id, removed, "invalidated program match cache");
        removed
    }

    pub fn clear_all_match_cache(&self) -> usize {
        let removed =
            self.delete_quietly(keys::ALL_MATCH_KEYS) + self.delete_quietly(keys::ALL_BATCH_KEYS);
        info!(removed, "cleared match cache");
        removed
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        let match_keys = self.count_quietly(keys::ALL_MATCH_KEYS);
        let batch_keys = self.count_quietly(keys::ALL_BATCH_KEYS);
        CacheStats {
            match_keys,
            batch_keys,
            total_keys: match_keys + batch_keys,
        }
    }

    pub fn store_catalog(&self, programs: &[ProgramRequirements]) -> Result<(), CacheError> {
        self.write(keys::CATALOG_KEY, programs, self.catalog_ttl)
    }

    pub fn cached_catalog(&self) -> Option<Vec<ProgramRequirements>> {
        self.read(keys::CATALOG_KEY)
    }
}
