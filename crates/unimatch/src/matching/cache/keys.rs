use super::super::domain::{ProgramId, StudentId};
use super::super::flags::MatchVariants;
use super::super::scoring::MatchWeights;

pub(crate) const CATALOG_KEY: &str = "programs:catalog";
pub(crate) const ALL_MATCH_KEYS: &str = "match:*";
pub(crate) const ALL_BATCH_KEYS: &str = "batch:*";

/// Weight hash plus the variant signature, so variant results never share a slot.
pub(crate) fn configuration_hash(weights: &MatchWeights, variants: &MatchVariants) -> String {
    let base = weights.cache_hash();
    if variants.is_baseline() {
        base
    } else {
        format!("{base}~{}", variants.signature())
    }
}

pub(crate) fn match_key(student: &StudentId, program: &ProgramId, hash: &str) -> String {
    format!("match:{student}:{program}:{hash}")
}

pub(crate) fn batch_key(student: &StudentId, hash: &str) -> String {
    format!("batch:{student}:{hash}")
}

pub(crate) fn student_match_keys(student: &StudentId) -> String {
    format!("match:{student}:*")
}

pub(crate) fn student_batch_keys(student: &StudentId) -> String {
    format!("batch:{student}:*")
}

pub(crate) fn program_match_keys(program: &ProgramId) -> String {
    format!("match:*:{program}:*")
}
