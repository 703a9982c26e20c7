use super::domain::{ProgramId, RawProgram, RawStudentProfile, StudentId};

/// Read-only access to student records in the relational store.
pub trait StudentRepository: Send + Sync {
    fn fetch(&self, id: &StudentId) -> Result<Option<RawStudentProfile>, RepositoryError>;
}

/// Read-only access to program records in the relational store.
pub trait ProgramRepository: Send + Sync {
    fn fetch(&self, id: &ProgramId) -> Result<Option<RawProgram>, RepositoryError>;
    fn list(&self) -> Result<Vec<RawProgram>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
