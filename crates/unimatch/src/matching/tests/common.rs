use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::matching::cache::{CacheError, CacheStore, InMemoryCacheStore, MatchCache};
use crate::matching::domain::{
    ProgramId, RawCountry, RawCountryPreference, RawCourse, RawCourseRequirement,
    RawFieldOfStudy, RawFieldPreference, RawProgram, RawRequirementGroup, RawStudentCourse,
    RawStudentProfile, RawSubjectGroup, RawUniversity, StudentId,
};
use crate::matching::flags::FeatureFlagResolver;
use crate::matching::repository::{ProgramRepository, RepositoryError, StudentRepository};
use crate::matching::scoring::WeightTable;
use crate::matching::service::MatchingService;

pub(super) fn raw_course(id: &str, name: &str, group: i32) -> RawCourse {
    RawCourse {
        id: id.to_string(),
        name: name.to_string(),
        subject_group: Some(RawSubjectGroup {
            number: group,
            name: format!("Group {group}"),
        }),
    }
}

pub(super) fn math() -> RawCourse {
    raw_course("math", "Mathematics", 5)
}

pub(super) fn physics() -> RawCourse {
    raw_course("physics", "Physics", 4)
}

pub(super) fn biology() -> RawCourse {
    raw_course("biology", "Biology", 4)
}

pub(super) fn chemistry() -> RawCourse {
    raw_course("chemistry", "Chemistry", 4)
}

pub(super) fn english() -> RawCourse {
    raw_course("english", "English A", 1)
}

pub(super) fn taken(level: &str, course: RawCourse) -> RawStudentCourse {
    RawStudentCourse {
        level: level.to_string(),
        course: Some(course),
    }
}

pub(super) fn field(rank: u32, id: &str) -> RawFieldPreference {
    RawFieldPreference {
        rank: Some(rank),
        field: Some(RawFieldOfStudy {
            id: id.to_string(),
            name: id.to_string(),
        }),
    }
}

pub(super) fn country(rank: u32, code: &str) -> RawCountryPreference {
    RawCountryPreference {
        rank: Some(rank),
        country: Some(RawCountry {
            code: code.to_string(),
            name: code.to_string(),
        }),
    }
}

/// Onboarded student with HL maths and physics who prefers engineering in the Netherlands.
pub(super) fn student(id: &str, points: i32) -> RawStudentProfile {
    RawStudentProfile {
        id: id.to_string(),
        onboarding_completed: true,
        total_points: Some(points),
        predicted_points: None,
        courses: vec![
            taken("HL", math()),
            taken("HL", physics()),
            taken("SL", english()),
        ],
        field_preferences: vec![field(1, "engineering"), field(2, "computer-science")],
        country_preferences: vec![country(1, "NL"), country(2, "DE")],
        updated_at: None,
    }
}

pub(super) fn bare_student(id: &str, points: i32) -> RawStudentProfile {
    RawStudentProfile {
        id: id.to_string(),
        onboarding_completed: true,
        total_points: Some(points),
        ..RawStudentProfile::default()
    }
}

pub(super) fn requirement(level: &str, course: RawCourse) -> RawCourseRequirement {
    RawCourseRequirement {
        level: Some(level.to_string()),
        course: Some(course),
    }
}

pub(super) fn group(operator: &str, requirements: Vec<RawCourseRequirement>) -> RawRequirementGroup {
    RawRequirementGroup {
        operator: Some(operator.to_string()),
        position: None,
        requirements,
    }
}

pub(super) fn program(
    id: &str,
    min_points: Option<i32>,
    field_id: &str,
    country_code: &str,
) -> RawProgram {
    RawProgram {
        id: id.to_string(),
        name: format!("Program {id}"),
        min_ib_points: min_points,
        field_of_study: Some(RawFieldOfStudy {
            id: field_id.to_string(),
            name: field_id.to_string(),
        }),
        university: Some(RawUniversity {
            id: format!("uni-{country_code}"),
            name: format!("University of {country_code}"),
            country: Some(RawCountry {
                code: country_code.to_string(),
                name: country_code.to_string(),
            }),
        }),
        course_requirements: Vec::new(),
    }
}

/// Engineering program that needs HL maths and HL physics.
pub(super) fn engineering_program(id: &str, min_points: Option<i32>) -> RawProgram {
    let mut program = program(id, min_points, "engineering", "NL");
    program.course_requirements = vec![group(
        "AND",
        vec![requirement("HL", math()), requirement("HL", physics())],
    )];
    program
}

pub(super) fn catalog() -> Vec<RawProgram> {
    let mut medicine = program("medicine-uu", Some(40), "medicine", "NL");
    medicine.course_requirements = vec![group(
        "OR",
        vec![requirement("HL", biology()), requirement("HL", chemistry())],
    )];

    vec![
        engineering_program("aero-tud", Some(34)),
        program("cs-tum", Some(36), "computer-science", "DE"),
        program("history-kcl", None, "history", "GB"),
        medicine,
    ]
}

#[derive(Default)]
pub(super) struct MemoryStudents {
    records: Mutex<HashMap<String, RawStudentProfile>>,
}

impl MemoryStudents {
    pub(super) fn with(records: Vec<RawStudentProfile>) -> Self {
        let students = Self::default();
        for record in records {
            students.upsert(record);
        }
        students
    }

    pub(super) fn upsert(&self, record: RawStudentProfile) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }
}

impl StudentRepository for MemoryStudents {
    fn fetch(&self, id: &StudentId) -> Result<Option<RawStudentProfile>, RepositoryError> {
        Ok(self.records.lock().unwrap().get(&id.0).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryPrograms {
    records: Mutex<Vec<RawProgram>>,
}

impl MemoryPrograms {
    pub(super) fn with(records: Vec<RawProgram>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub(super) fn replace(&self, record: RawProgram) {
        let mut records = self.records.lock().unwrap();
        records.retain(|existing| existing.id != record.id);
        records.push(record);
    }
}

impl ProgramRepository for MemoryPrograms {
    fn fetch(&self, id: &ProgramId) -> Result<Option<RawProgram>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|program| program.id == id.0)
            .cloned())
    }

    fn list(&self) -> Result<Vec<RawProgram>, RepositoryError> {
        Ok(self.records.lock().unwrap().clone())
    }
}

pub(super) struct UnavailableRepository;

impl StudentRepository for UnavailableRepository {
    fn fetch(&self, _id: &StudentId) -> Result<Option<RawStudentProfile>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }
}

impl ProgramRepository for UnavailableRepository {
    fn fetch(&self, _id: &ProgramId) -> Result<Option<RawProgram>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn list(&self) -> Result<Vec<RawProgram>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }
}

/// Cache backend that fails every call, standing in for an unreachable Redis.
pub(super) struct FailingCacheStore;

impl CacheStore for FailingCacheStore {
    fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Timeout)
    }

    fn delete_matching(&self, _pattern: &str) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn count_matching(&self, _pattern: &str) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

pub(super) fn memory_cache() -> (Arc<InMemoryCacheStore>, Arc<MatchCache>) {
    let store = Arc::new(InMemoryCacheStore::default());
    let cache = Arc::new(MatchCache::new(store.clone()));
    (store, cache)
}

pub(super) type MemoryService = MatchingService<MemoryStudents, MemoryPrograms>;

pub(super) struct Harness {
    pub students: Arc<MemoryStudents>,
    pub programs: Arc<MemoryPrograms>,
    pub store: Arc<InMemoryCacheStore>,
    pub service: Arc<MemoryService>,
}

pub(super) fn harness_with(flags: FeatureFlagResolver) -> Harness {
    let students = Arc::new(MemoryStudents::with(vec![
        student("stu-1", 38),
        bare_student("stu-bare", 30),
        RawStudentProfile {
            id: "stu-new".to_string(),
            ..RawStudentProfile::default()
        },
    ]));
    let programs = Arc::new(MemoryPrograms::with(catalog()));
    let (store, cache) = memory_cache();
    let service = Arc::new(MatchingService::new(
        students.clone(),
        programs.clone(),
        cache,
        flags,
        WeightTable::default(),
    ));

    Harness {
        students,
        programs,
        store,
        service,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(FeatureFlagResolver::default())
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) async fn assert_status(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    json_body(response).await
}
