use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;
use unimatch::config::CacheConfig;
use unimatch::matching::domain::{
    RawCountry, RawCountryPreference, RawCourse, RawCourseRequirement, RawFieldOfStudy,
    RawFieldPreference, RawProgram, RawRequirementGroup, RawStudentCourse, RawSubjectGroup,
    RawUniversity,
};
use unimatch::matching::{
    CacheStore, InMemoryCacheStore, MatchCache, ProgramId, ProgramRepository, RawStudentProfile,
    RedisCacheStore, RepositoryError, StudentId, StudentRepository,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn recover<'a, T>(
    result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryStudentRepository {
    records: Arc<Mutex<HashMap<String, RawStudentProfile>>>,
}

impl InMemoryStudentRepository {
    pub(crate) fn with_students(students: Vec<RawStudentProfile>) -> Self {
        let repository = Self::default();
        {
            let mut guard = recover(repository.records.lock());
            for student in students {
                guard.insert(student.id.clone(), student);
            }
        }
        repository
    }
}

impl StudentRepository for InMemoryStudentRepository {
    fn fetch(&self, id: &StudentId) -> Result<Option<RawStudentProfile>, RepositoryError> {
        Ok(recover(self.records.lock()).get(&id.0).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProgramRepository {
    records: Arc<Mutex<Vec<RawProgram>>>,
}

impl InMemoryProgramRepository {
    pub(crate) fn with_programs(programs: Vec<RawProgram>) -> Self {
        Self {
            records: Arc::new(Mutex::new(programs)),
        }
    }
}

impl ProgramRepository for InMemoryProgramRepository {
    fn fetch(&self, id: &ProgramId) -> Result<Option<RawProgram>, RepositoryError> {
        Ok(recover(self.records.lock())
            .iter()
            .find(|program| program.id == id.0)
            .cloned())
    }

    fn list(&self) -> Result<Vec<RawProgram>, RepositoryError> {
        Ok(recover(self.records.lock()).clone())
    }
}

/// Redis when configured and reachable; process memory otherwise.
pub(crate) fn build_match_cache(config: &CacheConfig) -> MatchCache {
    let store: Arc<dyn CacheStore> = match config.url.as_deref() {
        Some(url) => match RedisCacheStore::connect(url, config.timeout) {
            Ok(store) => Arc::new(store),
            Err(error) => {
                warn!(%error, "redis match cache unreachable, falling back to in-memory cache");
                Arc::new(InMemoryCacheStore::new())
            }
        },
        None => Arc::new(InMemoryCacheStore::new()),
    };

    MatchCache::new(store)
        .with_ttl(config.match_ttl)
        .with_catalog_ttl(config.catalog_ttl)
}

fn course(id: &str, name: &str, group: i32) -> RawCourse {
    RawCourse {
        id: id.to_string(),
        name: name.to_string(),
        subject_group: Some(RawSubjectGroup {
            number: group,
            name: format!("Group {group}"),
        }),
    }
}

fn taken(level: &str, course: RawCourse) -> RawStudentCourse {
    RawStudentCourse {
        level: level.to_string(),
        course: Some(course),
    }
}

fn required(level: &str, course: RawCourse) -> RawCourseRequirement {
    RawCourseRequirement {
        level: Some(level.to_string()),
        course: Some(course),
    }
}

fn located(id: &str, name: &str, country_code: &str, country_name: &str) -> Option<RawUniversity> {
    Some(RawUniversity {
        id: id.to_string(),
        name: name.to_string(),
        country: Some(RawCountry {
            code: country_code.to_string(),
            name: country_name.to_string(),
        }),
    })
}

fn field(id: &str, name: &str) -> Option<RawFieldOfStudy> {
    Some(RawFieldOfStudy {
        id: id.to_string(),
        name: name.to_string(),
    })
}

/// Built-in catalog used when no CSV is configured.
pub(crate) fn demo_programs() -> Vec<RawProgram> {
    let math = || course("math", "Mathematics", 5);
    let physics = || course("physics", "Physics", 4);
    let biology = || course("biology", "Biology", 4);
    let chemistry = || course("chemistry", "Chemistry", 4);

    vec![
        RawProgram {
            id: "aerospace-tud".to_string(),
            name: "BSc Aerospace Engineering".to_string(),
            min_ib_points: Some(34),
            field_of_study: field("engineering", "Engineering"),
            university: located("tud", "TU Delft", "NL", "Netherlands"),
            course_requirements: vec![RawRequirementGroup {
                operator: Some("AND".to_string()),
                position: Some(1),
                requirements: vec![required("HL", math()), required("HL", physics())],
            }],
        },
        RawProgram {
            id: "informatics-tum".to_string(),
            name: "BSc Informatics".to_string(),
            min_ib_points: Some(36),
            field_of_study: field("computer-science", "Computer Science"),
            university: located("tum", "TU Munich", "DE", "Germany"),
            course_requirements: vec![RawRequirementGroup {
                operator: None,
                position: Some(1),
                requirements: vec![required("HL", math())],
            }],
        },
        RawProgram {
            id: "medicine-ucl".to_string(),
            name: "MBBS Medicine".to_string(),
            min_ib_points: Some(39),
            field_of_study: field("medicine", "Medicine"),
            university: located("ucl", "University College London", "GB", "United Kingdom"),
            course_requirements: vec![RawRequirementGroup {
                operator: Some("OR".to_string()),
                position: Some(1),
                requirements: vec![required("HL", biology()), required("HL", chemistry())],
            }],
        },
        RawProgram {
            id: "liberal-arts-uu".to_string(),
            name: "BA Liberal Arts and Sciences".to_string(),
            min_ib_points: None,
            field_of_study: field("liberal-arts", "Liberal Arts"),
            university: located("uu", "Utrecht University", "NL", "Netherlands"),
            course_requirements: Vec::new(),
        },
        RawProgram {
            id: "economics-lse".to_string(),
            name: "BSc Economics".to_string(),
            min_ib_points: Some(38),
            field_of_study: field("economics", "Economics"),
            university: located("lse", "London School of Economics", "GB", "United Kingdom"),
            course_requirements: vec![RawRequirementGroup {
                operator: Some("AND".to_string()),
                position: Some(1),
                requirements: vec![required("HL", math())],
            }],
        },
    ]
}

/// Demo student whose point total the CLI can override.
pub(crate) fn demo_student(points: i32) -> RawStudentProfile {
    RawStudentProfile {
        id: "demo-student".to_string(),
        onboarding_completed: true,
        total_points: None,
        predicted_points: Some(points),
        courses: vec![
            taken("HL", course("math", "Mathematics", 5)),
            taken("HL", course("physics", "Physics", 4)),
            taken("HL", course("economics", "Economics", 3)),
            taken("SL", course("chemistry", "Chemistry", 4)),
            taken("SL", course("english-a", "English A", 1)),
            taken("SL", course("spanish-b", "Spanish B", 2)),
        ],
        field_preferences: vec![
            RawFieldPreference {
                rank: Some(1),
                field: field("engineering", "Engineering"),
            },
            RawFieldPreference {
                rank: Some(2),
                field: field("economics", "Economics"),
            },
        ],
        country_preferences: vec![
            RawCountryPreference {
                rank: Some(1),
                country: Some(RawCountry {
                    code: "NL".to_string(),
                    name: "Netherlands".to_string(),
                }),
            },
            RawCountryPreference {
                rank: Some(2),
                country: Some(RawCountry {
                    code: "GB".to_string(),
                    name: "United Kingdom".to_string(),
                }),
            },
        ],
        updated_at: None,
    }
}
