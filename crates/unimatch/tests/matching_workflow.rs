//! End-to-end matching scenarios driven through the public facade: a CSV catalog import, the
//! matching service, and the HTTP router, without reaching into private modules.

mod common {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use unimatch::catalog::CatalogImporter;
    use unimatch::matching::{
        FeatureFlagResolver, InMemoryCacheStore, MatchCache, MatchingService, ProgramId,
        ProgramRepository, RawProgram, RawStudentProfile, RepositoryError, StudentId,
        StudentRepository, WeightTable,
    };

    pub(super) const CATALOG_CSV: &str = "\
program_id,name,university,country_code,field_id,min_ib_points,requirements
aero-tud,Aerospace Engineering,TU Delft,nl,engineering,34,HL:math(Mathematics) AND HL:physics(Physics)
medicine-ucl,Medicine,University College London,GB,medicine,40,HL:biology(Biology) OR HL:chemistry(Chemistry)
history-kcl,History,King's College London,GB,history,,
";

    #[derive(Default)]
    pub(super) struct Students {
        records: Mutex<HashMap<String, RawStudentProfile>>,
    }

    impl Students {
        pub(super) fn upsert(&self, profile: RawStudentProfile) {
            self.records
                .lock()
                .expect("students lock")
                .insert(profile.id.clone(), profile);
        }
    }

    impl StudentRepository for Students {
        fn fetch(&self, id: &StudentId) -> Result<Option<RawStudentProfile>, RepositoryError> {
            Ok(self.records.lock().expect("students lock").get(&id.0).cloned())
        }
    }

    pub(super) struct Programs {
        records: Vec<RawProgram>,
    }

    impl ProgramRepository for Programs {
        fn fetch(&self, id: &ProgramId) -> Result<Option<RawProgram>, RepositoryError> {
            Ok(self.records.iter().find(|program| program.id == id.0).cloned())
        }

        fn list(&self) -> Result<Vec<RawProgram>, RepositoryError> {
            Ok(self.records.clone())
        }
    }

    pub(super) fn engineer(points: i32) -> RawStudentProfile {
        serde_json::from_value(json!({
            "id": "stu-eng",
            "onboarding_completed": true,
            "predicted_points": points,
            "courses": [
                { "level": "HL", "course": { "id": "math", "name": "Mathematics" } },
                { "level": "HL", "course": { "id": "physics", "name": "Physics" } },
                { "level": "SL", "course": { "id": "chemistry", "name": "Chemistry" } }
            ],
            "field_preferences": [
                { "rank": 1, "field": { "id": "engineering", "name": "Engineering" } }
            ],
            "country_preferences": [
                { "rank": 1, "country": { "code": "NL", "name": "Netherlands" } }
            ]
        }))
        .expect("valid student profile")
    }

    pub(super) type Service = MatchingService<Students, Programs>;

    pub(super) fn service() -> (Arc<Students>, Arc<Service>) {
        let programs = CatalogImporter::from_reader(Cursor::new(CATALOG_CSV)).expect("catalog");
        let students = Arc::new(Students::default());
        students.upsert(engineer(38));

        let service = Arc::new(MatchingService::new(
            students.clone(),
            Arc::new(Programs { records: programs }),
            Arc::new(MatchCache::new(Arc::new(InMemoryCacheStore::new()))),
            FeatureFlagResolver::default(),
            WeightTable::default(),
        ));
        (students, service)
    }
}

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use unimatch::matching::{matching_router, MatchMode, StudentId};

use common::{engineer, service};

#[test]
fn imported_catalog_ranks_the_preferred_program_first() {
    let (_, service) = service();
    let student = StudentId("stu-eng".to_string());

    let report = service.warm_catalog().expect("warm succeeds");
    assert_eq!(report.programs, 3);
    assert_eq!(report.skipped, 0);

    let matches = service
        .match_catalog(&student, MatchMode::Balanced)
        .expect("matches");
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].program_id.0, "aero-tud");
    assert!(matches[0].requirements_met);
    assert!(matches
        .windows(2)
        .all(|pair| pair[0].overall_score >= pair[1].overall_score));

    let medicine = matches
        .iter()
        .find(|result| result.program_id.0 == "medicine-ucl")
        .expect("medicine ranked");
    assert!(!medicine.requirements_met);
}

#[test]
fn profile_updates_take_effect_after_invalidation() {
    let (students, service) = service();
    let student = StudentId("stu-eng".to_string());

    let before = service
        .match_catalog(&student, MatchMode::AcademicFocused)
        .expect("matches");

    students.upsert(engineer(30));
    let stale = service
        .match_catalog(&student, MatchMode::AcademicFocused)
        .expect("matches");
    assert_eq!(before, stale);

    assert!(service.student_updated(&student) > 0);
    let fresh = service
        .match_catalog(&student, MatchMode::AcademicFocused)
        .expect("matches");
    let aero_before = before.iter().find(|r| r.program_id.0 == "aero-tud").unwrap();
    let aero_after = fresh.iter().find(|r| r.program_id.0 == "aero-tud").unwrap();
    assert!(aero_after.breakdown.points < aero_before.breakdown.points);
}

#[tokio::test]
async fn router_serves_ranked_matches_as_json() {
    let (_, service) = service();
    let router = matching_router(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/students/stu-eng/matches?mode=field_focused")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["mode"], "FIELD_FOCUSED");
    assert_eq!(json["matches"][0]["program_id"], "aero-tud");
    assert_eq!(json["matches"].as_array().map(Vec::len), Some(3));
}
