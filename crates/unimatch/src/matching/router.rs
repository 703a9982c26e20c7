use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{ProgramId, StudentId};
use super::repository::{ProgramRepository, StudentRepository};
use super::scoring::{MatchMode, MatchWeights};
use super::service::{MatchServiceError, MatchingService};
use super::transform::validate_identifier;

/// Router builder exposing match, invalidation, and cache admin endpoints.
pub fn matching_router<S, P>(service: Arc<MatchingService<S, P>>) -> Router
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/students/:student_id/matches",
            get(catalog_handler::<S, P>).post(custom_weights_handler::<S, P>),
        )
        .route(
            "/api/v1/students/:student_id/matches/:program_id",
            get(program_handler::<S, P>),
        )
        .route(
            "/api/v1/students/:student_id/cache/invalidate",
            post(student_invalidate_handler::<S, P>),
        )
        .route(
            "/api/v1/students/:student_id/flags",
            get(flags_handler::<S, P>),
        )
        .route(
            "/api/v1/programs/:program_id/cache/invalidate",
            post(program_invalidate_handler::<S, P>),
        )
        .route("/api/v1/matches/cache", delete(clear_handler::<S, P>))
        .route("/api/v1/matches/cache/stats", get(stats_handler::<S, P>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ModeQuery {
    #[serde(default)]
    mode: Option<String>,
}

impl ModeQuery {
    fn resolve(&self) -> Result<MatchMode, Response> {
        match self.mode.as_deref() {
            None => Ok(MatchMode::default()),
            Some(raw) => raw
                .parse::<MatchMode>()
                .map_err(|error| unprocessable(error.to_string())),
        }
    }
}

fn unprocessable(message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

fn student_id(raw: &str) -> Result<StudentId, Response> {
    validate_identifier(raw)
        .map(StudentId)
        .map_err(|error| unprocessable(error.to_string()))
}

fn program_id(raw: &str) -> Result<ProgramId, Response> {
    validate_identifier(raw)
        .map(ProgramId)
        .map_err(|error| unprocessable(error.to_string()))
}

fn unavailable() -> Response {
    let payload = json!({
        "error": "matching is temporarily unavailable",
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}

/// Runs a service call on the blocking pool; cache round trips and scoring never stall the
/// async workers.
async fn on_worker<S, P, T>(
    service: &Arc<MatchingService<S, P>>,
    op: impl FnOnce(&MatchingService<S, P>) -> T + Send + 'static,
) -> Result<T, Response>
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|error| {
            error!(%error, "match worker did not complete");
            unavailable()
        })
}

fn error_response(error: MatchServiceError) -> Response {
    match error {
        MatchServiceError::StudentNotFound(_) | MatchServiceError::ProgramNotFound(_) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        MatchServiceError::ProfileIncomplete(student_id) => {
            let payload = json!({
                "error": "profile_incomplete",
                "student_id": student_id.0,
                "message": "Finish onboarding (IB points, courses, and preferences) to see program matches.",
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        MatchServiceError::InvalidProfile(_)
        | MatchServiceError::InvalidProgram { .. }
        | MatchServiceError::InvalidWeights(_) => unprocessable(error.to_string()),
        MatchServiceError::Repository(_) => {
            error!(%error, "match request failed");
            unavailable()
        }
    }
}

pub(crate) async fn catalog_handler<S, P>(
    State(service): State<Arc<MatchingService<S, P>>>,
    Path(raw_student): Path<String>,
    Query(query): Query<ModeQuery>,
) -> Response
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    let (student, mode) = match (student_id(&raw_student), query.resolve()) {
        (Ok(student), Ok(mode)) => (student, mode),
        (Err(response), _) | (_, Err(response)) => return response,
    };

    let id = student.clone();
    match on_worker(&service, move |service| service.match_catalog(&id, mode)).await {
        Err(response) => response,
        Ok(Ok(matches)) => {
            let payload = json!({
                "student_id": student.0,
                "mode": mode,
                "matches": matches,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(Err(error)) => error_response(error),
    }
}

pub(crate) async fn custom_weights_handler<S, P>(
    State(service): State<Arc<MatchingService<S, P>>>,
    Path(raw_student): Path<String>,
    axum::Json(weights): axum::Json<MatchWeights>,
) -> Response
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    let student = match student_id(&raw_student) {
        Ok(student) => student,
        Err(response) => return response,
    };

    let id = student.clone();
    match on_worker(&service, move |service| {
        service.match_catalog_with_weights(&id, weights)
    })
    .await
    {
        Err(response) => response,
        Ok(Ok(matches)) => {
            let payload = json!({
                "student_id": student.0,
                "weights": weights,
                "matches": matches,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(Err(error)) => error_response(error),
    }
}

pub(crate) async fn program_handler<S, P>(
    State(service): State<Arc<MatchingService<S, P>>>,
    Path((raw_student, raw_program)): Path<(String, String)>,
    Query(query): Query<ModeQuery>,
) -> Response
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    let (student, program, mode) = match (
        student_id(&raw_student),
        program_id(&raw_program),
        query.resolve(),
    ) {
        (Ok(student), Ok(program), Ok(mode)) => (student, program, mode),
        (Err(response), _, _) | (_, Err(response), _) | (_, _, Err(response)) => return response,
    };

    match on_worker(&service, move |service| {
        service.match_program(&student, &program, mode)
    })
    .await
    {
        Err(response) => response,
        Ok(Ok(result)) => (StatusCode::OK, axum::Json(result)).into_response(),
        Ok(Err(error)) => error_response(error),
    }
}

pub(crate) async fn student_invalidate_handler<S, P>(
    State(service): State<Arc<MatchingService<S, P>>>,
    Path(raw_student): Path<String>,
) -> Response
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    match student_id(&raw_student) {
        Ok(student) => {
            let id = student.clone();
            let removed =
                match on_worker(&service, move |service| service.student_updated(&id)).await {
                    Ok(removed) => removed,
                    Err(response) => return response,
                };
            let payload = json!({
                "student_id": student.0,
                "removed": removed,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn program_invalidate_handler<S, P>(
    State(service): State<Arc<MatchingService<S, P>>>,
    Path(raw_program): Path<String>,
) -> Response
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    match program_id(&raw_program) {
        Ok(program) => {
            let id = program.clone();
            let removed =
                match on_worker(&service, move |service| service.program_updated(&id)).await {
                    Ok(removed) => removed,
                    Err(response) => return response,
                };
            let payload = json!({
                "program_id": program.0,
                "removed": removed,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn flags_handler<S, P>(
    State(service): State<Arc<MatchingService<S, P>>>,
    Path(raw_student): Path<String>,
) -> Response
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    match student_id(&raw_student) {
        Ok(student) => {
            let enabled = service.enabled_variants(&student);
            let payload = json!({
                "student_id": student.0,
                "variants": enabled,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn clear_handler<S, P>(State(service): State<Arc<MatchingService<S, P>>>) -> Response
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    match on_worker(&service, |service| service.clear_cache()).await {
        Ok(removed) => (StatusCode::OK, axum::Json(json!({ "removed": removed }))).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn stats_handler<S, P>(State(service): State<Arc<MatchingService<S, P>>>) -> Response
where
    S: StudentRepository + 'static,
    P: ProgramRepository + 'static,
{
    match on_worker(&service, |service| service.cache_stats()).await {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(response) => response,
    }
}
