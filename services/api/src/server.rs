use crate::cli::ServeArgs;
use crate::infra::{
    build_match_cache, demo_programs, demo_student, AppState, InMemoryProgramRepository,
    InMemoryStudentRepository,
};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use unimatch::catalog::CatalogImporter;
use unimatch::config::AppConfig;
use unimatch::error::AppError;
use unimatch::matching::{FeatureFlagResolver, MatchingService};
use unimatch::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let programs = match &config.matching.catalog_csv {
        Some(path) => {
            let programs = CatalogImporter::from_path(path)?;
            info!(path = %path.display(), programs = programs.len(), "program catalog imported");
            programs
        }
        None => demo_programs(),
    };
    let students = InMemoryStudentRepository::with_students(vec![demo_student(37)]);
    let cache = Arc::new(build_match_cache(&config.cache));
    let matching_service = Arc::new(MatchingService::new(
        Arc::new(students),
        Arc::new(InMemoryProgramRepository::with_programs(programs)),
        cache,
        FeatureFlagResolver::new(config.matching.flags.clone()),
        config.matching.weights.clone(),
    ));

    match matching_service.warm_catalog() {
        Ok(report) => info!(
            programs = report.programs,
            skipped = report.skipped,
            "match catalog warmed"
        ),
        Err(error) => warn!(%error, "match catalog warm-up failed, continuing cold"),
    }

    let app = with_matching_routes(matching_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "unimatch matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
