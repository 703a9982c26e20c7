use crate::infra::{
    demo_programs, demo_student, InMemoryProgramRepository, InMemoryStudentRepository,
};
use chrono::Local;
use clap::Args;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use unimatch::catalog::CatalogImporter;
use unimatch::error::AppError;
use unimatch::matching::{
    FeatureFlagConfig, FeatureFlagResolver, InMemoryCacheStore, MatchCache, MatchMode,
    MatchResult, MatchingService, StudentId, WeightTable,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Program catalog CSV to rank instead of the built-in sample catalog.
    #[arg(long)]
    pub(crate) catalog_csv: Option<PathBuf>,
    /// Weighting mode: balanced, academic-focused, location-focused or field-focused.
    #[arg(long, default_value = "balanced", value_parser = parse_mode)]
    pub(crate) mode: MatchMode,
    /// Predicted IB points for the demo student.
    #[arg(long, default_value_t = 38, value_parser = clap::value_parser!(i32).range(0..=45))]
    pub(crate) points: i32,
    /// Number of ranked programs to print.
    #[arg(long, default_value_t = 5)]
    pub(crate) limit: usize,
    /// Flag overrides such as `matching_v10_curve=on,matching_v10_confidence=50%`.
    #[arg(long, value_parser = parse_flags)]
    pub(crate) flags: Option<FeatureFlagConfig>,
}

fn parse_mode(raw: &str) -> Result<MatchMode, String> {
    raw.parse::<MatchMode>().map_err(|err| err.to_string())
}

fn parse_flags(raw: &str) -> Result<FeatureFlagConfig, String> {
    FeatureFlagConfig::parse(raw).map_err(|err| err.to_string())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        catalog_csv,
        mode,
        points,
        limit,
        flags,
    } = args;

    let programs = match &catalog_csv {
        Some(path) => CatalogImporter::from_path(path)?,
        None => demo_programs(),
    };
    let names: HashMap<String, String> = programs
        .iter()
        .map(|program| (program.id.clone(), program.name.clone()))
        .collect();

    let student = demo_student(points);
    let student_id = StudentId(student.id.clone());
    let service = MatchingService::new(
        Arc::new(InMemoryStudentRepository::with_students(vec![student])),
        Arc::new(InMemoryProgramRepository::with_programs(programs)),
        Arc::new(MatchCache::new(Arc::new(InMemoryCacheStore::new()))),
        FeatureFlagResolver::new(flags.unwrap_or_default()),
        WeightTable::default(),
    );

    let warm = service.warm_catalog();
    let matches = service.match_catalog(&student_id, mode)?;

    println!("Program match demo ({})", Local::now().format("%Y-%m-%d %H:%M"));
    println!(
        "- student {} | {} predicted points | mode {}",
        student_id.0, points, mode
    );
    match warm {
        Ok(report) => println!(
            "- catalog: {} programs scored, {} skipped as invalid",
            report.programs, report.skipped
        ),
        Err(err) => println!("- catalog warm-up unavailable: {}", err),
    }
    let variants = service.enabled_variants(&student_id);
    if variants.is_empty() {
        println!("- algorithm: baseline");
    } else {
        println!("- algorithm variants: {}", variants.join(", "));
    }

    if matches.is_empty() {
        println!("\nNo programs to rank.");
        return Ok(());
    }

    println!("\nTop {} of {} programs", limit.min(matches.len()), matches.len());
    for (rank, result) in matches.iter().take(limit).enumerate() {
        let name = names
            .get(&result.program_id.0)
            .map(String::as_str)
            .unwrap_or("(unnamed program)");
        render_match(rank + 1, name, result);
    }

    // Second pass is served from the cache.
    service.match_catalog(&student_id, mode)?;
    let stats = service.cache_stats();
    println!(
        "\nCache: {} match keys | {} batch keys",
        stats.match_keys, stats.batch_keys
    );

    Ok(())
}

fn render_match(rank: usize, name: &str, result: &MatchResult) {
    let breakdown = &result.breakdown;
    println!(
        "{:>2}. {} [{}] -> {}",
        rank, name, result.program_id.0, result.overall_score
    );
    println!(
        "    academic {} | field {} | location {} | points {} | requirements {}",
        breakdown.academic,
        breakdown.field,
        breakdown.location,
        breakdown.points,
        breakdown.requirements
    );
    if let Some(confidence) = result.confidence {
        println!("    confidence: {:?}", confidence);
    }
    for check in &result.requirements {
        let marker = if check.met { "met" } else { "missing" };
        println!("    - {}: {}", marker, check.explanation);
    }
    for note in &result.adjustments {
        println!("    * {}", note);
    }
}
