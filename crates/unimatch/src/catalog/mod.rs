//! CSV import of the program catalog into raw program records.

mod parser;
mod requirements;

use crate::matching::domain::{RawCountry, RawFieldOfStudy, RawProgram, RawUniversity};
use std::io::Read;
use std::path::Path;

use parser::NumberedRow;

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumn(&'static str),
    InvalidPoints { line: u64, value: String },
    InvalidRequirements { line: u64, reason: String },
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read program catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid program catalog CSV: {}", err),
            CatalogImportError::MissingColumn(column) => {
                write!(f, "program catalog is missing the '{}' column", column)
            }
            CatalogImportError::InvalidPoints { line, value } => write!(
                f,
                "line {}: min_ib_points '{}' is not a whole number",
                line, value
            ),
            CatalogImportError::InvalidRequirements { line, reason } => {
                write!(f, "line {}: invalid requirements: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::MissingColumn(_)
            | CatalogImportError::InvalidPoints { .. }
            | CatalogImportError::InvalidRequirements { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads a program catalog export. Structural problems fail the import; value-level
/// validation (ids, point ranges, level labels) is left to `transform_program`.
pub struct CatalogImporter;

impl CatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawProgram>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RawProgram>, CatalogImportError> {
        parser::parse_rows(reader)?
            .into_iter()
            .map(into_program)
            .collect()
    }
}

fn slug(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_lowercase()
}

fn into_program(numbered: NumberedRow) -> Result<RawProgram, CatalogImportError> {
    let NumberedRow { line, row } = numbered;

    let min_ib_points = row
        .min_ib_points
        .map(|value| {
            value
                .parse::<i32>()
                .map_err(|_| CatalogImportError::InvalidPoints { line, value })
        })
        .transpose()?;

    let course_requirements = match row.requirements.as_deref() {
        Some(expression) => requirements::parse_expression(expression)
            .map_err(|reason| CatalogImportError::InvalidRequirements { line, reason })?,
        None => Vec::new(),
    };

    let country = row.country_code.map(|code| RawCountry {
        name: code.clone(),
        code,
    });
    let university = match row.university {
        Some(name) => Some(RawUniversity {
            id: slug(&name),
            name,
            country,
        }),
        None => country.map(|country| RawUniversity {
            id: format!("unlisted-{}", country.code.to_ascii_lowercase()),
            name: String::new(),
            country: Some(country),
        }),
    };

    Ok(RawProgram {
        id: row.program_id,
        name: row.name,
        min_ib_points,
        field_of_study: row.field_id.map(|id| RawFieldOfStudy {
            name: id.clone(),
            id,
        }),
        university,
        course_requirements,
    })
}
