use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::CatalogImportError;

pub(crate) const REQUIRED_COLUMNS: [&str; 7] = [
    "program_id",
    "name",
    "university",
    "country_code",
    "field_id",
    "min_ib_points",
    "requirements",
];

/// One catalog row with blank cells already collapsed to `None`.
#[derive(Debug, Deserialize)]
pub(crate) struct CatalogRow {
    pub(crate) program_id: String,
    pub(crate) name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) university: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) country_code: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) field_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) min_ib_points: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) requirements: Option<String>,
}

/// Row plus the 1-based source line, kept for error reporting.
#[derive(Debug)]
pub(crate) struct NumberedRow {
    pub(crate) line: u64,
    pub(crate) row: CatalogRow,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<NumberedRow>, CatalogImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .copied()
        .find(|column| !headers.iter().any(|header| header == *column))
    {
        return Err(CatalogImportError::MissingColumn(missing));
    }

    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<CatalogRow>() {
        let row = record?;
        let line = rows.len() as u64 + 2;
        rows.push(NumberedRow { line, row });
    }

    Ok(rows)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
