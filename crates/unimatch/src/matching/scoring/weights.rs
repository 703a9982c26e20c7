use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub(crate) const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Named weighting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMode {
    #[default]
    Balanced,
    AcademicFocused,
    LocationFocused,
    FieldFocused,
}

impl MatchMode {
    pub const ALL: [MatchMode; 4] = [
        MatchMode::Balanced,
        MatchMode::AcademicFocused,
        MatchMode::LocationFocused,
        MatchMode::FieldFocused,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            MatchMode::Balanced => "BALANCED",
            MatchMode::AcademicFocused => "ACADEMIC_FOCUSED",
            MatchMode::LocationFocused => "LOCATION_FOCUSED",
            MatchMode::FieldFocused => "FIELD_FOCUSED",
        }
    }

    pub const fn default_weights(self) -> MatchWeights {
        match self {
            MatchMode::Balanced => MatchWeights::new(0.60, 0.15, 0.25),
            MatchMode::AcademicFocused => MatchWeights::new(0.80, 0.10, 0.10),
            MatchMode::LocationFocused => MatchWeights::new(0.35, 0.45, 0.20),
            MatchMode::FieldFocused => MatchWeights::new(0.35, 0.15, 0.50),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MatchMode {
    type Err = WeightError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase().replace('-', "_");
        MatchMode::ALL
            .into_iter()
            .find(|mode| mode.label() == normalized)
            .ok_or_else(|| WeightError::UnknownMode(raw.to_string()))
    }
}

/// Weight triple for (academic, location, field) fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub academic: f64,
    pub location: f64,
    pub field: f64,
}

impl MatchWeights {
    pub const fn new(academic: f64, location: f64, field: f64) -> Self {
        Self {
            academic,
            location,
            field,
        }
    }

    pub fn sum(&self) -> f64 {
        self.academic + self.location + self.field
    }

    pub fn validate(&self) -> Result<Self, WeightError> {
        let parts = [self.academic, self.location, self.field];
        if parts.iter().any(|weight| !weight.is_finite()) {
            return Err(WeightError::NonFinite);
        }
        if parts.iter().any(|weight| *weight < 0.0) {
            return Err(WeightError::Negative);
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightError::SumMismatch { sum });
        }
        Ok(*self)
    }

    /// Short deterministic string that keeps cache entries of different weightings apart.
    ///
    /// Uses the shortest round-trip form of each weight, so two triples share a key only when
    /// they are bit-for-bit equal.
    pub fn cache_hash(&self) -> String {
        format!("{}-{}-{}", self.academic, self.location, self.field)
    }
}

impl FromStr for MatchWeights {
    type Err = WeightError;

    /// Parses `academic/location/field`, e.g. `0.6/0.15/0.25`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts = raw
            .split('/')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| WeightError::Malformed(raw.to_string()))?;
        match parts.as_slice() {
            [academic, location, field] => {
                MatchWeights::new(*academic, *location, *field).validate()
            }
            _ => Err(WeightError::Malformed(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("weights must be finite numbers")]
    NonFinite,
    #[error("weights must not be negative")]
    Negative,
    #[error("weights must sum to 1.0 (found {sum:.6})")]
    SumMismatch { sum: f64 },
    #[error("unknown match mode '{0}'")]
    UnknownMode(String),
    #[error("weight definition '{0}' must look like MODE=academic/location/field")]
    Malformed(String),
}

/// Lookup table from mode to validated weights.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    entries: BTreeMap<MatchMode, MatchWeights>,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            entries: MatchMode::ALL
                .into_iter()
                .map(|mode| (mode, mode.default_weights()))
                .collect(),
        }
    }
}

impl WeightTable {
    pub fn with_override(mut self, mode: MatchMode, weights: MatchWeights) -> Result<Self, WeightError> {
        self.entries.insert(mode, weights.validate()?);
        Ok(self)
    }

    /// Apply `MODE=a/l/f;MODE=a/l/f` overrides on top of the defaults.
    pub fn parse_overrides(raw: &str) -> Result<Self, WeightError> {
        let mut table = Self::default();
        for entry in raw.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (mode, weights) = entry
                .split_once('=')
                .ok_or_else(|| WeightError::Malformed(entry.to_string()))?;
            table = table.with_override(mode.parse()?, weights.parse()?)?;
        }
        Ok(table)
    }

    pub fn weights_for(&self, mode: MatchMode) -> MatchWeights {
        self.entries
            .get(&mode)
            .copied()
            .unwrap_or_else(|| mode.default_weights())
    }

    pub fn iter(&self) -> impl Iterator<Item = (MatchMode, MatchWeights)> + '_ {
        self.entries.iter().map(|(mode, weights)| (*mode, *weights))
    }
}
