use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const FLAG_V10_CURVE: &str = "matching_v10_curve";
pub const FLAG_V10_SELECTIVITY_BOOST: &str = "matching_v10_selectivity_boost";
pub const FLAG_V10_ANTI_GAMING: &str = "matching_v10_anti_gaming";
pub const FLAG_V10_CONFIDENCE: &str = "matching_v10_confidence";

/// Flags that switch the scorer onto a different algorithm variant.
pub const VARIANT_FLAGS: [&str; 4] = [
    FLAG_V10_CURVE,
    FLAG_V10_SELECTIVITY_BOOST,
    FLAG_V10_ANTI_GAMING,
    FLAG_V10_CONFIDENCE,
];

/// Activation rule for a single flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSetting {
    Off,
    On,
    Rollout(u8),
}

impl FromStr for FlagSetting {
    type Err = FlagParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim().to_ascii_lowercase();
        match value.as_str() {
            "on" | "true" | "1" | "enabled" => return Ok(Self::On),
            "off" | "false" | "0" | "disabled" => return Ok(Self::Off),
            _ => {}
        }

        let percentage = value
            .strip_suffix('%')
            .ok_or_else(|| FlagParseError::InvalidSetting(raw.to_string()))?
            .trim()
            .parse::<u8>()
            .map_err(|_| FlagParseError::InvalidSetting(raw.to_string()))?;
        if percentage > 100 {
            return Err(FlagParseError::PercentageOutOfRange(percentage));
        }
        Ok(Self::Rollout(percentage))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlagParseError {
    #[error("flag entry '{0}' must look like name=on|off|NN%")]
    MalformedEntry(String),
    #[error("flag setting '{0}' must be on, off, or a percentage")]
    InvalidSetting(String),
    #[error("rollout percentage {0} exceeds 100")]
    PercentageOutOfRange(u8),
}

/// Process-wide flag table, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlagConfig {
    flags: BTreeMap<String, FlagSetting>,
}

impl FeatureFlagConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, name: impl Into<String>, setting: FlagSetting) -> Self {
        self.flags.insert(name.into(), setting);
        self
    }

    pub fn setting(&self, name: &str) -> Option<FlagSetting> {
        self.flags.get(name).copied()
    }

    /// Parse `name=on,other=25%` style definitions.
    pub fn parse(raw: &str) -> Result<Self, FlagParseError> {
        let mut config = Self::default();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (name, setting) = entry
                .split_once('=')
                .ok_or_else(|| FlagParseError::MalformedEntry(entry.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(FlagParseError::MalformedEntry(entry.to_string()));
            }
            config.flags.insert(name.to_string(), setting.parse()?);
        }
        Ok(config)
    }
}

/// Inputs a flag verdict may depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    pub user_id: String,
}

impl EvaluationContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Per-evaluation switches for the scorer's variant refinements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchVariants {
    pub v10_curve: bool,
    pub selectivity_boost: bool,
    pub anti_gaming: bool,
    pub confidence: bool,
}

impl MatchVariants {
    pub fn all() -> Self {
        Self {
            v10_curve: true,
            selectivity_boost: true,
            anti_gaming: true,
            confidence: true,
        }
    }

    pub fn is_baseline(&self) -> bool {
        *self == Self::default()
    }

    /// Short stable tag appended to cache keys; empty for the baseline algorithm.
    pub fn signature(&self) -> String {
        let mut tag = String::new();
        for (enabled, code) in [
            (self.v10_curve, 'c'),
            (self.selectivity_boost, 's'),
            (self.anti_gaming, 'g'),
            (self.confidence, 'n'),
        ] {
            if enabled {
                tag.push(code);
            }
        }
        tag
    }
}

impl fmt::Display for MatchVariants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_baseline() {
            f.write_str("baseline")
        } else {
            write!(f, "v10[{}]", self.signature())
        }
    }
}

/// Stable bucket in `[0, 100)` for a (flag, user) pair.
pub fn rollout_bucket(flag: &str, user_id: &str) -> u8 {
    let digest = Sha256::digest(format!("{flag}:{user_id}").as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % 100) as u8
}

/// Pure resolver over the flag table; unknown flags resolve to disabled.
#[derive(Debug, Clone, Default)]
pub struct FeatureFlagResolver {
    config: Arc<FeatureFlagConfig>,
}

impl FeatureFlagResolver {
    pub fn new(config: FeatureFlagConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &FeatureFlagConfig {
        &self.config
    }

    pub fn is_enabled(&self, flag: &str, context: &EvaluationContext) -> bool {
        match self.config.setting(flag) {
            Some(FlagSetting::On) => true,
            Some(FlagSetting::Rollout(percentage)) => {
                rollout_bucket(flag, &context.user_id) < percentage
            }
            Some(FlagSetting::Off) | None => false,
        }
    }

    pub fn enabled_variants(&self, context: &EvaluationContext) -> Vec<&'static str> {
        VARIANT_FLAGS
            .iter()
            .copied()
            .filter(|flag| self.is_enabled(flag, context))
            .collect()
    }

    pub fn any_variant_enabled(&self, context: &EvaluationContext) -> bool {
        VARIANT_FLAGS
            .iter()
            .any(|flag| self.is_enabled(flag, context))
    }

    pub fn variants_for(&self, context: &EvaluationContext) -> MatchVariants {
        MatchVariants {
            v10_curve: self.is_enabled(FLAG_V10_CURVE, context),
            selectivity_boost: self.is_enabled(FLAG_V10_SELECTIVITY_BOOST, context),
            anti_gaming: self.is_enabled(FLAG_V10_ANTI_GAMING, context),
            confidence: self.is_enabled(FLAG_V10_CONFIDENCE, context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_flags_fail_closed() {
        let resolver = FeatureFlagResolver::default();
        assert!(!resolver.is_enabled("does_not_exist", &EvaluationContext::for_user("stu-1")));
        assert!(!resolver.any_variant_enabled(&EvaluationContext::for_user("stu-1")));
    }

    #[test]
    fn binary_flags_ignore_user() {
        let resolver = FeatureFlagResolver::new(
            FeatureFlagConfig::new()
                .with_flag(FLAG_V10_CURVE, FlagSetting::On)
                .with_flag(FLAG_V10_CONFIDENCE, FlagSetting::Off),
        );
        for user in ["a", "b", "c"] {
            let context = EvaluationContext::for_user(user);
            assert!(resolver.is_enabled(FLAG_V10_CURVE, &context));
            assert!(!resolver.is_enabled(FLAG_V10_CONFIDENCE, &context));
            assert_eq!(resolver.enabled_variants(&context), vec![FLAG_V10_CURVE]);
        }
    }

    #[test]
    fn rollout_bucketing_is_stable_per_user() {
        let resolver = FeatureFlagResolver::new(
            FeatureFlagConfig::new().with_flag(FLAG_V10_ANTI_GAMING, FlagSetting::Rollout(50)),
        );
        for index in 0..200 {
            let context = EvaluationContext::for_user(format!("stu-{index}"));
            let first = resolver.is_enabled(FLAG_V10_ANTI_GAMING, &context);
            for _ in 0..5 {
                assert_eq!(resolver.is_enabled(FLAG_V10_ANTI_GAMING, &context), first);
            }
        }
    }

    #[test]
    fn rollout_extremes_and_spread() {
        let zero = FeatureFlagResolver::new(
            FeatureFlagConfig::new().with_flag(FLAG_V10_CURVE, FlagSetting::Rollout(0)),
        );
        let full = FeatureFlagResolver::new(
            FeatureFlagConfig::new().with_flag(FLAG_V10_CURVE, FlagSetting::Rollout(100)),
        );
        let half = FeatureFlagResolver::new(
            FeatureFlagConfig::new().with_flag(FLAG_V10_CURVE, FlagSetting::Rollout(50)),
        );

        let mut enabled = 0;
        for index in 0..1000 {
            let context = EvaluationContext::for_user(format!("user-{index}"));
            assert!(!zero.is_enabled(FLAG_V10_CURVE, &context));
            assert!(full.is_enabled(FLAG_V10_CURVE, &context));
            if half.is_enabled(FLAG_V10_CURVE, &context) {
                enabled += 1;
            }
        }
        assert!((350..=650).contains(&enabled), "enabled {enabled} of 1000");
    }

    #[test]
    fn bucket_depends_on_flag_name() {
        let differs = (0..50).any(|index| {
            let user = format!("stu-{index}");
            rollout_bucket(FLAG_V10_CURVE, &user) != rollout_bucket(FLAG_V10_CONFIDENCE, &user)
        });
        assert!(differs);
        assert!(rollout_bucket(FLAG_V10_CURVE, "stu-1") < 100);
    }

    #[test]
    fn parses_flag_definitions() {
        let config =
            FeatureFlagConfig::parse("matching_v10_curve=on, matching_v10_confidence=25%,x=off")
                .expect("valid flags");
        assert_eq!(config.setting(FLAG_V10_CURVE), Some(FlagSetting::On));
        assert_eq!(
            config.setting(FLAG_V10_CONFIDENCE),
            Some(FlagSetting::Rollout(25))
        );
        assert_eq!(config.setting("x"), Some(FlagSetting::Off));

        assert_eq!(
            FeatureFlagConfig::parse("a=150%"),
            Err(FlagParseError::PercentageOutOfRange(150))
        );
        assert!(matches!(
            FeatureFlagConfig::parse("a"),
            Err(FlagParseError::MalformedEntry(_))
        ));
        assert!(FeatureFlagConfig::parse("").expect("empty is fine").setting("a").is_none());
    }

    #[test]
    fn variants_map_from_flags() {
        let resolver = FeatureFlagResolver::new(
            FeatureFlagConfig::new()
                .with_flag(FLAG_V10_SELECTIVITY_BOOST, FlagSetting::On)
                .with_flag(FLAG_V10_ANTI_GAMING, FlagSetting::On),
        );
        let variants = resolver.variants_for(&EvaluationContext::for_user("stu-9"));
        assert!(variants.selectivity_boost && variants.anti_gaming);
        assert!(!variants.v10_curve && !variants.confidence);
        assert_eq!(variants.signature(), "sg");
        assert_eq!(MatchVariants::default().signature(), "");
        assert_eq!(MatchVariants::default().to_string(), "baseline");
    }
}
