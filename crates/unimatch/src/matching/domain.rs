use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for student records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for academic programs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Student record as loaded from the relational store, relations included.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawStudentProfile {
    pub id: String,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub total_points: Option<i32>,
    #[serde(default)]
    pub predicted_points: Option<i32>,
    #[serde(default)]
    pub courses: Vec<RawStudentCourse>,
    #[serde(default)]
    pub field_preferences: Vec<RawFieldPreference>,
    #[serde(default)]
    pub country_preferences: Vec<RawCountryPreference>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Join row between a student and a course they have taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStudentCourse {
    pub level: String,
    #[serde(default)]
    pub course: Option<RawCourse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCourse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject_group: Option<RawSubjectGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSubjectGroup {
    pub number: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFieldPreference {
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub field: Option<RawFieldOfStudy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFieldOfStudy {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCountryPreference {
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub country: Option<RawCountry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCountry {
    pub code: String,
    pub name: String,
}

/// Program record as loaded from the relational store, relations included.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawProgram {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub min_ib_points: Option<i32>,
    #[serde(default)]
    pub field_of_study: Option<RawFieldOfStudy>,
    #[serde(default)]
    pub university: Option<RawUniversity>,
    #[serde(default)]
    pub course_requirements: Vec<RawRequirementGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUniversity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: Option<RawCountry>,
}

/// A requirement group row; `operator` is `AND` or `OR` and defaults to `AND`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRequirementGroup {
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub requirements: Vec<RawCourseRequirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCourseRequirement {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub course: Option<RawCourse>,
}

/// IB depth tier. Ordered so that `Higher` satisfies a `Standard` requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CourseLevel {
    Standard,
    Higher,
}

impl CourseLevel {
    pub const fn label(self) -> &'static str {
        match self {
            CourseLevel::Standard => "SL",
            CourseLevel::Higher => "HL",
        }
    }
}

/// Where the student's point total came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsSource {
    Achieved,
    Predicted,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCourse {
    pub course_id: String,
    pub name: String,
    pub subject_group: u8,
    pub level: CourseLevel,
}

/// Flattened student view consumed by the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAcademicProfile {
    pub student_id: StudentId,
    pub points: Option<u8>,
    pub points_source: PointsSource,
    pub courses: Vec<CompletedCourse>,
    pub preferred_fields: Vec<String>,
    pub preferred_countries: Vec<String>,
}

impl StudentAcademicProfile {
    pub fn higher_level_count(&self) -> usize {
        self.courses
            .iter()
            .filter(|course| course.level == CourseLevel::Higher)
            .count()
    }

    pub fn has_course(&self, course_id: &str, min_level: CourseLevel) -> bool {
        self.courses
            .iter()
            .any(|course| course.course_id == course_id && course.level >= min_level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRequirement {
    pub course_id: String,
    pub name: String,
    pub min_level: CourseLevel,
}

impl CourseRequirement {
    pub fn describe(&self) -> String {
        format!("{} {}", self.min_level.label(), self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "courses", rename_all = "snake_case")]
pub enum RequirementGroup {
    Single(CourseRequirement),
    All(Vec<CourseRequirement>),
    Any(Vec<CourseRequirement>),
}

/// Flattened program view consumed by the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRequirements {
    pub program_id: ProgramId,
    pub name: String,
    pub min_points: Option<u8>,
    pub field_id: Option<String>,
    pub country_code: Option<String>,
    pub requirement_groups: Vec<RequirementGroup>,
}

/// Outcome of checking one requirement group against the student's courses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCheck {
    pub met: bool,
    pub explanation: String,
}

/// Integer sub-scores on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub academic: u8,
    pub field: u8,
    pub location: u8,
    pub points: u8,
    pub requirements: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
}

/// Scored fit between one student and one program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub program_id: ProgramId,
    pub overall_score: u8,
    pub breakdown: ScoreBreakdown,
    pub requirements_met: bool,
    pub requirements: Vec<RequirementCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<MatchConfidence>,
}
