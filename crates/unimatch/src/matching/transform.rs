use std::collections::HashSet;

use super::domain::{
    CompletedCourse, CourseLevel, CourseRequirement, PointsSource, ProgramId, ProgramRequirements,
    RawCourse, RawCourseRequirement, RawProgram, RawRequirementGroup, RawStudentProfile,
    RequirementGroup, StudentAcademicProfile, StudentId,
};

pub const MAX_IB_POINTS: i32 = 45;

/// Validation errors raised while flattening raw records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("identifier '{0}' is empty or contains reserved characters")]
    InvalidIdentifier(String),
    #[error("student {0} has not completed onboarding")]
    ProfileIncomplete(String),
    #[error("IB point total {0} is outside 0-45")]
    PointsOutOfRange(i32),
    #[error("course {course_id} has subject group {group}, expected 1-6")]
    InvalidSubjectGroup { course_id: String, group: i32 },
    #[error("unknown course level '{0}'")]
    UnknownLevel(String),
    #[error("unknown requirement operator '{0}'")]
    UnknownOperator(String),
    #[error("program {program_id} has a requirement without a course")]
    RequirementWithoutCourse { program_id: String },
}

/// Identifiers become cache-key segments, so glob metacharacters and separators are rejected.
pub fn validate_identifier(raw: &str) -> Result<String, TransformError> {
    let trimmed = raw.trim();
    let reserved = |c: char| matches!(c, ':' | '*' | '?' | '[' | ']') || c.is_whitespace();
    if trimmed.is_empty() || trimmed.chars().any(reserved) {
        return Err(TransformError::InvalidIdentifier(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn parse_level(raw: &str) -> Result<CourseLevel, TransformError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "HL" | "HIGHER" | "HIGHER_LEVEL" => Ok(CourseLevel::Higher),
        "SL" | "STANDARD" | "STANDARD_LEVEL" => Ok(CourseLevel::Standard),
        _ => Err(TransformError::UnknownLevel(raw.to_string())),
    }
}

fn validate_points(points: Option<i32>) -> Result<Option<u8>, TransformError> {
    match points {
        None => Ok(None),
        Some(value) if (0..=MAX_IB_POINTS).contains(&value) => Ok(Some(value as u8)),
        Some(value) => Err(TransformError::PointsOutOfRange(value)),
    }
}

fn subject_group_of(course: &RawCourse) -> Result<u8, TransformError> {
    // Courses without a joined subject group land in group 6 (the arts/elective slot).
    let group = course
        .subject_group
        .as_ref()
        .map(|group| group.number)
        .unwrap_or(6);
    if (1..=6).contains(&group) {
        Ok(group as u8)
    } else {
        Err(TransformError::InvalidSubjectGroup {
            course_id: course.id.clone(),
            group,
        })
    }
}

/// Orders ranked preferences, keeping input order for ties and dropping repeats.
fn ordered_preferences<I>(entries: I) -> Vec<String>
where
    I: Iterator<Item = (Option<u32>, Option<String>)>,
{
    let mut ranked: Vec<(u32, usize, String)> = entries
        .enumerate()
        .filter_map(|(position, (rank, value))| {
            value.map(|value| (rank.unwrap_or(u32::MAX), position, value))
        })
        .collect();
    ranked.sort();

    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .map(|(_, _, value)| value.trim().to_string())
        .filter(|value| !value.is_empty() && seen.insert(value.clone()))
        .collect()
}

/// Flatten a raw student record into the scorer's profile.
pub fn transform_student(raw: &RawStudentProfile) -> Result<StudentAcademicProfile, TransformError> {
    let student_id = validate_identifier(&raw.id)?;
    if !raw.onboarding_completed {
        return Err(TransformError::ProfileIncomplete(student_id));
    }

    let achieved = validate_points(raw.total_points)?;
    let predicted = validate_points(raw.predicted_points)?;
    let (points, points_source) = match (achieved, predicted) {
        (Some(points), _) => (Some(points), PointsSource::Achieved),
        (None, Some(points)) => (Some(points), PointsSource::Predicted),
        (None, None) => (None, PointsSource::Missing),
    };

    let mut courses = Vec::with_capacity(raw.courses.len());
    for entry in &raw.courses {
        let Some(course) = &entry.course else {
            continue;
        };
        courses.push(CompletedCourse {
            course_id: validate_identifier(&course.id)?,
            name: course.name.trim().to_string(),
            subject_group: subject_group_of(course)?,
            level: parse_level(&entry.level)?,
        });
    }

    let preferred_fields = ordered_preferences(raw.field_preferences.iter().map(|preference| {
        (
            preference.rank,
            preference.field.as_ref().map(|field| field.id.clone()),
        )
    }));
    let preferred_countries =
        ordered_preferences(raw.country_preferences.iter().map(|preference| {
            (
                preference.rank,
                preference
                    .country
                    .as_ref()
                    .map(|country| country.code.to_ascii_uppercase()),
            )
        }));

    Ok(StudentAcademicProfile {
        student_id: StudentId(student_id),
        points,
        points_source,
        courses,
        preferred_fields,
        preferred_countries,
    })
}

fn course_requirement(
    program_id: &str,
    raw: &RawCourseRequirement,
) -> Result<CourseRequirement, TransformError> {
    let course = raw
        .course
        .as_ref()
        .ok_or_else(|| TransformError::RequirementWithoutCourse {
            program_id: program_id.to_string(),
        })?;
    let min_level = match &raw.level {
        Some(level) => parse_level(level)?,
        None => CourseLevel::Standard,
    };

    Ok(CourseRequirement {
        course_id: validate_identifier(&course.id)?,
        name: course.name.trim().to_string(),
        min_level,
    })
}

fn requirement_group(
    program_id: &str,
    raw: &RawRequirementGroup,
) -> Result<Option<RequirementGroup>, TransformError> {
    let mut members = raw
        .requirements
        .iter()
        .map(|requirement| course_requirement(program_id, requirement))
        .collect::<Result<Vec<_>, _>>()?;

    let any = match raw.operator.as_deref().map(str::trim) {
        None | Some("") => false,
        Some(op) if op.eq_ignore_ascii_case("and") => false,
        Some(op) if op.eq_ignore_ascii_case("or") => true,
        Some(op) => return Err(TransformError::UnknownOperator(op.to_string())),
    };

    let group = match members.len() {
        0 => None,
        1 => members.pop().map(RequirementGroup::Single),
        _ if any => Some(RequirementGroup::Any(members)),
        _ => Some(RequirementGroup::All(members)),
    };
    Ok(group)
}

/// Flatten a raw program record into the scorer's requirement view.
pub fn transform_program(raw: &RawProgram) -> Result<ProgramRequirements, TransformError> {
    let program_id = validate_identifier(&raw.id)?;
    let min_points = validate_points(raw.min_ib_points)?;

    let mut ordered: Vec<(i32, usize, &RawRequirementGroup)> = raw
        .course_requirements
        .iter()
        .enumerate()
        .map(|(index, group)| (group.position.unwrap_or(i32::MAX), index, group))
        .collect();
    ordered.sort_by_key(|(position, index, _)| (*position, *index));

    let mut requirement_groups = Vec::with_capacity(ordered.len());
    for (_, _, group) in ordered {
        if let Some(group) = requirement_group(&program_id, group)? {
            requirement_groups.push(group);
        }
    }

    let field_id = raw
        .field_of_study
        .as_ref()
        .map(|field| field.id.trim().to_string())
        .filter(|id| !id.is_empty());
    let country_code = raw
        .university
        .as_ref()
        .and_then(|university| university.country.as_ref())
        .map(|country| country.code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty());

    Ok(ProgramRequirements {
        program_id: ProgramId(program_id),
        name: raw.name.trim().to_string(),
        min_points,
        field_id,
        country_code,
        requirement_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::domain::{
        RawCountry, RawCountryPreference, RawFieldOfStudy, RawFieldPreference, RawStudentCourse,
        RawSubjectGroup,
    };

    fn course(id: &str, group: i32) -> RawCourse {
        RawCourse {
            id: id.to_string(),
            name: id.to_uppercase(),
            subject_group: Some(RawSubjectGroup {
                number: group,
                name: format!("Group {group}"),
            }),
        }
    }

    fn onboarded(id: &str) -> RawStudentProfile {
        RawStudentProfile {
            id: id.to_string(),
            onboarding_completed: true,
            ..RawStudentProfile::default()
        }
    }

    #[test]
    fn achieved_points_take_priority_over_predicted() {
        let mut raw = onboarded("stu-1");
        raw.total_points = Some(36);
        raw.predicted_points = Some(40);

        let profile = transform_student(&raw).expect("valid profile");
        assert_eq!(profile.points, Some(36));
        assert_eq!(profile.points_source, PointsSource::Achieved);
    }

    #[test]
    fn missing_points_become_absent_sentinel() {
        let profile = transform_student(&onboarded("stu-2")).expect("valid profile");
        assert_eq!(profile.points, None);
        assert_eq!(profile.points_source, PointsSource::Missing);
        assert!(profile.courses.is_empty());
    }

    #[test]
    fn rejects_points_outside_ib_scale() {
        let mut raw = onboarded("stu-3");
        raw.predicted_points = Some(46);
        assert_eq!(
            transform_student(&raw),
            Err(TransformError::PointsOutOfRange(46))
        );
    }

    #[test]
    fn rejects_incomplete_onboarding() {
        let raw = RawStudentProfile {
            id: "stu-4".to_string(),
            ..RawStudentProfile::default()
        };
        assert!(matches!(
            transform_student(&raw),
            Err(TransformError::ProfileIncomplete(_))
        ));
    }

    #[test]
    fn rejects_identifiers_with_key_separators() {
        assert!(validate_identifier("stu:1").is_err());
        assert!(validate_identifier("stu*").is_err());
        assert!(validate_identifier("  ").is_err());
        assert_eq!(validate_identifier(" stu-1 ").as_deref(), Ok("stu-1"));
    }

    #[test]
    fn flattens_courses_and_skips_dangling_relations() {
        let mut raw = onboarded("stu-5");
        raw.courses = vec![
            RawStudentCourse {
                level: "hl".to_string(),
                course: Some(course("math", 5)),
            },
            RawStudentCourse {
                level: "SL".to_string(),
                course: None,
            },
        ];

        let profile = transform_student(&raw).expect("valid profile");
        assert_eq!(profile.courses.len(), 1);
        assert_eq!(profile.courses[0].level, CourseLevel::Higher);
        assert_eq!(profile.courses[0].subject_group, 5);
    }

    #[test]
    fn rejects_subject_group_outside_range() {
        let mut raw = onboarded("stu-6");
        raw.courses = vec![RawStudentCourse {
            level: "HL".to_string(),
            course: Some(course("math", 9)),
        }];
        assert!(matches!(
            transform_student(&raw),
            Err(TransformError::InvalidSubjectGroup { group: 9, .. })
        ));
    }

    #[test]
    fn preferences_follow_rank_and_drop_duplicates() {
        let mut raw = onboarded("stu-7");
        let field = |rank, id: &str| RawFieldPreference {
            rank,
            field: Some(RawFieldOfStudy {
                id: id.to_string(),
                name: id.to_string(),
            }),
        };
        raw.field_preferences = vec![
            field(Some(2), "medicine"),
            field(Some(1), "engineering"),
            field(None, "law"),
            field(Some(3), "engineering"),
        ];
        raw.country_preferences = vec![RawCountryPreference {
            rank: Some(1),
            country: Some(RawCountry {
                code: "nl".to_string(),
                name: "Netherlands".to_string(),
            }),
        }];

        let profile = transform_student(&raw).expect("valid profile");
        assert_eq!(profile.preferred_fields, vec!["engineering", "medicine", "law"]);
        assert_eq!(profile.preferred_countries, vec!["NL"]);
    }

    #[test]
    fn program_groups_are_ordered_and_collapsed() {
        let requirement = |id: &str| RawCourseRequirement {
            level: Some("HL".to_string()),
            course: Some(course(id, 4)),
        };
        let raw = RawProgram {
            id: "prog-1".to_string(),
            name: "Physics BSc".to_string(),
            min_ib_points: None,
            course_requirements: vec![
                RawRequirementGroup {
                    operator: Some("OR".to_string()),
                    position: Some(2),
                    requirements: vec![requirement("biology"), requirement("chemistry")],
                },
                RawRequirementGroup {
                    operator: None,
                    position: Some(1),
                    requirements: vec![requirement("math")],
                },
                RawRequirementGroup {
                    operator: Some("AND".to_string()),
                    position: Some(3),
                    requirements: Vec::new(),
                },
            ],
            ..RawProgram::default()
        };

        let program = transform_program(&raw).expect("valid program");
        assert_eq!(program.min_points, None);
        assert_eq!(program.requirement_groups.len(), 2);
        assert!(matches!(
            program.requirement_groups[0],
            RequirementGroup::Single(_)
        ));
        assert!(matches!(
            program.requirement_groups[1],
            RequirementGroup::Any(ref members) if members.len() == 2
        ));
    }

    #[test]
    fn program_rejects_unknown_operator_and_dangling_requirement() {
        let mut raw = RawProgram {
            id: "prog-2".to_string(),
            name: "Law".to_string(),
            course_requirements: vec![RawRequirementGroup {
                operator: Some("XOR".to_string()),
                position: None,
                requirements: vec![RawCourseRequirement {
                    level: None,
                    course: Some(course("history", 3)),
                }],
            }],
            ..RawProgram::default()
        };
        assert_eq!(
            transform_program(&raw),
            Err(TransformError::UnknownOperator("XOR".to_string()))
        );

        raw.course_requirements[0].operator = None;
        raw.course_requirements[0].requirements[0].course = None;
        assert!(matches!(
            transform_program(&raw),
            Err(TransformError::RequirementWithoutCourse { .. })
        ));
    }
}
