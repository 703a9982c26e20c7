use super::super::domain::{
    CourseRequirement, RequirementCheck, RequirementGroup, StudentAcademicProfile,
};

fn describe_all(requirements: &[CourseRequirement], joiner: &str) -> String {
    requirements
        .iter()
        .map(CourseRequirement::describe)
        .collect::<Vec<_>>()
        .join(joiner)
}

pub(crate) fn check_group(
    student: &StudentAcademicProfile,
    group: &RequirementGroup,
) -> RequirementCheck {
    let satisfied = |requirement: &CourseRequirement| {
        student.has_course(&requirement.course_id, requirement.min_level)
    };

    match group {
        RequirementGroup::Single(requirement) => {
            let met = satisfied(requirement);
            let explanation = if met {
                format!("{} completed", requirement.describe())
            } else {
                format!("missing {}", requirement.describe())
            };
            RequirementCheck { met, explanation }
        }
        RequirementGroup::All(requirements) => {
            let missing: Vec<&CourseRequirement> = requirements
                .iter()
                .filter(|requirement| !satisfied(requirement))
                .collect();
            if missing.is_empty() {
                RequirementCheck {
                    met: true,
                    explanation: format!("completed {}", describe_all(requirements, " and ")),
                }
            } else {
                let missing = missing
                    .iter()
                    .map(|requirement| requirement.describe())
                    .collect::<Vec<_>>()
                    .join(", ");
                RequirementCheck {
                    met: false,
                    explanation: format!(
                        "requires {}; missing {missing}",
                        describe_all(requirements, " AND ")
                    ),
                }
            }
        }
        RequirementGroup::Any(requirements) => match requirements.iter().find(|r| satisfied(r)) {
            Some(found) => RequirementCheck {
                met: true,
                explanation: format!(
                    "{} completed (one of {})",
                    found.describe(),
                    describe_all(requirements, " OR ")
                ),
            },
            None => RequirementCheck {
                met: false,
                explanation: format!(
                    "requires one of {}; none completed",
                    describe_all(requirements, " OR ")
                ),
            },
        },
    }
}

pub(crate) fn check_groups(
    student: &StudentAcademicProfile,
    groups: &[RequirementGroup],
) -> Vec<RequirementCheck> {
    groups.iter().map(|group| check_group(student, group)).collect()
}

/// Share of met groups; a program without groups is trivially satisfied.
pub(crate) fn satisfaction_ratio(checks: &[RequirementCheck]) -> f64 {
    if checks.is_empty() {
        return 1.0;
    }
    let met = checks.iter().filter(|check| check.met).count();
    met as f64 / checks.len() as f64
}
