use crate::matching::domain::{RawCourse, RawCourseRequirement, RawRequirementGroup};

/// Parses `HL:math AND HL:physics; HL:biology OR SL:chemistry(Chemistry)`.
///
/// Groups are separated by `;`. A group joins its terms with either `AND` or `OR`, never both.
/// A term is `LEVEL:course_id` with an optional display name in parentheses; the level label
/// is passed through unchanged and validated later by the program transformer.
pub(crate) fn parse_expression(expression: &str) -> Result<Vec<RawRequirementGroup>, String> {
    expression
        .split(';')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .enumerate()
        .map(|(position, group)| parse_group(group, position as i32))
        .collect()
}

fn parse_group(group: &str, position: i32) -> Result<RawRequirementGroup, String> {
    let tokens: Vec<&str> = group.split_whitespace().collect();
    let mut terms = Vec::new();
    let mut operator: Option<&'static str> = None;
    let mut expect_term = true;

    for token in tokens {
        if expect_term {
            terms.push(parse_term(token)?);
            expect_term = false;
            continue;
        }

        let joiner = if token.eq_ignore_ascii_case("and") {
            "AND"
        } else if token.eq_ignore_ascii_case("or") {
            "OR"
        } else {
            return Err(format!("expected AND or OR before '{token}'"));
        };
        match operator {
            Some(existing) if existing != joiner => {
                return Err(format!("group '{group}' mixes AND with OR"));
            }
            _ => operator = Some(joiner),
        }
        expect_term = true;
    }

    if expect_term {
        return Err(format!("group '{group}' ends without a course"));
    }

    Ok(RawRequirementGroup {
        operator: Some(operator.unwrap_or("AND").to_string()),
        position: Some(position),
        requirements: terms,
    })
}

fn parse_term(token: &str) -> Result<RawCourseRequirement, String> {
    let (level, rest) = token
        .split_once(':')
        .ok_or_else(|| format!("course '{token}' must look like LEVEL:course_id"))?;

    let (course_id, name) = match rest.split_once('(') {
        Some((id, name)) => {
            let name = name
                .strip_suffix(')')
                .ok_or_else(|| format!("course '{token}' has an unclosed name"))?;
            (id, name.replace('_', " "))
        }
        None => (rest, rest.to_string()),
    };
    if course_id.is_empty() || level.is_empty() {
        return Err(format!("course '{token}' is missing its level or id"));
    }

    Ok(RawCourseRequirement {
        level: Some(level.to_string()),
        course: Some(RawCourse {
            id: course_id.to_string(),
            name,
            subject_group: None,
        }),
    })
}
