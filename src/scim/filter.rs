//! SCIM filter expression parser.
//!
//! Deliberately minimal: the bridge recognizes exactly one clause shape,
//! `userName eq "<value>"`, which is what identity providers issue to probe
//! for an existing userName before provisioning. Anything more expressive is
//! rejected here so it never reaches the query layer.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Attribute a filter clause may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    UserName,
}

/// Comparison operator a filter clause may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
}

/// A parsed single-clause filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: FilterField,
    pub operator: FilterOperator,
    pub value: String,
}

/// Filter parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid filter expression")]
    InvalidFilter,

    #[error("unsupported filter field: {0}")]
    InvalidField(String),

    #[error("unsupported filter operator: {0}")]
    InvalidOperator(String),
}

fn clause_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // <field> <operator> "<value>" with optional whitespace between
        // tokens; the value may not contain quotes or whitespace.
        Regex::new(r#"^\s*(\S+)\s+(\w+)\s*"([^"\s]+)"\s*$"#).expect("clause regex is valid")
    })
}

/// Parse a SCIM filter expression into a list of predicates.
///
/// An empty expression means "no filter" and yields an empty list. A
/// non-empty expression must be a single supported clause; anything else is
/// a [`FilterError`].
pub fn parse_filter(expression: &str) -> Result<Vec<Filter>, FilterError> {
    if expression.is_empty() {
        return Ok(Vec::new());
    }

    let captures = clause_regex()
        .captures(expression)
        .ok_or(FilterError::InvalidFilter)?;

    let field = parse_field(&captures[1])?;
    let operator = parse_operator(&captures[2])?;

    Ok(vec![Filter {
        field,
        operator,
        value: captures[3].to_string(),
    }])
}

fn parse_field(field: &str) -> Result<FilterField, FilterError> {
    match field {
        "userName" => Ok(FilterField::UserName),
        other => Err(FilterError::InvalidField(other.to_string())),
    }
}

fn parse_operator(operator: &str) -> Result<FilterOperator, FilterError> {
    match operator.to_lowercase().as_str() {
        "eq" => Ok(FilterOperator::Eq),
        other => Err(FilterError::InvalidOperator(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_empty_expression_is_no_filter() {
        assert_eq!(parse_filter("").unwrap(), vec![]);
    }

    #[test]
    fn test_username_eq() {
        let filters = parse_filter(r#"userName eq "jdoe@example.com""#).unwrap();

        assert_eq!(
            filters,
            vec![Filter {
                field: FilterField::UserName,
                operator: FilterOperator::Eq,
                value: "jdoe@example.com".to_string(),
            }]
        );
    }

    #[test]
    fn test_operator_is_case_insensitive() {
        let filters = parse_filter(r#"userName EQ "a""#).unwrap();
        assert_eq!(filters[0].operator, FilterOperator::Eq);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let filters = parse_filter(r#"  userName   eq   "a"  "#).unwrap();
        assert_eq!(filters[0].value, "a");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert_eq!(
            parse_filter(r#"user eq "a""#),
            Err(FilterError::InvalidField("user".to_string()))
        );
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        assert_eq!(
            parse_filter(r#"userName foo "a""#),
            Err(FilterError::InvalidOperator("foo".to_string()))
        );
    }

    #[rstest]
    #[case("userName eq a")]
    #[case(r#"userName eq "a b""#)]
    #[case(r#"userName eq "a" and userName eq "b""#)]
    #[case("userName")]
    #[case(r#"eq "a""#)]
    fn test_malformed_expressions_are_rejected(#[case] expr: &str) {
        assert_eq!(parse_filter(expr), Err(FilterError::InvalidFilter), "{expr}");
    }
}
