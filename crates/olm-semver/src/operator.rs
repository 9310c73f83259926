//! Comparison operators for version ranges

use std::cmp::Ordering;
use std::fmt;

use crate::error::SemverError;

/// Comparison operators for version range comparators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal (==)
    Equal,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Not equal (!=)
    NotEqual,
}

impl Operator {
    /// Parse operator from string
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        match s {
            "" | "=" | "==" => Ok(Operator::Equal),
            "<" => Ok(Operator::LessThan),
            "<=" => Ok(Operator::LessThanOrEqual),
            ">" => Ok(Operator::GreaterThan),
            ">=" => Ok(Operator::GreaterThanOrEqual),
            "!=" => Ok(Operator::NotEqual),
            _ => Err(SemverError::InvalidOperator(s.to_string())),
        }
    }

    /// Split a leading operator off a comparator token, e.g. `">=1.0.0"`
    pub(crate) fn split_prefix(token: &str) -> (&str, &str) {
        let end = token
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '!'))
            .unwrap_or(token.len());
        (&token[..end], &token[end..])
    }

    /// Whether an ordering between a candidate and the comparator's version satisfies this operator
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::LessThan => ordering == Ordering::Less,
            Operator::LessThanOrEqual => ordering != Ordering::Greater,
            Operator::GreaterThan => ordering == Ordering::Greater,
            Operator::GreaterThanOrEqual => ordering != Ordering::Less,
            Operator::NotEqual => ordering != Ordering::Equal,
        }
    }

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::NotEqual => "!=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
