//! Version ranges combining comparators with AND (whitespace) and OR (`||`)

use std::fmt;
use std::str::FromStr;

use crate::error::SemverError;
use crate::operator::Operator;
use crate::version::Version;

/// A single `<op><version>` test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub operator: Operator,
    pub version: Version,
}

impl Comparator {
    pub fn new(operator: Operator, version: Version) -> Self {
        Self { operator, version }
    }

    /// Check a version against this comparator, ignoring build metadata
    pub fn matches(&self, version: &Version) -> bool {
        self.operator.accepts(version.cmp_precedence(&self.version))
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

/// A version range such as `>=1.0.0 <2.0.0 || 3.x`.
///
/// Each `||`-separated alternative is a conjunction of comparators; the range
/// matches when any alternative matches. An alternative with no comparators
/// (e.g. `*`) matches every version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<Vec<Comparator>>,
}

impl VersionRange {
    /// A range matching every version
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            alternatives: vec![Vec::new()],
        }
    }

    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(invalid(s, "empty range"));
        }

        let mut alternatives = Vec::new();
        for alternative in raw.split("||") {
            let alternative = alternative.trim();
            if alternative.is_empty() {
                return Err(invalid(raw, "empty alternative"));
            }

            let mut comparators = Vec::new();
            let mut tokens = alternative.split_whitespace();
            while let Some(token) = tokens.next() {
                let (op, version) = Operator::split_prefix(token);
                // Allow a space between the operator and the version (">= 1.0.0")
                let version = if version.is_empty() {
                    tokens
                        .next()
                        .ok_or_else(|| invalid(raw, "missing version after operator"))?
                } else {
                    version
                };
                let operator = Operator::parse(op).map_err(|e| invalid(raw, &e.to_string()))?;
                comparators.extend(expand(raw, operator, version)?);
            }
            alternatives.push(comparators);
        }

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|set| set.iter().all(|c| c.matches(version)))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn alternatives(&self) -> &[Vec<Comparator>] {
        &self.alternatives
    }
}

fn invalid(range: &str, reason: &str) -> SemverError {
    SemverError::InvalidRange {
        range: range.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a comparator token, turning `x`/`*` wildcards into explicit bounds
fn expand(raw: &str, operator: Operator, version: &str) -> Result<Vec<Comparator>, SemverError> {
    let trimmed = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);
    let parts: Vec<&str> = trimmed.split('.').collect();
    let is_wildcard = |p: &&str| matches!(*p, "x" | "X" | "*");

    let Some(idx) = parts.iter().position(is_wildcard) else {
        let version = Version::parse_tolerant(version).map_err(|e| invalid(raw, &e.to_string()))?;
        return Ok(vec![Comparator::new(operator, version)]);
    };

    if !parts[idx..].iter().all(is_wildcard) || parts.len() > 3 {
        return Err(invalid(raw, "wildcards must only appear in trailing positions"));
    }

    if idx == 0 {
        return match operator {
            Operator::Equal | Operator::GreaterThanOrEqual | Operator::LessThanOrEqual => {
                Ok(Vec::new())
            }
            _ => Err(invalid(raw, "unsupported operator for a full wildcard")),
        };
    }

    let mut prefix = Vec::with_capacity(idx);
    for part in &parts[..idx] {
        let n = part
            .parse::<u64>()
            .map_err(|_| invalid(raw, &format!("invalid wildcard component \"{}\"", part)))?;
        prefix.push(n);
    }

    let lower = Version::new(prefix[0], prefix.get(1).copied().unwrap_or(0), 0);
    let upper = if idx == 1 {
        Version::new(prefix[0] + 1, 0, 0)
    } else {
        Version::new(prefix[0], prefix[1] + 1, 0)
    };

    Ok(match operator {
        Operator::Equal => vec![
            Comparator::new(Operator::GreaterThanOrEqual, lower),
            Comparator::new(Operator::LessThan, upper),
        ],
        Operator::GreaterThanOrEqual => vec![Comparator::new(Operator::GreaterThanOrEqual, lower)],
        Operator::GreaterThan => vec![Comparator::new(Operator::GreaterThanOrEqual, upper)],
        Operator::LessThan => vec![Comparator::new(Operator::LessThan, lower)],
        Operator::LessThanOrEqual => vec![Comparator::new(Operator::LessThan, upper)],
        Operator::NotEqual => return Err(invalid(raw, "wildcards cannot be negated")),
    })
}

impl FromStr for VersionRange {
    type Err = SemverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_conjunction() {
        let range = VersionRange::parse(">=1.0.0 <2.0.0").unwrap();
        assert!(range.matches(&v("1.0.0")));
        assert!(range.matches(&v("1.9.9")));
        assert!(!range.matches(&v("2.0.0")));
        assert!(!range.matches(&v("0.9.0")));
    }

    #[test]
    fn test_disjunction() {
        let range = VersionRange::parse("<1.0.0 || >=3.0.0").unwrap();
        assert!(range.matches(&v("0.1.0")));
        assert!(!range.matches(&v("2.0.0")));
        assert!(range.matches(&v("3.1.0")));
    }

    #[test]
    fn test_operator_with_space() {
        let range = VersionRange::parse(">= 1.2").unwrap();
        assert!(range.matches(&v("1.2.0")));
        assert!(!range.matches(&v("1.1.9")));
    }

    #[test]
    fn test_plain_version_is_equality() {
        let range = VersionRange::parse("1.2.3").unwrap();
        assert!(range.matches(&v("1.2.3")));
        assert!(range.matches(&v("1.2.3+build")));
        assert!(!range.matches(&v("1.2.4")));
    }

    #[test]
    fn test_wildcards() {
        let range = VersionRange::parse("1.x").unwrap();
        assert!(range.matches(&v("1.0.0")));
        assert!(range.matches(&v("1.99.0")));
        assert!(!range.matches(&v("2.0.0")));

        let range = VersionRange::parse("1.2.*").unwrap();
        assert!(range.matches(&v("1.2.7")));
        assert!(!range.matches(&v("1.3.0")));

        let range = VersionRange::parse(">1.x").unwrap();
        assert!(!range.matches(&v("1.5.0")));
        assert!(range.matches(&v("2.0.0")));

        assert!(VersionRange::parse("*").unwrap().matches(&v("0.0.1")));
        assert!(VersionRange::any().matches(&v("9.9.9")));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(VersionRange::parse("").is_err());
        assert!(VersionRange::parse(">=").is_err());
        assert!(VersionRange::parse("1.x.2").is_err());
        assert!(VersionRange::parse("=>1.0.0").is_err());
        assert!(VersionRange::parse("!=1.x").is_err());
        assert!(VersionRange::parse("1.0.0 ||").is_err());
    }
}
