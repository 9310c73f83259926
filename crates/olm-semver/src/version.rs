//! Version parsing and precedence ordering

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::SemverError;

lazy_static! {
    static ref NUMERIC_RE: Regex = Regex::new(r"^[0-9]+$").unwrap();
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[0-9A-Za-z-]+$").unwrap();
}

/// A single dot-separated pre-release identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Prerelease {
    Numeric(u64),
    AlphaNumeric(String),
}

impl Prerelease {
    fn parse(s: &str) -> Result<Self, SemverError> {
        if !IDENTIFIER_RE.is_match(s) {
            return Err(SemverError::InvalidPrerelease(s.to_string()));
        }

        if NUMERIC_RE.is_match(s) {
            if s.len() > 1 && s.starts_with('0') {
                return Err(SemverError::PrereleaseLeadingZero(s.to_string()));
            }
            let n = s
                .parse::<u64>()
                .map_err(|_| SemverError::InvalidPrerelease(s.to_string()))?;
            return Ok(Prerelease::Numeric(n));
        }

        Ok(Prerelease::AlphaNumeric(s.to_string()))
    }
}

impl Ord for Prerelease {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Prerelease::Numeric(a), Prerelease::Numeric(b)) => a.cmp(b),
            // Numeric identifiers always have lower precedence than alphanumeric ones
            (Prerelease::Numeric(_), Prerelease::AlphaNumeric(_)) => Ordering::Less,
            (Prerelease::AlphaNumeric(_), Prerelease::Numeric(_)) => Ordering::Greater,
            (Prerelease::AlphaNumeric(a), Prerelease::AlphaNumeric(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Prerelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Prerelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prerelease::Numeric(n) => write!(f, "{}", n),
            Prerelease::AlphaNumeric(s) => write!(f, "{}", s),
        }
    }
}

/// A SemVer 2.0 version.
///
/// Equality is structural (build metadata included) so that two bundles that
/// only differ in build metadata stay distinguishable. Use [`Version::cmp_precedence`]
/// when build metadata must be ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<Prerelease>,
    pub build: Vec<String>,
}

impl Version {
    /// Create a release version with no pre-release or build metadata
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Vec::new(),
            build: Vec::new(),
        }
    }

    /// Parse a strict `MAJOR.MINOR.PATCH[-PRE][+BUILD]` version
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        if s.is_empty() {
            return Err(SemverError::Empty);
        }

        let (rest, build) = match s.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (s, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(SemverError::MissingComponents(s.to_string()));
        }

        let mut version = Version::new(
            parse_component("major", parts[0])?,
            parse_component("minor", parts[1])?,
            parse_component("patch", parts[2])?,
        );

        if let Some(pre) = pre {
            version.pre = pre
                .split('.')
                .map(Prerelease::parse)
                .collect::<Result<Vec<_>, _>>()?;
        }

        if let Some(build) = build {
            for id in build.split('.') {
                if !IDENTIFIER_RE.is_match(id) {
                    return Err(SemverError::InvalidBuild(build.to_string()));
                }
                version.build.push(id.to_string());
            }
        }

        Ok(version)
    }

    /// Parse a version leniently.
    ///
    /// Surrounding whitespace and a leading `v` are dropped, leading zeroes are
    /// stripped from numeric components and missing minor/patch components are
    /// padded with zero. A short version (fewer than three components) must not
    /// carry pre-release or build metadata.
    pub fn parse_tolerant(s: &str) -> Result<Self, SemverError> {
        let s = s.trim();
        let s = s
            .strip_prefix('v')
            .or_else(|| s.strip_prefix('V'))
            .unwrap_or(s);

        if s.is_empty() {
            return Err(SemverError::Empty);
        }

        let (core, meta) = match s.find(|c: char| c == '-' || c == '+') {
            Some(idx) => (&s[..idx], Some(&s[idx..])),
            None => (s, None),
        };

        let mut parts: Vec<&str> = core
            .split('.')
            .map(|part| {
                if NUMERIC_RE.is_match(part) {
                    let trimmed = part.trim_start_matches('0');
                    if trimmed.is_empty() {
                        "0"
                    } else {
                        trimmed
                    }
                } else {
                    part
                }
            })
            .collect();

        if parts.len() < 3 {
            if meta.is_some() {
                return Err(SemverError::ShortVersionMetadata);
            }
            while parts.len() < 3 {
                parts.push("0");
            }
        }

        let normalized = format!("{}{}", parts.join("."), meta.unwrap_or(""));
        Self::parse(&normalized)
    }

    /// Drop patch, pre-release and build metadata
    pub fn truncate_to_minor(&self) -> Self {
        Version::new(self.major, self.minor, 0)
    }

    /// True when the version is exactly `<major>.<minor>` (patch zero, no metadata)
    pub fn is_major_minor(&self) -> bool {
        self.patch == 0 && self.pre.is_empty() && self.build.is_empty()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Render only `<major>.<minor>`
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// Compare by SemVer precedence; build metadata is ignored
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                // A pre-release has lower precedence than the release itself
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

fn parse_component(component: &'static str, value: &str) -> Result<u64, SemverError> {
    if !NUMERIC_RE.is_match(value) {
        return Err(SemverError::InvalidNumber {
            component,
            value: value.to_string(),
        });
    }
    if value.len() > 1 && value.starts_with('0') {
        return Err(SemverError::LeadingZero {
            component,
            value: value.to_string(),
        });
    }
    value.parse::<u64>().map_err(|_| SemverError::InvalidNumber {
        component,
        value: value.to_string(),
    })
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_precedence(other)
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = SemverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            let pre: Vec<String> = self.pre.iter().map(|p| p.to_string()).collect();
            write!(f, "-{}", pre.join("."))?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build.join("."))?;
        }
        Ok(())
    }
}
