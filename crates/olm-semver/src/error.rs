use thiserror::Error;

/// Error type for version and range parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemverError {
    #[error("version string empty")]
    Empty,
    #[error("no major, minor and patch elements found in \"{0}\"")]
    MissingComponents(String),
    #[error("invalid character(s) found in {component} number \"{value}\"")]
    InvalidNumber { component: &'static str, value: String },
    #[error("{component} number must not contain leading zeroes \"{value}\"")]
    LeadingZero { component: &'static str, value: String },
    #[error("invalid character(s) found in pre-release identifier \"{0}\"")]
    InvalidPrerelease(String),
    #[error("numeric pre-release identifier must not contain leading zeroes \"{0}\"")]
    PrereleaseLeadingZero(String),
    #[error("invalid character(s) found in build metadata \"{0}\"")]
    InvalidBuild(String),
    #[error("short version cannot contain pre-release/build metadata")]
    ShortVersionMetadata,
    #[error("invalid operator \"{0}\"")]
    InvalidOperator(String),
    #[error("could not parse version range \"{range}\": {reason}")]
    InvalidRange { range: String, reason: String },
}
