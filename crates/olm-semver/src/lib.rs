//! Semantic versioning for operator bundles
//!
//! This crate provides strict and tolerant SemVer 2.0 parsing, precedence
//! ordering, major.minor truncation for platform compatibility checks, and
//! the range syntax used by `olm.package.required` dependencies.

mod error;
mod operator;
mod range;
mod version;

pub use error::SemverError;
pub use operator::Operator;
pub use range::{Comparator, VersionRange};
pub use version::{Prerelease, Version};
