//! File-defined runtime constraints

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ConstraintProvider, ProviderError, ProviderKind};
use crate::cache::property::{
    LabelValue, PackageRequired, Property, LABEL_REQUIRED_TYPE, LABEL_TYPE, PACKAGE_REQUIRED_TYPE,
    PACKAGE_TYPE,
};
use crate::cache::{Entry, Predicate};
use crate::solver::Constraint;

#[derive(Debug, Error)]
pub enum RuntimeConstraintsError {
    #[error("failed to read runtime constraints file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse runtime constraints file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {property_type} runtime constraint: {source}")]
    InvalidProperty {
        property_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The runtime constraints document: `{"properties": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertiesFile {
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// Excludes entries matching a static, file-defined policy.
///
/// Each package or label property in the file becomes one exclusion
/// predicate; entries matching any of them are prohibited.
#[derive(Debug, Default)]
pub struct RuntimeConstraintsProvider {
    path: Option<PathBuf>,
    exclusions: Vec<Predicate>,
    load_error: Option<RuntimeConstraintsError>,
}

impl RuntimeConstraintsProvider {
    /// A provider that contributes nothing
    pub fn inert() -> Self {
        Self::default()
    }

    /// Load the policy, failing on any read or parse error
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeConstraintsError> {
        let path = path.as_ref();
        let exclusions = read_exclusions(path)?;
        log::info!(
            "loaded {} runtime constraint(s) from {}",
            exclusions.len(),
            path.display()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            exclusions,
            load_error: None,
        })
    }

    /// Load the policy, degrading to no exclusions when the file is unusable.
    ///
    /// The failure is logged as a warning and kept for [`Self::load_error`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(provider) => provider,
            Err(e) => {
                log::warn!("ignoring runtime constraints: {}", e);
                Self {
                    path: Some(path.to_path_buf()),
                    exclusions: Vec::new(),
                    load_error: Some(e),
                }
            }
        }
    }

    pub fn exclusions(&self) -> &[Predicate] {
        &self.exclusions
    }

    /// The error that made the policy fall back to no exclusions
    pub fn load_error(&self) -> Option<&RuntimeConstraintsError> {
        self.load_error.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_inert(&self) -> bool {
        self.exclusions.is_empty()
    }
}

fn read_exclusions(path: &Path) -> Result<Vec<Predicate>, RuntimeConstraintsError> {
    let content = fs::read(path).map_err(|source| RuntimeConstraintsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: PropertiesFile =
        serde_json::from_slice(&content).map_err(|source| RuntimeConstraintsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut exclusions = Vec::new();
    for property in &file.properties {
        let invalid = |source: serde_json::Error| RuntimeConstraintsError::InvalidProperty {
            property_type: property.property_type.clone(),
            source,
        };

        match property.property_type.as_str() {
            PACKAGE_TYPE | PACKAGE_REQUIRED_TYPE => {
                let dependency: PackageRequired = property.parse_value().map_err(invalid)?;
                exclusions.push(Predicate::Package(dependency.package_name));
            }
            LABEL_TYPE | LABEL_REQUIRED_TYPE => {
                let dependency: LabelValue = property.parse_value().map_err(invalid)?;
                exclusions.push(Predicate::Label(dependency.label));
            }
            other => log::debug!("ignoring runtime constraint of unknown type {}", other),
        }
    }

    Ok(exclusions)
}

impl ConstraintProvider for RuntimeConstraintsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RuntimeConstraints
    }

    fn constraints(&self, entry: &Entry) -> Result<Vec<Constraint>, ProviderError> {
        Ok(self
            .exclusions
            .iter()
            .find(|p| p.test(entry))
            .map(|p| {
                Constraint::prohibited()
                    .with_explanation(format!("excluded by runtime constraint: {}", p))
            })
            .into_iter()
            .collect())
    }
}
