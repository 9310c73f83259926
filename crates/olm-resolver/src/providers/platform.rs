//! Gates bundles on the cluster's platform version

use std::sync::Arc;

use olm_semver::Version;

use super::cluster::ClusterProperties;
use super::{ConstraintProvider, ProviderError, ProviderKind};
use crate::cache::property::MAX_OPENSHIFT_VERSION_TYPE;
use crate::cache::Entry;
use crate::solver::Constraint;

/// Prohibits bundles whose `olm.maxOpenShiftVersion` is below the cluster's
/// major.minor version, and bundles whose property is malformed.
pub struct PlatformVersionProvider {
    cluster: Option<Arc<dyn ClusterProperties>>,
}

impl PlatformVersionProvider {
    pub fn new(cluster: Option<Arc<dyn ClusterProperties>>) -> Self {
        Self { cluster }
    }
}

impl std::fmt::Debug for PlatformVersionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformVersionProvider")
            .field("cluster", &self.cluster.is_some())
            .finish()
    }
}

/// Read the declared maximum platform version.
///
/// `Ok(None)` when the entry declares none; `Err` holds the reason the
/// declaration is unusable.
fn max_openshift_version(entry: &Entry) -> Result<Option<Version>, String> {
    let mut declared = entry.properties_of_type(MAX_OPENSHIFT_VERSION_TYPE);
    let Some(property) = declared.next() else {
        return Ok(None);
    };
    if declared.next().is_some() {
        return Err(format!(
            "defining more than one {:?} property is not allowed",
            MAX_OPENSHIFT_VERSION_TYPE
        ));
    }

    let value = property.value.trim().trim_matches('"');
    if value.is_empty() {
        return Err("value cannot be \"\" (an empty string)".to_string());
    }

    let version = Version::parse_tolerant(value)
        .map_err(|e| format!("failed to parse {:?} as semver: {}", value, e))?;

    if !version.is_major_minor() {
        return Err(format!(
            "property {:?} must specify only <major>.<minor> version, got invalid value {}",
            MAX_OPENSHIFT_VERSION_TYPE, version
        ));
    }

    Ok(Some(version))
}

impl ConstraintProvider for PlatformVersionProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::PlatformVersion
    }

    fn constraints(&self, entry: &Entry) -> Result<Vec<Constraint>, ProviderError> {
        let cluster = self
            .cluster
            .as_ref()
            .ok_or(ProviderError::MissingClusterProperties)?;

        let max = match max_openshift_version(entry) {
            Ok(Some(max)) => max,
            Ok(None) => return Ok(Vec::new()),
            Err(reason) => {
                log::debug!("{} has an invalid platform ceiling: {}", entry.name, reason);
                return Ok(vec![Constraint::prohibited().with_explanation(format!(
                    "invalid {:?} property: {}",
                    MAX_OPENSHIFT_VERSION_TYPE, reason
                ))]);
            }
        };

        let cluster_version = cluster.version()?.truncate_to_minor();
        if max.cmp_precedence(&cluster_version).is_lt() {
            return Ok(vec![Constraint::prohibited().with_explanation(format!(
                "bundle incompatible with openshift cluster, {:?} < cluster version: ({} < {})",
                MAX_OPENSHIFT_VERSION_TYPE,
                max.major_minor(),
                cluster_version.major_minor()
            ))]);
        }

        Ok(Vec::new())
    }
}
