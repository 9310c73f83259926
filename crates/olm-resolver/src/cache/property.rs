//! Typed bundle properties and their JSON payloads

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

pub const PACKAGE_TYPE: &str = "olm.package";
pub const GVK_TYPE: &str = "olm.gvk";
pub const LABEL_TYPE: &str = "olm.label";
pub const PACKAGE_REQUIRED_TYPE: &str = "olm.package.required";
pub const GVK_REQUIRED_TYPE: &str = "olm.gvk.required";
pub const LABEL_REQUIRED_TYPE: &str = "olm.label.required";
pub const MAX_OPENSHIFT_VERSION_TYPE: &str = "olm.maxOpenShiftVersion";

/// A typed property attached to a bundle.
///
/// The value is the raw JSON text of the payload and is only interpreted
/// by whoever understands the type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(with = "raw_json")]
    pub value: String,
}

impl Property {
    pub fn new(property_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property_type: property_type.into(),
            value: value.into(),
        }
    }

    fn typed<T: Serialize>(property_type: &str, value: &T) -> Self {
        // Serializing plain structs of strings cannot fail
        let value = serde_json::to_string(value).unwrap_or_default();
        Self::new(property_type, value)
    }

    pub fn package(package_name: &str, version: &str) -> Self {
        Self::typed(
            PACKAGE_TYPE,
            &PackageValue {
                package_name: package_name.to_string(),
                version: version.to_string(),
            },
        )
    }

    pub fn gvk(group: &str, version: &str, kind: &str) -> Self {
        Self::typed(GVK_TYPE, &Gvk::new(group, version, kind))
    }

    pub fn label(label: &str) -> Self {
        Self::typed(LABEL_TYPE, &LabelValue::new(label))
    }

    pub fn package_required(package_name: &str, version_range: &str) -> Self {
        Self::typed(
            PACKAGE_REQUIRED_TYPE,
            &PackageRequired {
                package_name: package_name.to_string(),
                version_range: Some(version_range.to_string()),
            },
        )
    }

    pub fn gvk_required(group: &str, version: &str, kind: &str) -> Self {
        Self::typed(GVK_REQUIRED_TYPE, &Gvk::new(group, version, kind))
    }

    pub fn label_required(label: &str) -> Self {
        Self::typed(LABEL_REQUIRED_TYPE, &LabelValue::new(label))
    }

    /// A platform ceiling; the version is stored as a JSON string
    pub fn max_openshift_version(version: &str) -> Self {
        Self::typed(MAX_OPENSHIFT_VERSION_TYPE, &version)
    }

    pub fn is(&self, property_type: &str) -> bool {
        self.property_type == property_type
    }

    /// Decode the payload as `T`
    pub fn parse_value<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.value)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property_type, self.value)
    }
}

/// Keeps the payload as its raw JSON text, so that e.g. `4.10` is not
/// normalized to `4.1` on its way through.
mod raw_json {
    use super::*;

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = RawValue::from_string(value.to_string()).map_err(serde::ser::Error::custom)?;
        raw.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(raw.get().to_string())
    }
}

/// Payload of `olm.package`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageValue {
    pub package_name: String,
    pub version: String,
}

/// Payload of `olm.package.required`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRequired {
    pub package_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_range: Option<String>,
}

/// Payload of `olm.label` and `olm.label.required`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelValue {
    pub label: String,
}

impl LabelValue {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

/// An API group/version/kind, payload of `olm.gvk` and `olm.gvk.required`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}, Kind={}", self.group, self.version, self.kind)
    }
}
