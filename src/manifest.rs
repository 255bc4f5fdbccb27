//! # Role Manifest Schema and Parsing
//!
//! This module defines the data structures backing `meta/main.yml`: the
//! regular Ansible Galaxy manifest plus the build attributes this tool adds
//! (`version`, `variables`, `include_when`, `prefix` and the README
//! complements).
//!
//! ## Key Components
//!
//! - **`Manifest`**: the whole document. Every field is optional at the
//!   schema level so that an incomplete manifest can still be read and linted;
//!   the typed accessors are where absence becomes a
//!   [`Error::MissingAttribute`](crate::error::Error::MissingAttribute).
//! - **`GalaxyInfo`** and **`Platform`**: the `galaxy_info` block.
//!
//! Keys the schema does not know about are kept in flattened `extra` maps, so
//! reading then writing a manifest never drops user content.
//!
//! ## Scalars
//!
//! YAML happily turns `version: 1.0` into a float and `versions: [7]` into an
//! integer. Version-like fields are therefore read through
//! [`scalar`] helpers which accept any scalar and keep its textual form.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::defaults::{INITIAL_LICENSE, INITIAL_VERSION};
use crate::error::{Error, Result};

/// A supported platform entry of `galaxy_info.platforms`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    /// Distribution name, e.g. `EL` or `Ubuntu`.
    pub name: String,
    /// Supported releases; `all` is customary when unrestricted.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "scalar::list"
    )]
    pub versions: Vec<String>,
}

/// The `galaxy_info` block of the manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalaxyInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar::optional"
    )]
    pub min_ansible_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<Platform>>,
    /// Any other galaxy key (tags, categories, ...), preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The role manifest, `meta/main.yml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar::optional"
    )]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub galaxy_info: Option<GalaxyInfo>,
    /// Variable name to human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, String>>,
    /// Role dependencies, either plain names or `{role: ...}` mappings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<Value>>,
    /// Task fragment filename to include condition.
    #[serde(
        default,
        alias = "inconditions",
        skip_serializing_if = "Option::is_none"
    )]
    pub include_when: Option<BTreeMap<String, String>>,
    /// Expected variable name prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Extra text for the README "Usage" section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_complement: Option<String>,
    /// Extra text for the README "Maintenance" section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_complement: Option<String>,
    /// Unknown top-level keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Manifest {
    /// The manifest written by `init`: version, license and empty maps, nothing else.
    pub fn initial() -> Self {
        Self {
            version: Some(INITIAL_VERSION.to_string()),
            galaxy_info: Some(GalaxyInfo {
                license: Some(INITIAL_LICENSE.to_string()),
                ..GalaxyInfo::default()
            }),
            variables: Some(BTreeMap::new()),
            dependencies: Some(Vec::new()),
            include_when: Some(BTreeMap::new()),
            ..Self::default()
        }
    }

    pub fn version(&self) -> Result<&str> {
        self.version.as_deref().ok_or_else(|| missing("version"))
    }

    pub fn galaxy_info(&self) -> Result<&GalaxyInfo> {
        self.galaxy_info
            .as_ref()
            .ok_or_else(|| missing("galaxy_info"))
    }

    pub fn author(&self) -> Result<&str> {
        self.galaxy_info()?
            .author
            .as_deref()
            .ok_or_else(|| missing("author"))
    }

    pub fn description(&self) -> Result<&str> {
        self.galaxy_info()?
            .description
            .as_deref()
            .ok_or_else(|| missing("description"))
    }

    pub fn license(&self) -> Result<&str> {
        self.galaxy_info()?
            .license
            .as_deref()
            .ok_or_else(|| missing("license"))
    }

    pub fn platforms(&self) -> Result<&[Platform]> {
        self.galaxy_info()?
            .platforms
            .as_deref()
            .ok_or_else(|| missing("platforms"))
    }

    /// Role identifiers this role depends on, in declaration order.
    ///
    /// Mapping entries are identified by their `role`, `name` or `src` key.
    pub fn dependency_ids(&self) -> Vec<String> {
        let Some(deps) = &self.dependencies else {
            return Vec::new();
        };
        deps.iter()
            .filter_map(|dep| match dep {
                Value::String(name) => Some(name.clone()),
                Value::Mapping(map) => ["role", "name", "src"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

fn missing(attribute: &str) -> Error {
    Error::MissingAttribute {
        attribute: attribute.to_string(),
    }
}

/// Parse manifest text; `path` is only used for error reporting.
pub fn parse(content: &str, path: &Path) -> Result<Manifest> {
    // An empty document is a valid, if useless, manifest.
    if content.trim().is_empty() || content.trim() == "---" {
        return Ok(Manifest::default());
    }
    serde_yaml::from_str(content).map_err(|e| Error::ManifestParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read the manifest at `path`.
pub fn from_file(path: &Path) -> Result<Manifest> {
    if !path.exists() {
        return Err(Error::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    parse(&content, path)
}

/// Render a manifest as a YAML document with an explicit start marker.
pub fn to_string(manifest: &Manifest) -> Result<String> {
    Ok(format!("---\n{}", serde_yaml::to_string(manifest)?))
}

/// Write the manifest to `path`, creating parent directories.
pub fn to_file(manifest: &Manifest, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    log::info!("writing {}", path.display());
    fs::write(path, to_string(manifest)?)?;
    Ok(())
}

/// Lenient deserializers keeping the textual form of YAML scalars.
mod scalar {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_yaml::Value;

    fn text<E: serde::de::Error>(value: Value) -> Result<String, E> {
        match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(E::custom(format!("expected a scalar, found {:?}", other))),
        }
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => text(value).map(Some),
        }
    }

    pub fn list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Vec::new()),
            Value::Sequence(items) => items.into_iter().map(text).collect(),
            scalar @ (Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
                Ok(vec![text(scalar)?])
            }
            other => Err(D::Error::custom(format!(
                "expected a list of versions, found {:?}",
                other
            ))),
        }
    }
}
