//! # Role Entity Model
//!
//! A [`Role`] is identified by its directory. Every attribute is derived from
//! the files under that directory at the moment it is asked for: nothing is
//! cached, because phases running earlier in the same invocation (or the
//! user, between invocations) may have rewritten those files.
//!
//! Accessors for required manifest fields fail with
//! [`Error::MissingAttribute`] rather than defaulting.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::defaults::{DEFAULTS_PATH, MAINTASK_PATH, MANIFEST_PATH, TASKS_DIR, VARS_PATH};
use crate::error::{Error, Result};
use crate::manifest::{self, Manifest, Platform};

/// Where a variable entry comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// `defaults/main.yml`: overridable by role users.
    Default,
    /// `vars/main.yml`: internal to the role.
    Constant,
    /// Only described in the manifest, no value anywhere.
    Declared,
}

/// One entry of the role variable catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub value: Option<Value>,
    pub description: Option<String>,
    pub kind: VariableKind,
}

impl Variable {
    pub fn is_constant(&self) -> bool {
        self.kind == VariableKind::Constant
    }

    /// Value rendered on one line, for documentation.
    pub fn value_text(&self) -> String {
        match &self.value {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) => "null".to_string(),
            Some(other) => serde_yaml::to_string(other)
                .map(|s| s.trim_end().replace('\n', " "))
                .unwrap_or_default(),
        }
    }
}

/// Key marking a task entry as a conditional failure (the platform guard).
const FAIL_KEY: &str = "fail";

/// Keys marking a task entry as a fragment inclusion.
const INCLUDE_KEYS: &[&str] = &["include", "include_tasks", "import_tasks"];

/// An Ansible role rooted at a directory
#[derive(Debug, Clone)]
pub struct Role {
    root: PathBuf,
    name: String,
}

impl Role {
    /// Open the role rooted at `root`; the directory need not be populated yet.
    pub fn open(root: &Path) -> Result<Self> {
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Filesystem {
                message: format!("Cannot derive a role name from '{}'", root.display()),
            })?;
        Ok(Self { root, name })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Basename of the role directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of a role-relative path.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path(MANIFEST_PATH)
    }

    pub fn has_manifest(&self) -> bool {
        self.manifest_path().is_file()
    }

    pub fn manifest(&self) -> Result<Manifest> {
        manifest::from_file(&self.manifest_path())
    }

    pub fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        manifest::to_file(manifest, &self.manifest_path())
    }

    pub fn version(&self) -> Result<String> {
        Ok(self.manifest()?.version()?.to_string())
    }

    pub fn author(&self) -> Result<String> {
        Ok(self.manifest()?.author()?.to_string())
    }

    pub fn license(&self) -> Result<String> {
        Ok(self.manifest()?.license()?.to_string())
    }

    pub fn description(&self) -> Result<String> {
        Ok(self.manifest()?.description()?.to_string())
    }

    pub fn platforms(&self) -> Result<Vec<Platform>> {
        Ok(self.manifest()?.platforms()?.to_vec())
    }

    /// Expected variable prefix: declared, or derived from the role name.
    pub fn prefix(&self) -> Result<String> {
        Ok(self
            .manifest()?
            .prefix
            .unwrap_or_else(|| default_prefix(&self.name)))
    }

    pub fn dependencies(&self) -> Result<Vec<String>> {
        Ok(self.manifest()?.dependency_ids())
    }

    pub fn include_when(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.manifest()?.include_when.unwrap_or_default())
    }

    /// Merge defaults, vars and manifest descriptions into one catalog.
    pub fn variables(&self) -> Result<BTreeMap<String, Variable>> {
        let mut catalog = BTreeMap::new();

        for (name, value) in read_mapping(&self.path(DEFAULTS_PATH))? {
            catalog.insert(
                name,
                Variable {
                    value: Some(value),
                    description: None,
                    kind: VariableKind::Default,
                },
            );
        }

        for (name, value) in read_mapping(&self.path(VARS_PATH))? {
            if catalog.contains_key(&name) {
                return Err(Error::VariableSetTwice { name });
            }
            catalog.insert(
                name,
                Variable {
                    value: Some(value),
                    description: None,
                    kind: VariableKind::Constant,
                },
            );
        }

        for (name, description) in self.manifest()?.variables.unwrap_or_default() {
            match catalog.get_mut(&name) {
                Some(var) => var.description = Some(description),
                None => {
                    catalog.insert(
                        name,
                        Variable {
                            value: None,
                            description: Some(description),
                            kind: VariableKind::Declared,
                        },
                    );
                }
            }
        }

        Ok(catalog)
    }

    /// Task fragment filenames under `tasks/`, sorted, `main.yml` excluded.
    pub fn fragments(&self) -> Result<Vec<String>> {
        let dir = self.path(TASKS_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_yaml(&name) && !name.starts_with('.') && !is_maintask(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Entries of the aggregated task list currently on disk.
    pub fn maintask_entries(&self) -> Result<Vec<Value>> {
        let path = self.path(MAINTASK_PATH);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        read_task_list(&path)
    }

    /// Whether `tasks/main.yml` holds hand-authored entries.
    ///
    /// Always reads the file on disk: this flag decides between overwriting
    /// and preserving the aggregated task list. A file that cannot be read
    /// as a task list counts as hand-authored, so it is never overwritten
    /// or removed.
    pub fn is_legacy(&self) -> bool {
        match self.maintask_entries() {
            Ok(entries) => entries
                .iter()
                .any(|entry| !is_fail_entry(entry) && !is_include_entry(entry)),
            Err(e) => {
                log::warn!("treating {} as hand-authored: {}", MAINTASK_PATH, e);
                true
            }
        }
    }
}

/// Prefix derived from a role name: `My-Role` gives `my_role_`.
pub fn default_prefix(name: &str) -> String {
    format!("{}_", name.to_lowercase().replace('-', "_"))
}

fn is_maintask(name: &str) -> bool {
    Path::new(MAINTASK_PATH)
        .file_name()
        .is_some_and(|main| main == name)
}

pub fn is_yaml(name: &str) -> bool {
    name.ends_with(".yml") || name.ends_with(".yaml")
}

fn has_any_key(entry: &Value, keys: &[&str]) -> bool {
    entry
        .as_mapping()
        .is_some_and(|map| keys.iter().any(|key| map.contains_key(*key)))
}

pub fn is_fail_entry(entry: &Value) -> bool {
    has_any_key(entry, &[FAIL_KEY])
}

pub fn is_include_entry(entry: &Value) -> bool {
    has_any_key(entry, INCLUDE_KEYS)
}

/// Read a task file: a YAML sequence, or nothing.
pub fn read_task_list(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)?;
    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Sequence(entries)) => Ok(entries),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(_) => Err(Error::RoleFile {
            path: path.to_path_buf(),
            message: "expected a list of tasks".to_string(),
        }),
        Err(e) => Err(Error::RoleFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

/// Read a variables file: a YAML mapping with string keys, or nothing.
fn read_mapping(path: &Path) -> Result<Vec<(String, Value)>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| Error::RoleFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(map) => map
            .into_iter()
            .map(|(key, value)| match key {
                Value::String(name) => Ok((name, value)),
                other => Err(Error::RoleFile {
                    path: path.to_path_buf(),
                    message: format!("variable names must be strings, found {:?}", other),
                }),
            })
            .collect(),
        _ => Err(Error::RoleFile {
            path: path.to_path_buf(),
            message: "expected a mapping of variables".to_string(),
        }),
    }
}
