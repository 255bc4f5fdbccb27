//! # Linter
//!
//! Evaluates the rule registry against a role. Each pass re-scans the role:
//!
//! 1. the role itself,
//! 2. every variable of the merged catalog, sorted by name,
//! 3. every top-level sub-directory, sorted by name,
//! 4. every task of every fragment under `tasks/`, sorted by path, with
//!    `block`/`rescue`/`always` sections flattened.
//!
//! Warnings come out grouped by kind in that order, then by object, then by
//! rule order, so identical roles always produce identical reports.
//!
//! A fragment that cannot be parsed is logged and left out of the pass.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde_yaml::Value;
use walkdir::WalkDir;

use crate::defaults::{BUILD_DIR, MAINTASK_PATH, TASKS_DIR};
use crate::error::{Error, Result};
use crate::filesystem;
use crate::path::{display_relative, ExcludeSet};
use crate::role::{self, default_prefix, Role};
use crate::rules::{registry, Object, Rule, RuleContext, TargetKind};

/// Sentinel flag enabling every rule.
pub const ALL_FLAGS: &str = "all";

/// Selection of rules by flag or name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    all: bool,
    enabled: BTreeSet<String>,
    disabled: BTreeSet<String>,
}

impl FlagSet {
    /// Every rule.
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    /// No rule at all: selection is opt-in.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `all,-syntax` or `manifest,naming`.
    pub fn parse(list: &str) -> Self {
        let mut flags = Self::none();
        for item in list.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            if let Some(excluded) = item.strip_prefix('-') {
                flags.disabled.insert(excluded.to_string());
            } else if item == ALL_FLAGS {
                flags.all = true;
            } else {
                flags.enabled.insert(item.to_string());
            }
        }
        flags
    }

    pub fn enables(&self, rule: &Rule) -> bool {
        let named = |set: &BTreeSet<String>| set.contains(rule.flag()) || set.contains(rule.name);
        (self.all || named(&self.enabled)) && !named(&self.disabled)
    }
}

/// A failed rule on one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub rule: &'static str,
    pub flag: &'static str,
    pub kind: TargetKind,
    pub object: String,
    pub message: &'static str,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.object, self.message, self.flag)
    }
}

/// Newline-joined warnings, as written to the report file.
pub fn report_text(warnings: &[Warning]) -> String {
    warnings
        .iter()
        .map(|w| format!("{}\n", w))
        .collect::<String>()
}

/// Evaluate every rule against every object of its kind.
///
/// In strict mode the first failure aborts with [`Error::LintFailed`].
pub fn evaluate(
    rules: &[Rule],
    objects: &[Object<'_>],
    context: &RuleContext<'_>,
    strict: bool,
) -> Result<Vec<Warning>> {
    let mut warnings = Vec::new();
    for kind in TargetKind::ALL {
        let applicable: Vec<&Rule> = rules.iter().filter(|r| r.kind == kind).collect();
        if applicable.is_empty() {
            continue;
        }
        for object in objects.iter().filter(|o| o.kind() == kind) {
            for rule in &applicable {
                if rule.check(object, context) {
                    continue;
                }
                let warning = Warning {
                    rule: rule.name,
                    flag: rule.flag(),
                    kind,
                    object: object.identifier(),
                    message: rule.message,
                };
                if strict {
                    return Err(Error::LintFailed {
                        warning: warning.to_string(),
                    });
                }
                log::debug!("{}", warning);
                warnings.push(warning);
            }
        }
    }
    Ok(warnings)
}

/// Rule evaluation over a role
#[derive(Debug, Clone)]
pub struct Linter {
    rules: Vec<Rule>,
    flags: FlagSet,
    strict: bool,
    excludes: ExcludeSet,
}

impl Linter {
    /// A linter over the full registry.
    pub fn new(flags: FlagSet, excludes: ExcludeSet) -> Self {
        Self::with_rules(registry(), flags, excludes)
    }

    pub fn with_rules(rules: Vec<Rule>, flags: FlagSet, excludes: ExcludeSet) -> Self {
        Self {
            rules,
            flags,
            strict: false,
            excludes,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Rules selected by the flag set, in registry order.
    pub fn selected_rules(&self) -> Vec<Rule> {
        self.rules
            .iter()
            .filter(|rule| self.flags.enables(rule))
            .cloned()
            .collect()
    }

    /// Run one lint pass over `role`.
    pub fn check(&self, role: &Role) -> Result<Vec<Warning>> {
        let rules = self.selected_rules();
        if rules.is_empty() {
            log::debug!("no rule enabled, skipping lint");
            return Ok(Vec::new());
        }

        let manifest = role.manifest()?;
        let prefix = manifest
            .prefix
            .clone()
            .unwrap_or_else(|| default_prefix(role.name()));
        let context = RuleContext {
            role,
            manifest: &manifest,
            prefix,
        };

        let variables = role.variables()?;
        let subdirs: Vec<String> = filesystem::top_level_dirs(role.root(), &self.excludes)?
            .into_iter()
            .filter(|name| name != BUILD_DIR && !name.starts_with('.'))
            .collect();
        let fragments = self.task_fragments(role)?;

        let mut objects = vec![Object::Role(role)];
        objects.extend(variables.iter().map(|(name, variable)| Object::Variable {
            name: name.as_str(),
            variable,
        }));
        objects.extend(subdirs.iter().map(|name| Object::Subdir(name.as_str())));
        for (fragment, entries) in &fragments {
            let mut tasks = Vec::new();
            flatten_tasks(entries, &mut tasks);
            objects.extend(tasks.into_iter().enumerate().map(|(index, task)| Object::Task {
                fragment: fragment.as_str(),
                index,
                task,
            }));
        }

        log::debug!(
            "linting {} objects with {} rules",
            objects.len(),
            rules.len()
        );
        evaluate(&rules, &objects, &context, self.strict)
    }

    /// Parse every task file; the generated aggregation file is skipped
    /// unless it holds hand-authored (legacy) content.
    fn task_fragments(&self, role: &Role) -> Result<Vec<(String, Vec<Value>)>> {
        let dir = role.path(TASKS_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let legacy = role.is_legacy();
        let mut fragments = Vec::new();

        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Filesystem {
                message: format!("Failed to scan '{}': {}", dir.display(), e),
            })?;
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file() || !role::is_yaml(&name) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(role.root()) else {
                continue;
            };
            if self.excludes.is_excluded(relative) {
                continue;
            }
            if relative == Path::new(MAINTASK_PATH) && !legacy {
                continue;
            }
            match role::read_task_list(entry.path()) {
                Ok(entries) => fragments.push((display_relative(relative), entries)),
                Err(e) => log::warn!("skipping malformed task file: {}", e),
            }
        }

        Ok(fragments)
    }
}

/// Collect leaf tasks, descending into block sections.
fn flatten_tasks<'a>(entries: &'a [Value], out: &mut Vec<&'a Value>) {
    for entry in entries {
        let mut nested = false;
        for section in ["block", "rescue", "always"] {
            if let Some(Value::Sequence(children)) = entry.get(section) {
                flatten_tasks(children, out);
                nested = true;
            }
        }
        if !nested {
            out.push(entry);
        }
    }
}
