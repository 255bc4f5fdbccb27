//! # Rule Registry
//!
//! Rules are plain data: a name, an optional selection flag, the kind of
//! object they look at, a message and a predicate. The registry is an ordered
//! `Vec<Rule>` assembled once; the linter dispatches each rule to the objects
//! of its kind and reports a warning whenever the predicate returns `false`.
//!
//! Adding a rule means adding one entry to [`registry`]. Rules never depend
//! on each other and only read the object and context they are given, with
//! the exception of `syntax_is_ok`, which shells out to `ansible-playbook`
//! inside a scratch directory.

use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use serde_yaml::Value;

use crate::defaults::ROLE_SUBDIRS;
use crate::manifest::Manifest;
use crate::role::{Role, Variable};

/// The kind of role object a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetKind {
    Role,
    Variable,
    Subdir,
    Task,
}

impl TargetKind {
    /// All kinds, in reporting order.
    pub const ALL: [TargetKind; 4] = [
        TargetKind::Role,
        TargetKind::Variable,
        TargetKind::Subdir,
        TargetKind::Task,
    ];
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Role => write!(f, "role"),
            TargetKind::Variable => write!(f, "variable"),
            TargetKind::Subdir => write!(f, "subdir"),
            TargetKind::Task => write!(f, "task"),
        }
    }
}

/// A role object under inspection
#[derive(Debug, Clone, Copy)]
pub enum Object<'a> {
    Role(&'a Role),
    Variable {
        name: &'a str,
        variable: &'a Variable,
    },
    Subdir(&'a str),
    Task {
        /// Role-relative path of the fragment holding the task.
        fragment: &'a str,
        /// Position of the task in its fragment, 0-based.
        index: usize,
        task: &'a Value,
    },
}

impl Object<'_> {
    pub fn kind(&self) -> TargetKind {
        match self {
            Object::Role(_) => TargetKind::Role,
            Object::Variable { .. } => TargetKind::Variable,
            Object::Subdir(_) => TargetKind::Subdir,
            Object::Task { .. } => TargetKind::Task,
        }
    }

    /// Human identifier used in warnings.
    pub fn identifier(&self) -> String {
        match self {
            Object::Role(role) => role.name().to_string(),
            Object::Variable { name, .. } => (*name).to_string(),
            Object::Subdir(name) => format!("{}/", name),
            Object::Task {
                fragment,
                index,
                task,
            } => match task.get("name").and_then(Value::as_str) {
                Some(name) => format!("{}[{}]", fragment, name),
                None => format!("{}[task#{}]", fragment, index + 1),
            },
        }
    }
}

/// Data shared by every predicate of one lint pass
#[derive(Debug)]
pub struct RuleContext<'a> {
    pub role: &'a Role,
    pub manifest: &'a Manifest,
    pub prefix: String,
}

pub type Predicate = fn(&Object<'_>, &RuleContext<'_>) -> bool;

/// A lint rule
#[derive(Clone)]
pub struct Rule {
    pub name: &'static str,
    /// Selection flag; the rule name when unset.
    pub flag: Option<&'static str>,
    pub kind: TargetKind,
    pub message: &'static str,
    pub predicate: Predicate,
}

impl Rule {
    pub fn flag(&self) -> &'static str {
        self.flag.unwrap_or(self.name)
    }

    pub fn check(&self, object: &Object<'_>, context: &RuleContext<'_>) -> bool {
        (self.predicate)(object, context)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("flag", &self.flag())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Every rule, in evaluation order.
pub fn registry() -> Vec<Rule> {
    vec![
        Rule {
            name: "manifest_has_author",
            flag: Some("manifest"),
            kind: TargetKind::Role,
            message: "missing author attribute, please specify the role author",
            predicate: |_, ctx| galaxy_field(ctx.manifest, |g| g.author.as_deref()),
        },
        Rule {
            name: "manifest_has_license",
            flag: Some("manifest"),
            kind: TargetKind::Role,
            message: "missing license attribute, please specify the role license",
            predicate: |_, ctx| galaxy_field(ctx.manifest, |g| g.license.as_deref()),
        },
        Rule {
            name: "manifest_has_description",
            flag: Some("manifest"),
            kind: TargetKind::Role,
            message: "missing description attribute, please describe the role",
            predicate: |_, ctx| galaxy_field(ctx.manifest, |g| g.description.as_deref()),
        },
        Rule {
            name: "manifest_has_platforms",
            flag: Some("manifest"),
            kind: TargetKind::Role,
            message: "missing platforms attribute, please list the supported platforms",
            predicate: |_, ctx| {
                ctx.manifest
                    .platforms()
                    .is_ok_and(|platforms| !platforms.is_empty())
            },
        },
        Rule {
            name: "version_is_semver",
            flag: Some("manifest"),
            kind: TargetKind::Role,
            message: "version is not a semantic version (MAJOR.MINOR.PATCH)",
            predicate: |_, ctx| {
                ctx.manifest
                    .version()
                    .is_ok_and(|v| semver::Version::parse(v).is_ok())
            },
        },
        Rule {
            name: "syntax_is_ok",
            flag: Some("syntax"),
            kind: TargetKind::Role,
            message: "syntax check failed, run ansible-playbook --syntax-check on a playbook using this role",
            predicate: |_, ctx| syntax_check(ctx.role),
        },
        Rule {
            name: "variable_is_prefixed",
            flag: Some("naming"),
            kind: TargetKind::Variable,
            message: "unexpected variable prefix (you can change the expected prefix in the role manifest)",
            predicate: |obj, ctx| match obj {
                Object::Variable { name, .. } => name.starts_with(&ctx.prefix),
                _ => true,
            },
        },
        Rule {
            name: "variable_is_identifier",
            flag: Some("naming"),
            kind: TargetKind::Variable,
            message: "invalid variable name, use letters, digits and underscores only",
            predicate: |obj, _| match obj {
                Object::Variable { name, .. } => is_identifier(name),
                _ => true,
            },
        },
        Rule {
            name: "variable_is_documented",
            flag: Some("documentation"),
            kind: TargetKind::Variable,
            message: "undocumented variable, describe it under 'variables' in the role manifest",
            predicate: |obj, _| match obj {
                Object::Variable { variable, .. } => variable
                    .description
                    .as_deref()
                    .is_some_and(|d| !d.trim().is_empty()),
                _ => true,
            },
        },
        Rule {
            name: "subdir_is_defined",
            flag: Some("layout"),
            kind: TargetKind::Subdir,
            message: "undefined role sub-directory",
            predicate: |obj, _| match obj {
                Object::Subdir(name) => ROLE_SUBDIRS.contains(name),
                _ => true,
            },
        },
        Rule {
            name: "task_has_name",
            flag: Some("naming"),
            kind: TargetKind::Task,
            message: "unnamed task, please give every task a name",
            predicate: |obj, _| match obj {
                Object::Task { task, .. } => task.get("name").is_some(),
                _ => true,
            },
        },
        Rule {
            name: "task_has_no_remote_user",
            flag: None,
            kind: TargetKind::Task,
            message: "do not set a remote_user for a task, use become_* instead",
            predicate: |obj, _| match obj {
                Object::Task { task, .. } => task.get("remote_user").is_none(),
                _ => true,
            },
        },
        Rule {
            name: "copy_has_owner",
            flag: Some("owner"),
            kind: TargetKind::Task,
            message: "missing 'owner' attribute, the file will be owned by the varying current user",
            predicate: |obj, _| match obj {
                Object::Task { task, .. } => module_has_arg(task, "copy", "owner"),
                _ => true,
            },
        },
        Rule {
            name: "template_has_owner",
            flag: Some("owner"),
            kind: TargetKind::Task,
            message: "missing 'owner' attribute, the file will be owned by the varying current user",
            predicate: |obj, _| match obj {
                Object::Task { task, .. } => module_has_arg(task, "template", "owner"),
                _ => true,
            },
        },
    ]
}

fn galaxy_field(
    manifest: &Manifest,
    field: impl Fn(&crate::manifest::GalaxyInfo) -> Option<&str>,
) -> bool {
    manifest
        .galaxy_info
        .as_ref()
        .and_then(field)
        .is_some_and(|value| !value.trim().is_empty())
}

fn is_identifier(name: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Whether a task using `module` passes `arg`, in mapping or `k=v` form.
///
/// Tasks not using the module pass trivially.
fn module_has_arg(task: &Value, module: &str, arg: &str) -> bool {
    match task.get(module) {
        None => true,
        Some(Value::Mapping(args)) => args.contains_key(arg),
        Some(Value::String(free_form)) => free_form
            .split_whitespace()
            .any(|word| word.starts_with(&format!("{}=", arg))),
        // Parameters passed at task level (`args:`) are the older layout.
        Some(_) => task
            .get("args")
            .and_then(Value::as_mapping)
            .is_some_and(|args| args.contains_key(arg)),
    }
}

/// Syntax-check the role by including it in a throwaway playbook.
///
/// An unavailable `ansible-playbook` counts as a failure: the check is
/// never skipped silently.
fn syntax_check(role: &Role) -> bool {
    match run_syntax_check(role) {
        Ok(passed) => passed,
        Err(e) => {
            log::warn!("syntax check could not run: {}", e);
            false
        }
    }
}

fn run_syntax_check(role: &Role) -> std::io::Result<bool> {
    let scratch = tempfile::TempDir::new()?;
    let dir = scratch.path();
    let roles_path = role.root().parent().unwrap_or(Path::new("."));

    fs::write(
        dir.join("playbook.yml"),
        format!(
            "---\n- hosts: 127.0.0.1\n  connection: local\n  roles:\n    - {}\n",
            role.name()
        ),
    )?;
    fs::write(
        dir.join("inventory.cfg"),
        "localhost ansible_connection=local\n",
    )?;
    fs::write(
        dir.join("ansible.cfg"),
        format!(
            "[defaults]\nroles_path = {}\ninventory = inventory.cfg\n",
            roles_path.display()
        ),
    )?;

    log::debug!("running ansible-playbook --syntax-check in {}", dir.display());
    let output = Command::new("ansible-playbook")
        .args(["playbook.yml", "--syntax-check"])
        .env("ANSIBLE_CONFIG", dir.join("ansible.cfg"))
        .current_dir(dir)
        .output()?;

    if !output.status.success() {
        log::debug!(
            "syntax check failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.status.success())
}
