//! # Generators
//!
//! Derived artifacts of a role, rendered from its current state:
//!
//! - `README.md`, from a minijinja template over the manifest and the
//!   variable catalog;
//! - `tasks/main.yml`, the aggregated task list including every fragment
//!   under `tasks/`, preceded by a platform guard when platforms are
//!   declared.
//!
//! Both are pure functions of what is on disk: rendering twice without
//! changes in between yields identical text. A hand-authored (legacy)
//! `tasks/main.yml` is never replaced; only its platform guard is refreshed.

use minijinja::{context, Environment};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::defaults::{MAINTASK_PATH, README_PATH};
use crate::error::Result;
use crate::filesystem;
use crate::role::{Role, VariableKind};

/// Name of the guard entry failing on unsupported platforms.
pub const GUARD_NAME: &str = "assert the target platform is supported";

/// First line of every generated README.
pub const README_MARKER: &str = "<!-- THIS IS A GENERATED FILE, DO NOT EDIT -->";

const README_TEMPLATE: &str = r#"{{ marker }}

# {{ name }}

{{ description or "No description (yet.)" }}

* * *

{% if version %}
Version {{ version }}.
{% endif %}
{% if min_ansible_version %}
Requires Ansible {{ min_ansible_version }} or later.
{% endif %}

## Supported Platforms

{% for platform in platforms %}
  * {{ platform }}
{% else %}
No supported platform specified (yet.)
{% endfor %}

## Variables

| Name | Default | Description |
|------|---------|-------------|
{% for var in variables %}
| {{ var.name }} | {{ var.default }} | {{ var.description }} |
{% endfor %}
{% if dependencies %}

## Dependencies

{% for dep in dependencies %}
  * {{ dep }}
{% endfor %}
{% endif %}

## Usage

Read Ansible documentation at https://docs.ansible.com/playbooks_roles.html#roles.
{% if usage_complement %}

{{ usage_complement }}
{% endif %}

## Maintenance

Install ansible-universe and run `ansible-universe dist check` to re-generate this distribution.

The following files are generated or updated based on the role manifest `meta/main.yml`:
  * tasks/main.yml
  * README.md
{% if maintenance_complement %}

{{ maintenance_complement }}
{% endif %}
"#;

/// One row of the README variable table
#[derive(Debug, Serialize)]
struct VariableRow {
    name: String,
    default: String,
    description: String,
}

/// Markdown table cells cannot hold raw pipes or newlines.
fn cell(text: &str) -> String {
    text.trim().replace('|', "\\|").replace('\n', " ")
}

/// Render the README of `role`.
///
/// Constants (`vars/main.yml`) are internal and left out of the variable
/// table.
pub fn generate_readme(role: &Role) -> Result<String> {
    let manifest = role.manifest()?;
    let galaxy = manifest.galaxy_info.clone().unwrap_or_default();

    let platforms: Vec<String> = galaxy
        .platforms
        .unwrap_or_default()
        .into_iter()
        .map(|platform| {
            if platform.versions.is_empty() {
                platform.name
            } else {
                format!("{} ({})", platform.name, platform.versions.join(", "))
            }
        })
        .collect();

    let variables: Vec<VariableRow> = role
        .variables()?
        .into_iter()
        .filter(|(_, var)| var.kind != VariableKind::Constant)
        .map(|(name, var)| VariableRow {
            name: cell(&name),
            default: cell(&var.value_text()),
            description: cell(var.description.as_deref().unwrap_or_default()),
        })
        .collect();

    let dependencies = manifest.dependency_ids();

    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template(README_PATH, README_TEMPLATE)?;
    let template = env.get_template(README_PATH)?;

    let text = template.render(context! {
        marker => README_MARKER,
        name => role.name(),
        description => galaxy.description.filter(|d| !d.trim().is_empty()),
        version => manifest.version,
        min_ansible_version => galaxy.min_ansible_version,
        platforms => platforms,
        variables => variables,
        dependencies => dependencies,
        usage_complement => manifest.usage_complement,
        maintenance_complement => manifest.maintenance_complement,
    })?;
    Ok(text)
}

/// The platform guard entry, if the role declares platforms.
pub fn platform_guard(role: &Role) -> Result<Option<Value>> {
    let manifest = role.manifest()?;
    let galaxy = manifest.galaxy_info.unwrap_or_default();
    let platforms = galaxy.platforms.unwrap_or_default();
    if platforms.is_empty() {
        return Ok(None);
    }

    let author = galaxy
        .author
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| "the role maintainer".to_string());
    let names = platforms
        .iter()
        .map(|p| format!("'{}'", p.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut fail = Mapping::new();
    fail.insert(
        "msg".into(),
        format!("unsupported platform -- please contact {} for support", author).into(),
    );
    let mut guard = Mapping::new();
    guard.insert("name".into(), GUARD_NAME.into());
    guard.insert("fail".into(), Value::Mapping(fail));
    guard.insert(
        "when".into(),
        format!("ansible_distribution not in [{}]", names).into(),
    );
    Ok(Some(Value::Mapping(guard)))
}

fn is_guard(entry: &Value) -> bool {
    entry.get("name").and_then(Value::as_str) == Some(GUARD_NAME)
}

/// Compute the aggregated task list of `role`.
pub fn generate_aggregate_tasks(role: &Role) -> Result<Vec<Value>> {
    let mut entries: Vec<Value> = platform_guard(role)?.into_iter().collect();

    if role.is_legacy() {
        log::debug!("{} is hand-authored, refreshing its guard only", MAINTASK_PATH);
        entries.extend(
            role.maintask_entries()?
                .into_iter()
                .filter(|entry| !is_guard(entry)),
        );
        return Ok(entries);
    }

    let conditions = role.include_when()?;
    for fragment in role.fragments()? {
        log::debug!("including {}", fragment);
        let mut include = Mapping::new();
        include.insert("include".into(), fragment.clone().into());
        if let Some(condition) = conditions.get(&fragment) {
            include.insert("when".into(), condition.clone().into());
        }
        entries.push(Value::Mapping(include));
    }
    Ok(entries)
}

/// Render a task list as a YAML document.
pub fn render_tasks(entries: &[Value]) -> Result<String> {
    Ok(format!("---\n{}", serde_yaml::to_string(entries)?))
}

pub fn write_readme(role: &Role) -> Result<()> {
    let text = generate_readme(role)?;
    filesystem::write_file(&role.path(README_PATH), &text)
}

pub fn write_aggregate_tasks(role: &Role) -> Result<()> {
    let text = render_tasks(&generate_aggregate_tasks(role)?)?;
    filesystem::write_file(&role.path(MAINTASK_PATH), &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{DEFAULTS_PATH, MANIFEST_PATH, VARS_PATH};
    use crate::filesystem::write_file;
    use std::fs;
    use tempfile::TempDir;

    fn role_with(files: &[(&str, &str)]) -> (TempDir, Role) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("foo");
        fs::create_dir_all(&root).unwrap();
        for (path, content) in files {
            write_file(&root.join(path), content).unwrap();
        }
        let role = Role::open(&root).unwrap();
        (temp, role)
    }

    const MANIFEST: &str = "version: 1.2.0
galaxy_info:
  author: jdoe
  description: Installs foo.
  license: MIT
  platforms:
    - name: EL
      versions: [6, 7]
    - name: Ubuntu
variables:
  foo_port: listening port
include_when:
  service.yml: foo_service_enabled
";

    #[test]
    fn test_readme_content() {
        let (_temp, role) = role_with(&[
            (MANIFEST_PATH, MANIFEST),
            (DEFAULTS_PATH, "foo_port: 80\n"),
            (VARS_PATH, "foo_internal: x\n"),
        ]);
        let readme = generate_readme(&role).unwrap();

        assert!(readme.starts_with(&format!("{}\n", README_MARKER)));
        assert!(readme.contains("# foo\n"));
        assert!(readme.contains("Installs foo."));
        assert!(readme.contains("Version 1.2.0."));
        assert!(readme.contains("  * EL (6, 7)\n"));
        assert!(readme.contains("  * Ubuntu\n"));
        assert!(readme.contains("| foo_port | 80 | listening port |"));
        assert!(!readme.contains("foo_internal"));
        assert!(!readme.contains("(yet.)"));
    }

    #[test]
    fn test_readme_fallbacks() {
        let (_temp, role) = role_with(&[(MANIFEST_PATH, "version: 0.0.1\n")]);
        let readme = generate_readme(&role).unwrap();
        assert!(readme.contains("No description (yet.)"));
        assert!(readme.contains("No supported platform specified (yet.)"));
    }

    #[test]
    fn test_readme_complements() {
        let (_temp, role) = role_with(&[(
            MANIFEST_PATH,
            "usage_complement: Set foo_port first.\nmaintenance_complement: Ping ops.\n",
        )]);
        let readme = generate_readme(&role).unwrap();
        let usage = readme.find("Set foo_port first.").unwrap();
        let maintenance = readme.find("## Maintenance").unwrap();
        assert!(usage < maintenance);
        assert!(readme.trim_end().ends_with("Ping ops."));
    }

    #[test]
    fn test_aggregate_tasks() {
        let (_temp, role) = role_with(&[
            (MANIFEST_PATH, MANIFEST),
            ("tasks/service.yml", "---\n"),
            ("tasks/install.yml", "---\n"),
        ]);
        let entries = generate_aggregate_tasks(&role).unwrap();
        assert_eq!(entries.len(), 3);

        let guard = &entries[0];
        assert_eq!(guard["name"].as_str(), Some(GUARD_NAME));
        assert_eq!(
            guard["fail"]["msg"].as_str(),
            Some("unsupported platform -- please contact jdoe for support")
        );
        assert_eq!(
            guard["when"].as_str(),
            Some("ansible_distribution not in ['EL', 'Ubuntu']")
        );

        assert_eq!(entries[1]["include"].as_str(), Some("install.yml"));
        assert!(entries[1].get("when").is_none());
        assert_eq!(entries[2]["include"].as_str(), Some("service.yml"));
        assert_eq!(entries[2]["when"].as_str(), Some("foo_service_enabled"));
    }

    #[test]
    fn test_no_platforms_no_guard() {
        let (_temp, role) = role_with(&[
            (MANIFEST_PATH, "version: 0.0.1\n"),
            ("tasks/install.yml", "---\n"),
        ]);
        let entries = generate_aggregate_tasks(&role).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["include"].as_str(), Some("install.yml"));
    }

    #[test]
    fn test_legacy_entries_preserved() {
        let legacy = "- name: install foo\n  apt: {name: foo}\n";
        let (_temp, role) = role_with(&[
            (MANIFEST_PATH, "version: 0.0.1\n"),
            (MAINTASK_PATH, legacy),
            ("tasks/extra.yml", "---\n"),
        ]);
        let expected: Vec<Value> = serde_yaml::from_str(legacy).unwrap();
        assert_eq!(generate_aggregate_tasks(&role).unwrap(), expected);
    }

    #[test]
    fn test_legacy_guard_is_replaced() {
        let (_temp, role) = role_with(&[
            (MANIFEST_PATH, MANIFEST),
            (
                MAINTASK_PATH,
                "- name: assert the target platform is supported\n  fail: {msg: old}\n  when: false\n- name: install foo\n  apt: {name: foo}\n",
            ),
        ]);
        let entries = generate_aggregate_tasks(&role).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0]["fail"]["msg"].as_str(),
            Some("unsupported platform -- please contact jdoe for support")
        );
        assert_eq!(entries[1]["name"].as_str(), Some("install foo"));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let (_temp, role) = role_with(&[
            (MANIFEST_PATH, MANIFEST),
            (DEFAULTS_PATH, "foo_port: 80\n"),
            ("tasks/install.yml", "---\n"),
        ]);
        write_readme(&role).unwrap();
        write_aggregate_tasks(&role).unwrap();
        let readme = fs::read(role.path(README_PATH)).unwrap();
        let tasks = fs::read(role.path(MAINTASK_PATH)).unwrap();

        write_readme(&role).unwrap();
        write_aggregate_tasks(&role).unwrap();
        assert_eq!(fs::read(role.path(README_PATH)).unwrap(), readme);
        assert_eq!(fs::read(role.path(MAINTASK_PATH)).unwrap(), tasks);
        assert!(!role.is_legacy());
    }
}
