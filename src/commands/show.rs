//! Rendering of the `show` phase.

use ansible_universe::lifecycle::RoleSummary;

const UNSET: &str = "(unset)";

/// Multi-line description of a role, as printed by `show`.
pub fn render(summary: &RoleSummary) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| UNSET.to_string());

    let mut text = String::new();
    text.push_str(&format!("name: {}\n", summary.name));
    text.push_str(&format!("version: {}\n", field(&summary.version)));
    text.push_str(&format!("author: {}\n", field(&summary.author)));
    text.push_str(&format!("description: {}\n", field(&summary.description)));
    text.push_str(&format!("license: {}\n", field(&summary.license)));
    if let Some(min) = &summary.min_ansible_version {
        text.push_str(&format!("min_ansible_version: {}\n", min));
    }
    text.push_str(&format!("prefix: {}\n", summary.prefix));

    text.push_str("platforms:\n");
    for platform in &summary.platforms {
        if platform.versions.is_empty() {
            text.push_str(&format!("  - {}\n", platform.name));
        } else {
            text.push_str(&format!(
                "  - {} ({})\n",
                platform.name,
                platform.versions.join(", ")
            ));
        }
    }

    text.push_str("dependencies:\n");
    for dep in &summary.dependencies {
        text.push_str(&format!("  - {}\n", dep));
    }

    text.push_str("variables:\n");
    for (name, var) in &summary.variables {
        let mut line = format!("  - {}", name);
        if var.value.is_some() {
            line.push_str(&format!(" = {}", var.value_text()));
        }
        if var.is_constant() {
            line.push_str(" (constant)");
        }
        if let Some(description) = &var.description {
            line.push_str(&format!(": {}", description));
        }
        text.push_str(&line);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use ansible_universe::manifest::Platform;
    use ansible_universe::role::{Variable, VariableKind};
    use std::collections::BTreeMap;

    #[test]
    fn test_render_summary() {
        let mut variables = BTreeMap::new();
        variables.insert(
            "foo_port".to_string(),
            Variable {
                value: Some(serde_yaml::Value::from(80)),
                description: Some("listening port".to_string()),
                kind: VariableKind::Default,
            },
        );
        let summary = RoleSummary {
            name: "foo".to_string(),
            version: Some("0.0.1".to_string()),
            author: None,
            description: None,
            license: Some("MIT".to_string()),
            min_ansible_version: None,
            prefix: "foo_".to_string(),
            platforms: vec![Platform {
                name: "EL".to_string(),
                versions: vec!["7".to_string()],
            }],
            dependencies: vec![],
            variables,
        };

        let text = render(&summary);
        assert!(text.starts_with("name: foo\nversion: 0.0.1\nauthor: (unset)\n"));
        assert!(text.contains("  - EL (7)\n"));
        assert!(text.contains("  - foo_port = 80: listening port\n"));
    }
}
