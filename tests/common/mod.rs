//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a role fixture and a few manifest snippets to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_manifest(manifests::COMPLETE);
//!     fixture.command().arg("dist").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::manifests;
    pub use super::TestFixture;
}

/// Common manifest snippets for testing.
#[allow(dead_code)]
pub mod manifests {
    /// Manifest satisfying every manifest rule.
    pub const COMPLETE: &str = r#"---
version: 1.0.0
galaxy_info:
  author: jdoe
  description: Installs foo.
  license: MIT
  platforms:
    - name: EL
      versions: [7]
variables:
  foo_port: listening port
dependencies: []
include_when: {}
"#;

    /// Manifest without author.
    pub const NO_AUTHOR: &str = r#"---
version: 0.0.1
galaxy_info:
  license: MIT
"#;

    /// Manifest that does not parse.
    pub const INVALID_YAML: &str = "version: [unclosed";
}

/// Name of the role directory created by every fixture.
pub const ROLE_NAME: &str = "foo";

/// A temporary directory holding one (possibly empty) role directory, `foo/`.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_manifest(manifests::COMPLETE)
///     .with_file("tasks/install.yml", "- name: install\n  apt: {name: foo}\n");
///
/// fixture.command().arg("dist").assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new fixture with an empty role directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child(ROLE_NAME)
            .create_dir_all()
            .expect("Failed to create role directory");
        Self { temp_dir }
    }

    /// Write the role manifest.
    pub fn with_manifest(self, content: &str) -> Self {
        self.with_file("meta/main.yml", content)
    }

    /// Add a file under the role directory.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.role()
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Path of the directory holding the role.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The role directory.
    pub fn role(&self) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(ROLE_NAME)
    }

    /// A path under the role directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.role().child(path)
    }

    /// Create a command running on the fixture role via `-C`.
    ///
    /// The repository variable is cleared and colors are off, so runs do
    /// not depend on the caller's environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("ansible-universe");
        cmd.current_dir(self.path())
            .env_remove("ANSIBLE_UNIVERSE_REPOSITORY")
            .arg("--no-color")
            .arg("-C")
            .arg(ROLE_NAME);
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_role_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().join(ROLE_NAME).is_dir());
    }

    #[test]
    fn test_fixture_with_manifest() {
        let fixture = TestFixture::new().with_manifest(manifests::COMPLETE);
        assert!(fixture.child("meta/main.yml").path().exists());
    }

    #[test]
    fn test_manifests_are_valid_yaml() {
        for manifest in [manifests::COMPLETE, manifests::NO_AUTHOR] {
            serde_yaml::from_str::<serde_yaml::Value>(manifest)
                .expect("Manifest should be valid YAML");
        }
        assert!(serde_yaml::from_str::<serde_yaml::Value>(manifests::INVALID_YAML).is_err());
    }
}
