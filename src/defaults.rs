//! Default values for the role layout and command-line options.
//!
//! This module centralizes the conventional paths of an Ansible role and the
//! defaults used across the lifecycle, so that generators, the linter and the
//! orchestrator agree on where things live.

use std::path::PathBuf;

/// Role manifest, relative to the role root.
pub const MANIFEST_PATH: &str = "meta/main.yml";

/// Variables overridable by role users.
pub const DEFAULTS_PATH: &str = "defaults/main.yml";

/// Variables internal to the role.
pub const VARS_PATH: &str = "vars/main.yml";

/// Generated documentation.
pub const README_PATH: &str = "README.md";

/// Directory holding task fragments.
pub const TASKS_DIR: &str = "tasks";

/// Generated (or legacy hand-authored) aggregated task list.
pub const MAINTASK_PATH: &str = "tasks/main.yml";

/// Handlers entry point, created empty by `init`.
pub const HANDLERS_PATH: &str = "handlers/main.yml";

/// Build directory holding the lint report and archives.
pub const BUILD_DIR: &str = "dist";

/// Lint report written by `check`, relative to the build directory.
pub const REPORT_NAME: &str = "warnings.txt";

/// Archive extension produced by `package`.
pub const ARCHIVE_EXT: &str = "tgz";

/// Version written into a fresh manifest.
pub const INITIAL_VERSION: &str = "0.0.1";

/// License written into a fresh manifest.
pub const INITIAL_LICENSE: &str = "MIT";

/// Sub-directories of a conventional role.
pub const ROLE_SUBDIRS: &[&str] = &[
    "defaults",
    "files",
    "handlers",
    "meta",
    "tasks",
    "templates",
    "vars",
    "library",
];

/// Sub-directories scaffolded by `init`.
pub const INIT_SUBDIRS: &[&str] = &[
    "defaults",
    "files",
    "handlers",
    "meta",
    "tasks",
    "templates",
    "vars",
];

/// Default path exclusions: dotfiles and dot-directories.
pub const DEFAULT_EXCLUDES: &str = ".*";

/// Default warning flags: every rule.
pub const DEFAULT_WARNING_FLAGS: &str = "all";

/// Default upload timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable providing the repository URL.
pub const REPOSITORY_ENV: &str = "ANSIBLE_UNIVERSE_REPOSITORY";

/// Returns the build directory of the given role root.
pub fn build_dir(root: &std::path::Path) -> PathBuf {
    root.join(BUILD_DIR)
}
