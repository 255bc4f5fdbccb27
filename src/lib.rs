//! # Ansible Universe Library
//!
//! This library provides the core of the `ansible-universe` command-line
//! tool: a lifecycle manager for Ansible roles. It scaffolds a role, generates
//! its derived files from the role manifest (`meta/main.yml`), lints it,
//! packages it into a tarball and publishes it over HTTP.
//!
//! ## Quick Example
//!
//! ```no_run
//! use ansible_universe::lifecycle::{Config, Lifecycle, Phase};
//!
//! let config = Config {
//!     root: "roles/foo".into(),
//!     ..Config::default()
//! };
//! let mut lifecycle = Lifecycle::new(config).unwrap();
//! let phases = lifecycle.plan(&["init", "dist", "check"]).unwrap();
//! for event in lifecycle.run_all(&phases).unwrap() {
//!     println!("{:?}", event);
//! }
//! ```
//!
//! ## Core Concepts
//!
//! - **Role model (`role`, `manifest`)**: typed, read-on-demand accessors over
//!   the manifest, the variable files and the task fragments of a role.
//! - **Rules and linter (`rules`, `lint`)**: rules are plain records
//!   dispatched by the kind of object they inspect; the linter walks the role
//!   and collects warnings, or fails on the first one in strict mode.
//! - **Build graph (`graph`)**: a make-like target graph deciding what is
//!   stale and in which order prerequisites are built.
//! - **Generators (`generate`)**: the README and the aggregated task list.
//! - **Lifecycle (`lifecycle`)**: maps phase names (`init`, `dist`, `check`,
//!   `package`, `publish`, ...) onto the graph.
//! - **Packaging (`package`)**: tarball creation and HTTP upload.
//!
//! ## Execution Flow
//!
//! 1.  **Planning**: phase names are resolved up front; an unknown name or a
//!     `publish` without repository fails before anything runs.
//! 2.  **Assembly**: the role tree is indexed into source targets, and the
//!     derived files and phases are declared on top of them.
//! 3.  **Building**: each requested phase builds its target, running stale
//!     prerequisites once per invocation.

pub mod defaults;
pub mod error;
pub mod filesystem;
pub mod generate;
pub mod graph;
pub mod lifecycle;
pub mod lint;
pub mod manifest;
pub mod output;
pub mod package;
pub mod path;
pub mod role;
pub mod rules;

#[cfg(test)]
mod manifest_proptest;
