//! # CLI Command Implementations
//!
//! The command-line surface of `ansible-universe` is a single command taking
//! a list of lifecycle phases. This module holds its argument definitions and
//! the presentation of what each phase did.
//!
//! ## Structure
//!
//! - `run`: the `RunArgs` struct (phases and lifecycle options, derived using
//!   `clap`) and the `execute` function driving the
//!   `ansible_universe::lifecycle` API.
//! - `show`: rendering of the role summary printed by the `show` phase.

pub mod run;
pub mod show;
