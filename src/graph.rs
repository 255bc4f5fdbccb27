//! # Build Target Graph
//!
//! An incremental, make-like dependency engine. A [`Graph`] maps target
//! identities to [`Target`] records; each target lists its sources by
//! identity, so the graph is an explicit map rather than a web of owned
//! references, and cycles are found while walking it.
//!
//! ## Building
//!
//! [`Graph::build`] walks the sources of a target depth-first, in the order
//! they were declared, then decides whether the target itself must run:
//!
//! - a file target without action is a plain source: it is up to date if it
//!   exists and a [`Error::MissingSource`] otherwise;
//! - a file target with a [`Action::Build`] action is stale when a source was
//!   rebuilt during this run, when the artifact is missing, or when it is
//!   older than any of its file sources;
//! - [`Action::Always`] targets and phony targets run every time they are
//!   requested, but at most once per run.
//!
//! Outcomes are memoized per run, so requesting several phases sharing
//! prerequisites does the shared work once. The walk stops at the first
//! error.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::filesystem;

/// Identity of a build target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetId {
    /// A file, produced or merely consumed.
    Path(PathBuf),
    /// A named step with no artifact, e.g. a lifecycle phase.
    Phony(String),
}

impl TargetId {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        TargetId::Path(path.into())
    }

    pub fn phony(name: impl Into<String>) -> Self {
        TargetId::Phony(name.into())
    }

    fn artifact(&self) -> Option<&Path> {
        match self {
            TargetId::Path(path) => Some(path),
            TargetId::Phony(_) => None,
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Path(path) => write!(f, "{}", path.display()),
            TargetId::Phony(name) => write!(f, "{}", name),
        }
    }
}

/// Build step of a target, run with the graph's context
pub type BuildFn<C> = Box<dyn Fn(&C) -> Result<()>>;

/// What building a target does
pub enum Action<C> {
    /// Nothing: the target is a source file, or a phony grouping.
    None,
    /// Run on every request.
    Always(BuildFn<C>),
    /// Run only when the target is stale.
    Build(BuildFn<C>),
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::None => write!(f, "None"),
            Action::Always(_) => write!(f, "Always(..)"),
            Action::Build(_) => write!(f, "Build(..)"),
        }
    }
}

/// A node of the graph
#[derive(Debug)]
pub struct Target<C> {
    pub id: TargetId,
    pub sources: Vec<TargetId>,
    pub action: Action<C>,
}

impl<C> Target<C> {
    /// A pre-existing file.
    pub fn source(path: impl Into<PathBuf>) -> Self {
        Self {
            id: TargetId::path(path),
            sources: Vec::new(),
            action: Action::None,
        }
    }

    /// A file built from `sources` when stale.
    pub fn derived<F>(path: impl Into<PathBuf>, sources: Vec<TargetId>, build: F) -> Self
    where
        F: Fn(&C) -> Result<()> + 'static,
    {
        Self {
            id: TargetId::path(path),
            sources,
            action: Action::Build(Box::new(build)),
        }
    }

    /// A named step running `run` each time it is requested.
    pub fn phony<F>(name: impl Into<String>, sources: Vec<TargetId>, run: F) -> Self
    where
        F: Fn(&C) -> Result<()> + 'static,
    {
        Self {
            id: TargetId::phony(name),
            sources,
            action: Action::Always(Box::new(run)),
        }
    }
}

/// Per-run state of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unbuilt,
    Building,
    /// Built; `true` when its action ran this run.
    Built(bool),
}

/// Dependency graph of build targets over a context `C`
pub struct Graph<C> {
    targets: BTreeMap<TargetId, Target<C>>,
    states: HashMap<TargetId, State>,
}

impl<C> Default for Graph<C> {
    fn default() -> Self {
        Self {
            targets: BTreeMap::new(),
            states: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for Graph<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .field("states", &self.states)
            .finish()
    }
}

impl<C> Graph<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a target, replacing any previous one with the same identity.
    pub fn add(&mut self, target: Target<C>) {
        self.targets.insert(target.id.clone(), target);
    }

    pub fn contains(&self, id: &TargetId) -> bool {
        self.targets.contains_key(id)
    }

    pub fn get(&self, id: &TargetId) -> Option<&Target<C>> {
        self.targets.get(id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn state(&self, id: &TargetId) -> State {
        self.states.get(id).copied().unwrap_or(State::Unbuilt)
    }

    /// Forget the outcomes of the current run.
    pub fn reset(&mut self) {
        self.states.clear();
    }

    /// Build `id` and its prerequisites. Returns whether `id` was rebuilt.
    pub fn build(&mut self, id: &TargetId, context: &C) -> Result<bool> {
        let mut stack = Vec::new();
        build_node(&self.targets, &mut self.states, id, context, &mut stack)
    }
}

fn build_node<C>(
    targets: &BTreeMap<TargetId, Target<C>>,
    states: &mut HashMap<TargetId, State>,
    id: &TargetId,
    context: &C,
    stack: &mut Vec<TargetId>,
) -> Result<bool> {
    match states.get(id).copied().unwrap_or(State::Unbuilt) {
        State::Built(rebuilt) => return Ok(rebuilt),
        State::Building => return Err(cycle_error(stack, id)),
        State::Unbuilt => {}
    }

    let Some(target) = targets.get(id) else {
        // Undeclared files are plain sources.
        return match id {
            TargetId::Path(path) if path.exists() => {
                states.insert(id.clone(), State::Built(false));
                Ok(false)
            }
            TargetId::Path(_) => Err(Error::MissingSource {
                target: id.to_string(),
            }),
            TargetId::Phony(_) => Err(Error::UnknownTarget {
                target: id.to_string(),
            }),
        };
    };

    states.insert(id.clone(), State::Building);
    stack.push(id.clone());
    let outcome = build_target(targets, states, target, context, stack);
    stack.pop();

    // A failed node goes back to unbuilt so a later build retries it.
    match outcome {
        Ok(rebuilt) => {
            states.insert(id.clone(), State::Built(rebuilt));
            Ok(rebuilt)
        }
        Err(e) => {
            states.remove(id);
            Err(e)
        }
    }
}

fn build_target<C>(
    targets: &BTreeMap<TargetId, Target<C>>,
    states: &mut HashMap<TargetId, State>,
    target: &Target<C>,
    context: &C,
    stack: &mut Vec<TargetId>,
) -> Result<bool> {
    let id = &target.id;
    let mut source_rebuilt = false;
    for source in &target.sources {
        // Every source is built, even after one reported a rebuild.
        if build_node(targets, states, source, context, stack)? {
            source_rebuilt = true;
        }
    }

    let rebuilt = match &target.action {
        Action::None => match id.artifact() {
            Some(path) if !path.exists() => {
                return Err(Error::MissingSource {
                    target: id.to_string(),
                })
            }
            Some(_) => false,
            None => true,
        },
        Action::Always(run) => {
            log::debug!("{}: always built", id);
            run(context)?;
            true
        }
        Action::Build(run) => {
            if is_stale(target, source_rebuilt) {
                log::debug!("{}: stale, rebuilding", id);
                run(context)?;
                true
            } else {
                log::debug!("{}: up to date", id);
                false
            }
        }
    };
    Ok(rebuilt)
}

fn is_stale<C>(target: &Target<C>, source_rebuilt: bool) -> bool {
    if source_rebuilt {
        return true;
    }
    let Some(built) = target.id.artifact().and_then(filesystem::modified) else {
        return true;
    };
    target
        .sources
        .iter()
        .filter_map(|source| source.artifact().and_then(filesystem::modified))
        .any(|source_time| source_time > built)
}

fn cycle_error(stack: &[TargetId], id: &TargetId) -> Error {
    let start = stack.iter().position(|t| t == id).unwrap_or(0);
    let cycle = stack[start..]
        .iter()
        .chain(std::iter::once(id))
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ");
    Error::CycleDetected { cycle }
}
