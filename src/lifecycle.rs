//! # Lifecycle Orchestrator
//!
//! Maps phase names to targets of the build graph and runs them.
//!
//! ```text
//! publish -> package (dist/<name>-<version>.tgz) -> check -> dist -> indexed files
//!                                                               \-> README.md
//!                                                               \-> tasks/main.yml
//! show, init, clean: independent
//! ```
//!
//! The graph is assembled on first use and shared by every phase of the
//! invocation, so `dist check package` generates the role files once. A
//! phase reshaping the role tree (`init`, `clean`) discards it; the next phase
//! needing it assembles a fresh one from what is then on disk.
//!
//! Phases report what they did as [`Event`]s instead of printing, leaving
//! presentation to the caller.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::defaults::{
    build_dir, BUILD_DIR, DEFAULTS_PATH, DEFAULT_TIMEOUT_SECS, HANDLERS_PATH, INIT_SUBDIRS,
    MAINTASK_PATH, MANIFEST_PATH, README_PATH, REPORT_NAME, TASKS_DIR, VARS_PATH,
};
use crate::error::{Error, Result};
use crate::filesystem;
use crate::generate;
use crate::graph::{Graph, Target, TargetId};
use crate::lint::{report_text, FlagSet, Linter, Warning};
use crate::manifest::{Manifest, Platform};
use crate::package;
use crate::path::ExcludeSet;
use crate::role::{Role, Variable};

/// A lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Show,
    Init,
    Dist,
    Clean,
    Check,
    Package,
    Publish,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Show,
        Phase::Init,
        Phase::Dist,
        Phase::Clean,
        Phase::Check,
        Phase::Package,
        Phase::Publish,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Show => "show",
            Phase::Init => "init",
            Phase::Dist => "dist",
            Phase::Clean => "clean",
            Phase::Check => "check",
            Phase::Package => "package",
            Phase::Publish => "publish",
        }
    }

    /// Everything but `init` reads the manifest.
    pub fn needs_manifest(&self) -> bool {
        !matches!(self, Phase::Init)
    }

    fn reshapes_tree(&self) -> bool {
        matches!(self, Phase::Init | Phase::Clean)
    }

    fn target(&self) -> TargetId {
        TargetId::phony(self.name())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Phase {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        if name == "distclean" {
            return Ok(Phase::Clean);
        }
        Phase::ALL
            .into_iter()
            .find(|phase| phase.name() == name)
            .ok_or_else(|| Error::UnknownPhase {
                name: name.to_string(),
                expected: Phase::ALL
                    .iter()
                    .map(Phase::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Settings of one invocation
#[derive(Debug, Clone)]
pub struct Config {
    /// Role directory.
    pub root: PathBuf,
    pub excludes: ExcludeSet,
    pub flags: FlagSet,
    /// Upload URL for `publish`.
    pub repository: Option<String>,
    /// Turn the first lint warning into an error.
    pub strict: bool,
    /// Let `init` overwrite an existing manifest.
    pub force: bool,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            excludes: ExcludeSet::default(),
            flags: FlagSet::all(),
            repository: None,
            strict: false,
            force: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Role attributes displayed by `show`
#[derive(Debug, Clone)]
pub struct RoleSummary {
    pub name: String,
    pub version: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub min_ansible_version: Option<String>,
    pub prefix: String,
    pub platforms: Vec<Platform>,
    pub dependencies: Vec<String>,
    pub variables: BTreeMap<String, Variable>,
}

impl RoleSummary {
    fn from_role(role: &Role, manifest: &Manifest) -> Result<Self> {
        let galaxy = manifest.galaxy_info.clone().unwrap_or_default();
        Ok(Self {
            name: role.name().to_string(),
            version: manifest.version.clone(),
            author: galaxy.author,
            description: galaxy.description,
            license: galaxy.license,
            min_ansible_version: galaxy.min_ansible_version,
            prefix: role.prefix()?,
            platforms: galaxy.platforms.unwrap_or_default(),
            dependencies: manifest.dependency_ids(),
            variables: role.variables()?,
        })
    }
}

/// Something a phase did
#[derive(Debug, Clone)]
pub enum Event {
    Summary(Box<RoleSummary>),
    Initialized(PathBuf),
    Generated(PathBuf),
    Skipped { path: PathBuf, reason: String },
    Removed(PathBuf),
    Checked { warnings: Vec<Warning>, report: PathBuf },
    Packaged(PathBuf),
    Published(Url),
}

/// State shared by the actions of the graph
#[derive(Debug)]
pub struct Context {
    role: Role,
    config: Config,
    events: RefCell<Vec<Event>>,
}

impl Context {
    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn emit(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn drain(&self) -> Vec<Event> {
        self.events.borrow_mut().drain(..).collect()
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.config.excludes.is_excluded(Path::new(relative))
    }
}

/// Runs phases against one role
#[derive(Debug)]
pub struct Lifecycle {
    context: Context,
    graph: Option<Graph<Context>>,
}

impl Lifecycle {
    pub fn new(config: Config) -> Result<Self> {
        let role = Role::open(&config.root)?;
        log::debug!("role '{}' at {}", role.name(), role.root().display());
        Ok(Self {
            context: Context {
                role,
                config,
                events: RefCell::new(Vec::new()),
            },
            graph: None,
        })
    }

    pub fn role(&self) -> &Role {
        &self.context.role
    }

    /// Resolve phase names, rejecting the whole request before anything runs
    /// if a name is unknown or `publish` has nowhere to go.
    pub fn plan<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Phase>> {
        let phases = names
            .iter()
            .map(|name| name.as_ref().parse::<Phase>())
            .collect::<Result<Vec<Phase>>>()?;
        if phases.contains(&Phase::Publish) {
            match self.context.config.repository.as_deref() {
                Some(url) if !url.trim().is_empty() => {
                    package::repository_url(url)?;
                }
                _ => return Err(Error::NoRepository),
            }
        }
        Ok(phases)
    }

    /// Run one phase, and its prerequisites when not yet built.
    ///
    /// When the phase fails, the events emitted before the error stay
    /// pending: [`Lifecycle::take_events`] returns them.
    pub fn run(&mut self, phase: Phase) -> Result<Vec<Event>> {
        log::debug!("running phase {}", phase);
        if phase.needs_manifest() && !self.context.role.has_manifest() {
            return Err(Error::ManifestNotFound {
                path: self.context.role.manifest_path(),
            });
        }

        let mut graph = match self.graph.take() {
            Some(graph) => graph,
            None => assemble(&self.context)?,
        };
        let result = graph.build(&phase.target(), &self.context);
        if !phase.reshapes_tree() {
            self.graph = Some(graph);
        }

        result?;
        Ok(self.context.drain())
    }

    /// Events emitted by a phase that failed, oldest first.
    pub fn take_events(&mut self) -> Vec<Event> {
        self.context.drain()
    }

    /// Run phases in order, collecting their events.
    pub fn run_all(&mut self, phases: &[Phase]) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for phase in phases {
            events.extend(self.run(*phase)?);
        }
        Ok(events)
    }
}

/// Build the target graph from the role tree as it is now.
fn assemble(context: &Context) -> Result<Graph<Context>> {
    let role = &context.role;
    let root = role.root();
    let mut graph = Graph::new();

    graph.add(Target::phony(Phase::Show.name(), vec![], show));
    graph.add(Target::phony(Phase::Init.name(), vec![], init));
    graph.add(Target::phony(Phase::Clean.name(), vec![], clean));

    let derived = [README_PATH, MAINTASK_PATH];
    let indexed: Vec<PathBuf> = filesystem::scan(root, &context.config.excludes, &[BUILD_DIR])?
        .into_iter()
        .filter(|relative| !derived.iter().any(|d| relative == Path::new(d)))
        .collect();
    log::debug!("indexed {} files", indexed.len());

    let mut dist_sources = Vec::new();
    for relative in &indexed {
        let id = TargetId::path(root.join(relative));
        graph.add(Target::source(root.join(relative)));
        dist_sources.push(id);
    }

    let manifest = TargetId::path(role.path(MANIFEST_PATH));
    let under = |dir: &str| -> Vec<TargetId> {
        indexed
            .iter()
            .filter(|relative| relative.starts_with(dir))
            .map(|relative| TargetId::path(root.join(relative)))
            .collect()
    };

    if context.is_excluded(README_PATH) {
        log::debug!("{} is excluded, not generated", README_PATH);
    } else {
        let mut sources = Vec::new();
        for dir in [parent_dir(DEFAULTS_PATH), parent_dir(VARS_PATH)] {
            sources.extend(under(dir));
            // Removing a variables file only touches the directory.
            let path = role.path(dir);
            if path.is_dir() {
                sources.push(TargetId::path(path));
            }
        }
        sources.push(manifest.clone());
        let readme = role.path(README_PATH);
        graph.add(Target::derived(&readme, sources, |ctx: &Context| {
            generate::write_readme(&ctx.role)?;
            ctx.emit(Event::Generated(ctx.role.path(README_PATH)));
            Ok(())
        }));
        dist_sources.push(TargetId::path(readme));
    }

    if context.is_excluded(MAINTASK_PATH) {
        log::debug!("{} is excluded, not generated", MAINTASK_PATH);
    } else {
        let mut sources = under(TASKS_DIR);
        let tasks_dir = role.path(TASKS_DIR);
        // Removing a fragment only touches the directory.
        if tasks_dir.is_dir() {
            sources.push(TargetId::path(tasks_dir));
        }
        sources.push(manifest);
        let maintask = role.path(MAINTASK_PATH);
        graph.add(Target::derived(&maintask, sources, |ctx: &Context| {
            generate::write_aggregate_tasks(&ctx.role)?;
            ctx.emit(Event::Generated(ctx.role.path(MAINTASK_PATH)));
            Ok(())
        }));
        dist_sources.push(TargetId::path(maintask));
    }

    graph.add(Target::phony(Phase::Dist.name(), dist_sources, |_: &Context| Ok(())));
    graph.add(Target::phony(
        Phase::Check.name(),
        vec![Phase::Dist.target()],
        check,
    ));

    // Without a version there is no archive name: packaging fails, earlier
    // phases still work.
    match role.version() {
        Ok(version) => {
            let archive = package::archive_path(root, role.name(), &version);
            let build = archive.clone();
            graph.add(Target::derived(
                &archive,
                vec![Phase::Check.target()],
                move |ctx: &Context| create_package(ctx, &build),
            ));
            graph.add(Target::phony(
                Phase::Package.name(),
                vec![TargetId::path(&archive)],
                |_: &Context| Ok(()),
            ));
            graph.add(Target::phony(
                Phase::Publish.name(),
                vec![Phase::Package.target()],
                move |ctx: &Context| publish(ctx, &archive),
            ));
        }
        Err(e) => {
            log::debug!("no archive target: {}", e);
            for phase in [Phase::Package, Phase::Publish] {
                graph.add(Target::phony(
                    phase.name(),
                    vec![Phase::Check.target()],
                    |ctx: &Context| ctx.role.version().map(|_| ()),
                ));
            }
        }
    }

    Ok(graph)
}

fn parent_dir(path: &str) -> &str {
    path.split('/').next().unwrap_or(path)
}

fn show(ctx: &Context) -> Result<()> {
    let manifest = ctx.role.manifest()?;
    let summary = RoleSummary::from_role(&ctx.role, &manifest)?;
    ctx.emit(Event::Summary(Box::new(summary)));
    Ok(())
}

fn init(ctx: &Context) -> Result<()> {
    let role = &ctx.role;
    if role.has_manifest() && !ctx.config.force {
        return Err(Error::ManifestExists {
            path: role.manifest_path(),
        });
    }

    for dir in INIT_SUBDIRS {
        let path = role.path(dir);
        if !path.is_dir() {
            log::info!("creating {}", path.display());
            fs::create_dir_all(&path).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", path.display(), e),
            })?;
        }
    }
    for file in [DEFAULTS_PATH, HANDLERS_PATH] {
        let path = role.path(file);
        if !path.exists() {
            filesystem::write_file(&path, "---\n")?;
        }
    }
    role.write_manifest(&Manifest::initial())?;

    ctx.emit(Event::Initialized(role.root().to_path_buf()));
    Ok(())
}

/// Remove generated files: `README.md`, `tasks/main.yml` unless
/// hand-authored, the build directory and the `*.retry` files
/// `ansible-playbook` leaves at the role root. Hidden files are never
/// removed.
fn clean(ctx: &Context) -> Result<()> {
    let role = &ctx.role;
    let mut candidates = vec![README_PATH.to_string()];
    if role.is_legacy() {
        ctx.emit(Event::Skipped {
            path: role.path(MAINTASK_PATH),
            reason: "hand-authored".to_string(),
        });
    } else {
        candidates.push(MAINTASK_PATH.to_string());
    }
    candidates.push(BUILD_DIR.to_string());

    for entry in fs::read_dir(role.root())? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.ends_with(".retry") {
            candidates.push(name);
        }
    }

    for relative in candidates {
        let path = role.path(&relative);
        if ctx.is_excluded(&relative) {
            if path.exists() {
                ctx.emit(Event::Skipped {
                    path,
                    reason: "excluded".to_string(),
                });
            }
            continue;
        }
        if filesystem::remove(&path)? {
            ctx.emit(Event::Removed(path));
        }
    }
    Ok(())
}

fn check(ctx: &Context) -> Result<()> {
    let linter = Linter::new(ctx.config.flags.clone(), ctx.config.excludes.clone())
        .strict(ctx.config.strict);
    let warnings = linter.check(&ctx.role)?;
    log::info!("{} warnings", warnings.len());

    let report = build_dir(ctx.role.root()).join(REPORT_NAME);
    filesystem::write_file(&report, &report_text(&warnings))?;
    ctx.emit(Event::Checked { warnings, report });
    Ok(())
}

fn create_package(ctx: &Context, archive: &Path) -> Result<()> {
    let root = ctx.role.root();
    let files = filesystem::scan(root, &ctx.config.excludes, &[BUILD_DIR])?;
    package::create_archive(root, ctx.role.name(), &files, archive)?;
    ctx.emit(Event::Packaged(archive.to_path_buf()));
    Ok(())
}

fn publish(ctx: &Context, archive: &Path) -> Result<()> {
    let repository = ctx
        .config
        .repository
        .as_deref()
        .ok_or(Error::NoRepository)?;
    let url = package::upload(archive, repository, ctx.config.timeout)?;
    ctx.emit(Event::Published(url));
    Ok(())
}
