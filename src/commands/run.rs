//! # Phase Runner
//!
//! Resolves the requested phases, runs them in order against the role and
//! prints what each one did. Nothing runs when a phase name is unknown, or
//! when `publish` is requested without a repository.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use ansible_universe::defaults::{
    DEFAULT_EXCLUDES, DEFAULT_TIMEOUT_SECS, DEFAULT_WARNING_FLAGS, REPOSITORY_ENV,
};
use ansible_universe::lifecycle::{Config, Event, Lifecycle};
use ansible_universe::lint::FlagSet;
use ansible_universe::output::{emoji, format_warning, OutputConfig};
use ansible_universe::path::ExcludeSet;

use super::show;

/// Phases to run and lifecycle options
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Phases to run, in order: show, init, dist, clean (or distclean),
    /// check, package, publish.
    #[arg(value_name = "PHASE", required = true)]
    pub phases: Vec<String>,

    /// Role directory.
    #[arg(short = 'C', long, value_name = "PATH", default_value = ".")]
    pub directory: PathBuf,

    /// Comma-separated rule flags or names to check; `all` selects every
    /// rule and a leading `-` removes one (e.g. `all,-syntax`).
    #[arg(short = 'W', long, value_name = "FLAGS", default_value = DEFAULT_WARNING_FLAGS)]
    pub warnings: String,

    /// Comma-separated glob patterns of paths never indexed, generated or
    /// removed.
    #[arg(short = 'x', long, value_name = "GLOBS", default_value = DEFAULT_EXCLUDES)]
    pub exclude: String,

    /// HTTP repository receiving published archives.
    #[arg(short = 'r', long, value_name = "URL", env = REPOSITORY_ENV)]
    pub repository: Option<String>,

    /// Turn lint warnings into errors.
    #[arg(long)]
    pub strict: bool,

    /// Let `init` overwrite an existing manifest.
    #[arg(short, long)]
    pub force: bool,

    /// Upload timeout, in seconds.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl RunArgs {
    fn config(&self) -> Result<Config> {
        Ok(Config {
            root: self.directory.clone(),
            excludes: ExcludeSet::from_csv(&self.exclude)?,
            flags: FlagSet::parse(&self.warnings),
            repository: self.repository.clone(),
            strict: self.strict,
            force: self.force,
            timeout: Duration::from_secs(self.timeout),
        })
    }
}

/// Execute the requested phases.
pub fn execute(args: RunArgs, out: &OutputConfig) -> Result<()> {
    let mut lifecycle = Lifecycle::new(args.config()?)?;
    let phases = lifecycle.plan(&args.phases)?;
    let root = lifecycle.role().root().to_path_buf();

    for phase in phases {
        log::info!("phase {}", phase);
        match lifecycle.run(phase) {
            Ok(events) => {
                for event in &events {
                    print_event(out, &root, event);
                }
            }
            Err(e) => {
                // Report what the phase did before failing.
                for event in lifecycle.take_events() {
                    print_event(out, &root, &event);
                }
                return Err(e.into());
            }
        }
    }
    Ok(())
}

fn relative<'a>(root: &Path, path: &'a Path) -> std::path::Display<'a> {
    path.strip_prefix(root).unwrap_or(path).display()
}

fn print_event(out: &OutputConfig, root: &Path, event: &Event) {
    match event {
        Event::Summary(summary) => print!("{}", show::render(summary)),
        Event::Initialized(path) => println!(
            "{} Initialized role {}",
            emoji(out, "✨", "[INIT]"),
            path.display()
        ),
        Event::Generated(path) => println!(
            "{} Generated {}",
            emoji(out, "📝", "[GEN]"),
            relative(root, path)
        ),
        Event::Skipped { path, reason } => println!(
            "{} Kept {} ({})",
            emoji(out, "⏭️", "[SKIP]"),
            relative(root, path),
            reason
        ),
        Event::Removed(path) => println!(
            "{} Removed {}",
            emoji(out, "🗑️", "[RM]"),
            relative(root, path)
        ),
        Event::Checked { warnings, report } => {
            for warning in warnings {
                eprintln!("{}", format_warning(out, warning));
            }
            if warnings.is_empty() {
                println!("{} Check passed", emoji(out, "✅", "[OK]"));
            } else {
                println!(
                    "{} {} warning(s), report written to {}",
                    emoji(out, "⚠️", "[WARN]"),
                    warnings.len(),
                    relative(root, report)
                );
            }
        }
        Event::Packaged(path) => println!(
            "{} Packaged {}",
            emoji(out, "📦", "[PKG]"),
            relative(root, path)
        ),
        Event::Published(url) => {
            println!("{} Published to {}", emoji(out, "🚀", "[PUB]"), url)
        }
    }
}
