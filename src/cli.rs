//! CLI argument parsing and command dispatch

use anyhow::{anyhow, Result};
use clap::Parser;
use log::LevelFilter;

use ansible_universe::output::OutputConfig;

use crate::commands;

/// Ansible Universe - Ansible role build tool
///
/// Example: `mkdir foo && ansible-universe -C foo init dist check`
#[derive(Parser, Debug)]
#[command(name = "ansible-universe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    run: commands::run::RunArgs,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Disable colored output, whatever --color says
    #[arg(long)]
    no_color: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Log at debug level (shorthand for --log-level debug)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Execute the requested phases
    pub fn execute(self) -> Result<()> {
        let out = OutputConfig::from_flags(&self.color, self.no_color);
        init_logging(&self.log_level, self.verbose, &out)?;
        commands::run::execute(self.run, &out)
    }
}

fn init_logging(level: &str, verbose: bool, out: &OutputConfig) -> Result<()> {
    let filter = if verbose {
        LevelFilter::Debug
    } else {
        level
            .parse::<LevelFilter>()
            .map_err(|_| anyhow!("invalid log level '{}'", level))?
    };
    let style = if out.use_color {
        env_logger::WriteStyle::Always
    } else {
        env_logger::WriteStyle::Never
    };
    // A logger may already be installed when embedded in tests.
    let _ = env_logger::Builder::new()
        .filter_level(filter)
        .write_style(style)
        .format_timestamp(None)
        .try_init();
    Ok(())
}
