// ============================================================================
// options.rs — Command-line arguments (CLI)
// ============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::state::Rule;

#[derive(Args, Debug, Clone, Default)]
pub struct SharedFlags {
    /// Force rebuild of the root project (and its deps with --all)
    #[arg(short = 'B', long = "rebuild")]
    pub rebuild: bool,

    /// Emit debug symbols and -DDEBUG=1; optional level (default 1)
    #[arg(short = 'D', long = "debug", value_name = "N", num_args = 0..=1, default_missing_value = "1")]
    pub debug: Option<u32>,

    /// Print commands without running them
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Verbosity level; repeatable or `-v=N`
    #[arg(short = 'v', long = "verbose", value_name = "N", num_args = 0..=1, default_missing_value = "1")]
    pub verbose: Option<u8>,

    /// Rebuild dependencies too
    #[arg(long = "all")]
    pub all: bool,

    /// Treat ambiguous sources as C++
    #[arg(long = "cpp")]
    pub cpp: bool,

    /// Scaffold/target as a library
    #[arg(long = "lib")]
    pub lib: bool,

    /// Force the targeted folder to be treated as a Lib folder
    #[arg(long = "rl", conflicts_with_all = ["rs", "rt"])]
    pub rl: bool,

    /// Force the targeted folder to be treated as a Src folder
    #[arg(long = "rs", conflicts_with_all = ["rl", "rt"])]
    pub rs: bool,

    /// Force the targeted folder to be treated as a Tool folder
    #[arg(long = "rt", conflicts_with_all = ["rl", "rs"])]
    pub rt: bool,

    /// Disable -Werror
    #[arg(short = 'w', long = "no-warn-as-error")]
    pub w_minus: bool,
}

impl SharedFlags {
    pub fn force_rule(&self) -> Option<Rule> {
        if self.rl {
            Some(Rule::Lib)
        } else if self.rs {
            Some(Rule::Src)
        } else if self.rt {
            Some(Rule::Tool)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the project (or the named targets)
    Build {
        targets: Vec<String>,
        #[command(flatten)]
        flags: SharedFlags,
    },
    /// Remove build output directories
    Clean {
        #[command(flatten)]
        flags: SharedFlags,
    },
    /// Scaffold a new project
    New {
        folder: PathBuf,
        #[command(flatten)]
        flags: SharedFlags,
    },
    /// Build, then run the resulting program(s)
    Run {
        targets: Vec<String>,
        #[command(flatten)]
        flags: SharedFlags,
        /// Arguments forwarded to the program
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Build, then run the test/ folder's tools
    Test {
        targets: Vec<String>,
        #[command(flatten)]
        flags: SharedFlags,
        #[arg(last = true)]
        args: Vec<String>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "flymake")]
#[command(about = "A Cargo-inspired project manager for C/C++ source trees", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Resolved options shared by every module downstream of the CLI; built once
/// in `main` and passed by reference, never a process-wide global.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub rebuild: bool,
    pub debug: Option<u32>,
    pub dry_run: bool,
    pub verbose: u8,
    pub all: bool,
    pub cpp: bool,
    pub lib: bool,
    pub force_rule: Option<Rule>,
    pub warn_as_error: bool,
}

impl From<&SharedFlags> for Options {
    fn from(f: &SharedFlags) -> Self {
        Options {
            rebuild: f.rebuild,
            debug: f.debug,
            dry_run: f.dry_run,
            verbose: f.verbose.unwrap_or(0),
            all: f.all,
            cpp: f.cpp,
            lib: f.lib,
            force_rule: f.force_rule(),
            warn_as_error: !f.w_minus,
        }
    }
}
