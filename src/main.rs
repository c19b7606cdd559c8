// ============================================================================
// main.rs — flymake CLI entry point
// ============================================================================

mod builder;
mod compiler;
mod error;
mod indexer;
mod locate;
mod manifest;
mod options;
mod resolver;
mod scaffold;
mod state;

use std::path::PathBuf;
use std::process::{Command, ExitCode};

use clap::Parser;
use colored::Colorize;

use error::{Error, Result};
use options::{Cli, Command as Cmd, Options, SharedFlags};
use state::{parse_target, ProjectState};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.already_reported() {
                eprintln!("{} {}", "[ERROR]".red(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Cmd::Build {
        targets: Vec::new(),
        flags: SharedFlags::default(),
    });
    match command {
        Cmd::Build { targets, flags } => cmd_build(&targets, &flags),
        Cmd::Clean { flags } => cmd_clean(&flags),
        Cmd::New { folder, flags } => cmd_new(&folder, &flags),
        Cmd::Run { targets, flags, args } => cmd_run(&targets, &flags, &args, false),
        Cmd::Test { targets, flags, args } => cmd_run(&targets, &flags, &args, true),
    }
}

fn discover(flags: &SharedFlags) -> Result<(ProjectState, Options)> {
    let options: Options = flags.into();
    let registry = compiler::Registry::default();
    let here = std::env::current_dir().map_err(Error::Io)?;
    let root = locate::find_root(&registry, &here)?;
    let state = resolver::resolve_project(&root, &options)?;
    Ok((state, options))
}

fn cmd_build(targets: &[String], flags: &SharedFlags) -> Result<()> {
    let (mut state, options) = discover(flags)?;
    let report = if targets.is_empty() {
        builder::build_project(&mut state, &options)?
    } else {
        run_named_targets(&mut state, targets, &options)?
    };
    print_summary(&report);
    Ok(())
}

fn run_named_targets(
    state: &mut ProjectState,
    targets: &[String],
    options: &Options,
) -> Result<builder::BuildReport> {
    let mut total = builder::BuildReport::default();
    for t in targets {
        let target = parse_target(state, t, options.force_rule)?;
        let report = builder::build_target(state, &target, options)?;
        total.compiled += report.compiled;
        total.up_to_date += report.up_to_date;
        total.linked.extend(report.linked);
        total.executables.extend(report.executables);
    }
    Ok(total)
}

fn print_summary(report: &builder::BuildReport) {
    println!(
        "{} {} compiled, {} up to date, {} linked",
        "[DONE]".green(),
        report.compiled,
        report.up_to_date,
        report.linked.len()
    );
}

fn cmd_clean(flags: &SharedFlags) -> Result<()> {
    let (state, options) = discover(flags)?;
    builder::clean_project(&state, &options)?;
    println!("{}", "[CLEAN] done.".cyan());
    Ok(())
}

fn cmd_new(folder: &PathBuf, flags: &SharedFlags) -> Result<()> {
    let opts = scaffold::NewOptions {
        cpp: flags.cpp,
        lib: flags.lib,
        all: flags.all,
    };
    scaffold::new_project(folder, &opts)?;
    println!("{} {}", "[NEW]".green(), folder.display());
    Ok(())
}

fn cmd_run(targets: &[String], flags: &SharedFlags, args: &[String], test_only: bool) -> Result<()> {
    let (mut state, options) = discover(flags)?;

    let report = if test_only {
        let test_folder_path = state
            .folders
            .iter()
            .find(|f| f.path.file_name().map(|n| n == "test").unwrap_or(false))
            .map(|f| f.path.clone())
            .ok_or_else(|| Error::NoRule(state.full_path.join("test")))?;
        // Build the whole project (libs and dependencies first) so the
        // test folder's tools have something to link against, then only
        // run the artifacts that landed under test/.
        let mut report = builder::build_project(&mut state, &options)?;
        report.executables.retain(|p| p.starts_with(&test_folder_path));
        report
    } else if targets.is_empty() {
        builder::build_project(&mut state, &options)?
    } else {
        run_named_targets(&mut state, targets, &options)?
    };
    print_summary(&report);

    for program in &report.executables {
        if program.is_file() {
            println!("{} {}", "[RUN]".green(), program.display());
            if !options.dry_run {
                let status = Command::new(program).args(args).status().map_err(Error::Io)?;
                if !status.success() {
                    return Err(Error::CompilerFailed {
                        command: program.display().to_string(),
                        status: status.code().unwrap_or(-1),
                    });
                }
            }
        }
    }
    Ok(())
}
