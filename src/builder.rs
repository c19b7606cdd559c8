// ============================================================================
// builder.rs — Synchronous incremental build engine
// ============================================================================
//
// Compiles, archives, and links strictly one command at a time: no thread
// pool, no job queue. Each folder's rule decides what "build this folder"
// means; staleness is always a straight source-mtime-vs-object-mtime
// comparison, never a content hash and never a header-dependency graph.
// ============================================================================

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::compiler::run_command;
use crate::error::{Error, Result};
use crate::indexer;
use crate::manifest::lib_output_name;
use crate::options::Options;
use crate::state::{FolderEntry, ProjectState, Rule};

#[derive(Debug, Default)]
pub struct BuildReport {
    pub compiled: usize,
    pub up_to_date: usize,
    /// Every archive or program produced, for the build summary line.
    pub linked: Vec<PathBuf>,
    /// Program artifacts only (Src/Tool outputs) — the subset it's
    /// meaningful to exec, as opposed to a `.a` archive.
    pub executables: Vec<PathBuf>,
}

/// Builds every dependency first (unless already built), then the project's
/// own folders in Lib, Src, Tool order.
pub fn build_project(state: &mut ProjectState, options: &Options) -> Result<BuildReport> {
    let mut report = BuildReport::default();

    for dep in &mut state.deps {
        if let Some(child) = &mut dep.child {
            if !dep.built || options.all {
                let child_opts = Options {
                    rebuild: options.all && options.rebuild,
                    all: options.all,
                    ..options.clone()
                };
                let child_report = build_project(child, &child_opts)?;
                report.compiled += child_report.compiled;
                report.up_to_date += child_report.up_to_date;
                report.linked.extend(child_report.linked);
                report.executables.extend(child_report.executables);
                dep.built = true;
            }
        }
    }

    let folders = state.folders.clone();
    for folder in folders.iter().filter(|f| f.rule == Rule::Lib) {
        build_lib(state, folder, options, &mut report)?;
    }
    for folder in folders.iter().filter(|f| f.rule == Rule::Src) {
        build_src(state, folder, options, &mut report)?;
    }
    for folder in folders.iter().filter(|f| f.rule == Rule::Tool) {
        build_tools(state, folder, None, options, &mut report)?;
    }

    if report.compiled == 0 && report.linked.is_empty() {
        println!("{}", "# Everything is up to date".dimmed());
    }

    Ok(report)
}

fn out_dir(folder: &Path) -> PathBuf {
    folder.join("out")
}

/// Source enumeration depth: shallower for simple projects, deeper otherwise.
fn enumeration_depth(state: &ProjectState) -> usize {
    if state.simple_project {
        1
    } else {
        3
    }
}

fn object_path(folder: &Path, source: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy().to_string();
    out_dir(folder).join(format!("{}.o", stem))
}

/// True when `object` is missing or not newer than `source`.
fn is_stale(source: &Path, object: &Path) -> bool {
    let src_mtime = std::fs::metadata(source).and_then(|m| m.modified()).ok();
    let obj_mtime = std::fs::metadata(object).and_then(|m| m.modified()).ok();
    match (src_mtime, obj_mtime) {
        (Some(s), Some(o)) => s >= o,
        _ => true,
    }
}

fn compile_one(state: &ProjectState, source: &Path, folder: &Path, options: &Options) -> Result<bool> {
    let object = object_path(folder, source);
    if object.exists() && !is_stale(source, &object) && !options.rebuild {
        return Ok(false);
    }
    std::fs::create_dir_all(out_dir(folder)).map_err(Error::Io)?;

    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(if options.cpp { "cpp" } else { "c" });
    let entry = state
        .compilers
        .find_by_extension(ext)
        .ok_or_else(|| Error::BadProgram(source.display().to_string()))?;

    let argv = state.compilers.format_compile_argv(
        entry,
        source,
        &state.aggregated_includes,
        options.warn_as_error,
        options.debug,
        &object,
    );
    run_command(&argv, options.verbose >= 2, options.dry_run)?;
    Ok(true)
}

fn compile_sources(
    state: &ProjectState,
    sources: &[PathBuf],
    folder: &Path,
    options: &Options,
) -> Result<(Vec<String>, bool)> {
    let mut objects = Vec::with_capacity(sources.len());
    let mut any_compiled = false;
    for source in sources {
        any_compiled |= compile_one(state, source, folder, options)?;
        objects.push(object_path(folder, source).to_string_lossy().to_string());
    }
    Ok((objects, any_compiled))
}

fn build_lib(
    state: &mut ProjectState,
    folder: &FolderEntry,
    options: &Options,
    report: &mut BuildReport,
) -> Result<()> {
    let depth = enumeration_depth(state);
    let sources = indexer::new_source_list(&state.compilers, &folder.path, depth)?;
    if sources.is_empty() {
        println!("{} no sources in {}", "[INFO]".yellow(), folder.path.display());
        return Ok(());
    }
    let (objects, any_compiled) = compile_sources(state, &sources, &folder.path, options)?;
    if any_compiled {
        report.compiled += objects.len();
    } else {
        report.up_to_date += objects.len();
    }

    let lib_path = PathBuf::from(lib_output_name(&state.project_name, folder));
    if any_compiled || !lib_path.exists() || options.rebuild {
        let argv = state.compilers.format_archive_argv(&objects, &lib_path);
        run_command(&argv, options.verbose >= 1, options.dry_run)?;
        state.lib_compiled = true;
        report.linked.push(lib_path);
    }
    Ok(())
}

fn folder_output_name(project_name: &str, folder: &Path, conventional: &[&str]) -> String {
    let base = folder.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    if conventional.contains(&base.as_str()) {
        project_name.to_string()
    } else {
        base
    }
}

fn build_src(
    state: &mut ProjectState,
    folder: &FolderEntry,
    options: &Options,
    report: &mut BuildReport,
) -> Result<()> {
    let depth = enumeration_depth(state);
    let sources = indexer::new_source_list(&state.compilers, &folder.path, depth)?;
    if sources.is_empty() {
        println!("{} no sources in {}", "[INFO]".yellow(), folder.path.display());
        return Ok(());
    }
    let (objects, any_compiled) = compile_sources(state, &sources, &folder.path, options)?;
    if any_compiled {
        report.compiled += objects.len();
    } else {
        report.up_to_date += objects.len();
    }

    let prog_name = folder_output_name(&state.project_name, &folder.path, &["src", "source"]);
    let prog_path = folder.path.join(&prog_name);
    let needs_link = any_compiled || state.lib_compiled || !prog_path.exists() || options.rebuild;
    if needs_link {
        let ext = sources[0].extension().and_then(|e| e.to_str()).unwrap_or("c");
        let entry = state
            .compilers
            .find_by_extension(ext)
            .ok_or_else(|| Error::BadProgram(prog_path.display().to_string()))?;
        let libs = state.aggregated_libs.join(" ");
        let argv = state
            .compilers
            .format_link_argv(entry, &objects, &libs, options.debug, &prog_path);
        run_command(&argv, options.verbose >= 1, options.dry_run)?;
        report.linked.push(prog_path.clone());
        report.executables.push(prog_path);
    }
    Ok(())
}

fn build_tools(
    state: &mut ProjectState,
    folder: &FolderEntry,
    only: Option<&str>,
    options: &Options,
    report: &mut BuildReport,
) -> Result<()> {
    let tools = indexer::new_tool_list(&state.compilers, &folder.path)?;
    if tools.is_empty() {
        println!("{} no sources in {}", "[INFO]".yellow(), folder.path.display());
        return Ok(());
    }
    for tool in tools.iter().filter(|t| only.map(|n| n == t.name).unwrap_or(true)) {
        let (objects, any_compiled) = compile_sources(state, &tool.sources, &folder.path, options)?;
        if any_compiled {
            report.compiled += objects.len();
        } else {
            report.up_to_date += objects.len();
        }
        let prog_path = folder.path.join(&tool.name);
        let needs_link = any_compiled || !prog_path.exists() || options.rebuild;
        if needs_link {
            let ext = tool.sources[0].extension().and_then(|e| e.to_str()).unwrap_or("c");
            let entry = state
                .compilers
                .find_by_extension(ext)
                .ok_or_else(|| Error::BadProgram(prog_path.display().to_string()))?;
            let libs = state.aggregated_libs.join(" ");
            let argv = state
                .compilers
                .format_link_argv(entry, &objects, &libs, options.debug, &prog_path);
            run_command(&argv, options.verbose >= 1, options.dry_run)?;
            report.linked.push(prog_path.clone());
            report.executables.push(prog_path);
        }
    }
    Ok(())
}

/// Builds only the named target (a single folder, or a single tool within
/// a Tool folder when `target.file` names it).
pub fn build_target(
    state: &mut ProjectState,
    target: &crate::state::Target,
    options: &Options,
) -> Result<BuildReport> {
    let mut report = BuildReport::default();
    let folder = FolderEntry {
        path: target.folder.clone(),
        rule: target.rule,
    };
    match target.rule {
        Rule::Proj => return build_project(state, options),
        Rule::Lib => build_lib(state, &folder, options, &mut report)?,
        Rule::Src => build_src(state, &folder, options, &mut report)?,
        Rule::Tool => build_tools(state, &folder, target.file.as_deref(), options, &mut report)?,
        Rule::None => return Err(Error::NoRule(target.folder.clone())),
    }
    Ok(report)
}

/// Removes every folder's `out/` tree. With `rebuild`, also removes the
/// folder's own archive/program artifact. With `all`, also removes `deps/`.
pub fn clean_project(state: &ProjectState, options: &Options) -> Result<()> {
    for folder in &state.folders {
        let out = out_dir(&folder.path);
        if out.is_dir() {
            println!("{} {}", "[CLEAN]".cyan(), out.display());
            if !options.dry_run {
                let _ = std::fs::remove_dir_all(&out);
            }
        }
        if options.rebuild {
            match folder.rule {
                Rule::Lib => {
                    let lib_path = PathBuf::from(lib_output_name(&state.project_name, folder));
                    if lib_path.is_file() && !options.dry_run {
                        let _ = std::fs::remove_file(lib_path);
                    }
                }
                Rule::Src => {
                    let prog = folder
                        .path
                        .join(folder_output_name(&state.project_name, &folder.path, &["src", "source"]));
                    if prog.is_file() && !options.dry_run {
                        let _ = std::fs::remove_file(prog);
                    }
                }
                Rule::Tool => {
                    if let Ok(tools) = indexer::new_tool_list(&state.compilers, &folder.path) {
                        for tool in tools {
                            let prog = folder.path.join(&tool.name);
                            if prog.is_file() && !options.dry_run {
                                let _ = std::fs::remove_file(prog);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
    if options.all && state.deps_folder.is_dir() && !options.dry_run {
        let _ = std::fs::remove_dir_all(&state.deps_folder);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn base_options() -> Options {
        Options {
            warn_as_error: true,
            ..Default::default()
        }
    }

    #[test]
    fn stale_check_treats_missing_object_as_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.c");
        fs::write(&src, "").unwrap();
        assert!(is_stale(&src, &tmp.path().join("a.o")));
    }

    #[test]
    fn dry_run_build_lib_reports_would_be_compiled_without_invoking_archiver() {
        let tmp = tempfile::tempdir().unwrap();
        let lib_dir = tmp.path().join("lib");
        fs::create_dir(&lib_dir).unwrap();
        fs::write(lib_dir.join("a.c"), "int a(){return 1;}").unwrap();
        let mut state = ProjectState::new(tmp.path().to_path_buf(), "demo".to_string());
        state.folders.push(FolderEntry { path: lib_dir.clone(), rule: Rule::Lib });
        let opts = Options { dry_run: true, ..base_options() };
        let mut report = BuildReport::default();
        let folder = state.folders[0].clone();
        build_lib(&mut state, &folder, &opts, &mut report).unwrap();
        assert_eq!(report.compiled, 1);
        assert!(!lib_dir.join("demo.a").exists());
    }

    #[test]
    fn up_to_date_object_is_not_recompiled() {
        let tmp = tempfile::tempdir().unwrap();
        let lib_dir = tmp.path().join("lib");
        fs::create_dir(&lib_dir).unwrap();
        let src = lib_dir.join("a.c");
        fs::write(&src, "int a(){return 1;}").unwrap();
        fs::create_dir(lib_dir.join("out")).unwrap();
        // Object written strictly after the source, so its mtime is newer.
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(lib_dir.join("out").join("a.o"), "").unwrap();

        let mut state = ProjectState::new(tmp.path().to_path_buf(), "demo".to_string());
        state.folders.push(FolderEntry { path: lib_dir.clone(), rule: Rule::Lib });
        fs::write(lib_dir.join("demo.a"), "").unwrap();
        let opts = Options { dry_run: true, ..base_options() };
        let mut report = BuildReport::default();
        let folder = state.folders[0].clone();
        build_lib(&mut state, &folder, &opts, &mut report).unwrap();
        assert_eq!(report.compiled, 0);
        assert_eq!(report.up_to_date, 1);
        assert!(report.linked.is_empty());
    }
}
