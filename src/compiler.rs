// ============================================================================
// compiler.rs — Compiler registry and external command execution
// ============================================================================
//
// Holds the ordered list of compiler entries (one per extension group, e.g.
// ".c" or ".c++.cpp.cxx.cc.C") and turns a template string plus a set of
// arguments into an argv vector for std::process::Command. Templates are
// never handed to a shell: run_command always spawns argv[0] with discrete
// .arg() calls, so paths containing spaces never need quoting.
// ============================================================================

use std::path::Path;
use std::process::Command;

use colored::Colorize;
use serde::Deserialize;

use crate::error::{Error, Result};

const ARCHIVE_TEMPLATE: &str = "ar -crs {library} {objects}";

#[derive(Debug, Clone, Deserialize)]
pub struct CompilerOverride {
    #[serde(default)]
    pub cc: Option<String>,
    #[serde(default)]
    pub ll: Option<String>,
    #[serde(default)]
    pub cc_dbg: Option<String>,
    #[serde(default)]
    pub ll_dbg: Option<String>,
    #[serde(default)]
    pub inc: Option<String>,
    #[serde(default)]
    pub warn: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompilerEntry {
    /// Dot-prefixed, dot-joined extension list, e.g. ".c++.cpp.cxx.cc.C"
    pub extensions: String,
    pub compile_template: String,
    pub link_template: String,
    pub include_flag: String,
    pub warning_flags: String,
    pub compile_debug_flags: String,
    pub link_debug_flags: String,
}

impl CompilerEntry {
    fn matches_ext(&self, ext: &str) -> bool {
        let needle = format!(".{}.", ext);
        let haystack = format!("{}.", self.extensions);
        haystack.contains(&needle) || self.extensions.ends_with(&format!(".{}", ext))
    }

    fn merge(&mut self, over: &CompilerOverride) {
        if let Some(cc) = &over.cc {
            self.compile_template = cc.clone();
        }
        if let Some(ll) = &over.ll {
            self.link_template = ll.clone();
        }
        if let Some(cc_dbg) = &over.cc_dbg {
            self.compile_debug_flags = cc_dbg.clone();
        }
        if let Some(ll_dbg) = &over.ll_dbg {
            self.link_debug_flags = ll_dbg.clone();
        }
        if let Some(inc) = &over.inc {
            self.include_flag = inc.clone();
        }
        if let Some(warn) = &over.warn {
            self.warning_flags = warn.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<CompilerEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            entries: vec![
                CompilerEntry {
                    extensions: ".c".to_string(),
                    compile_template: "cc {in} -c {incs}{warn}{debug}-o {out}".to_string(),
                    link_template: "cc {in} {libs}{debug}-o {out}".to_string(),
                    include_flag: "-I".to_string(),
                    warning_flags: "-Wall -Werror ".to_string(),
                    compile_debug_flags: "-g -DDEBUG=1 ".to_string(),
                    link_debug_flags: "-g ".to_string(),
                },
                CompilerEntry {
                    extensions: ".c++.cpp.cxx.cc.C".to_string(),
                    compile_template: "c++ {in} -c {incs}{warn}{debug}-o {out}".to_string(),
                    link_template: "c++ {in} {libs}{debug}-o {out}".to_string(),
                    include_flag: "-I".to_string(),
                    warning_flags: "-Wall -Werror ".to_string(),
                    compile_debug_flags: "-g -DDEBUG=1 ".to_string(),
                    link_debug_flags: "-g ".to_string(),
                },
            ],
        }
    }
}

impl Registry {
    pub fn find_by_extension(&self, ext: &str) -> Option<&CompilerEntry> {
        self.entries.iter().find(|e| e.matches_ext(ext))
    }

    pub fn is_compilable(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.find_by_extension(ext).is_some())
            .unwrap_or(false)
    }

    /// Merges a `[compiler]` table entry from a manifest into the registry,
    /// adding a brand-new entry when the extension key is unknown.
    pub fn apply_override(&mut self, extensions: &str, over: &CompilerOverride) -> Result<()> {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.extensions == extensions) {
            existing.merge(over);
            return Ok(());
        }
        let cc = over.cc.clone().ok_or(Error::Custom)?;
        let ll = over.ll.clone().ok_or(Error::Custom)?;
        self.entries.push(CompilerEntry {
            extensions: extensions.to_string(),
            compile_template: cc,
            link_template: ll,
            include_flag: over.inc.clone().unwrap_or_else(|| "-I".to_string()),
            warning_flags: over.warn.clone().unwrap_or_else(|| "-Wall -Werror ".to_string()),
            compile_debug_flags: over
                .cc_dbg
                .clone()
                .unwrap_or_else(|| "-g -DDEBUG=1 ".to_string()),
            link_debug_flags: over.ll_dbg.clone().unwrap_or_else(|| "-g ".to_string()),
        });
        Ok(())
    }

    /// Turns `{in} {incs} {warn} {debug} {out}` into an argv vector.
    pub fn format_compile_argv(
        &self,
        entry: &CompilerEntry,
        source: &Path,
        includes: &[String],
        warn_as_error: bool,
        debug: Option<u32>,
        out: &Path,
    ) -> Vec<String> {
        let incs: String = includes
            .iter()
            .map(|i| format!("{}{} ", entry.include_flag, i))
            .collect();
        let warn = if warn_as_error {
            entry.warning_flags.clone()
        } else {
            entry.warning_flags.replace("-Werror", "").trim().to_string() + " "
        };
        let debug_flags = if debug.is_some() {
            entry.compile_debug_flags.clone()
        } else {
            String::new()
        };
        expand_tokens(
            &entry.compile_template,
            &[
                ("{in}", source.to_string_lossy().to_string()),
                ("{incs}", incs),
                ("{warn}", warn),
                ("{debug}", debug_flags),
                ("{out}", out.to_string_lossy().to_string()),
            ],
        )
    }

    pub fn format_link_argv(
        &self,
        entry: &CompilerEntry,
        objects: &[String],
        libs: &str,
        debug: Option<u32>,
        out: &Path,
    ) -> Vec<String> {
        let debug_flags = if debug.is_some() {
            entry.link_debug_flags.clone()
        } else {
            String::new()
        };
        expand_tokens(
            &entry.link_template,
            &[
                ("{in}", objects.join(" ")),
                ("{libs}", libs.to_string()),
                ("{debug}", debug_flags),
                ("{out}", out.to_string_lossy().to_string()),
            ],
        )
    }

    pub fn format_archive_argv(&self, objects: &[String], library: &Path) -> Vec<String> {
        expand_tokens(
            ARCHIVE_TEMPLATE,
            &[
                ("{library}", library.to_string_lossy().to_string()),
                ("{objects}", objects.join(" ")),
            ],
        )
    }
}

/// Replaces every `{token}` in `template`, then tokenizes on whitespace into
/// argv. The first whitespace-separated word becomes argv[0] (the driver).
fn expand_tokens(template: &str, subs: &[(&str, String)]) -> Vec<String> {
    let mut out = template.to_string();
    for (token, value) in subs {
        out = out.replace(token, value);
    }
    out.split_whitespace().map(|s| s.to_string()).collect()
}

/// Runs one external command (compiler, linker, archiver, git) given as an
/// already-tokenized argv. With `dry_run`, only prints. With `verbose`,
/// prints the command before running it either way.
pub fn run_command(argv: &[String], verbose: bool, dry_run: bool) -> Result<()> {
    if argv.is_empty() {
        return Ok(());
    }
    if verbose || dry_run {
        println!("{} {}", "$".dimmed(), argv.join(" "));
    }
    if dry_run {
        return Ok(());
    }
    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .map_err(Error::Io)?;
    if !status.success() {
        return Err(Error::CompilerFailed {
            command: argv.join(" "),
            status: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_c_and_cpp() {
        let r = Registry::default();
        assert!(r.find_by_extension("c").is_some());
        assert!(r.find_by_extension("cpp").is_some());
        assert!(r.find_by_extension("cc").is_some());
        assert!(r.find_by_extension("rs").is_none());
    }

    #[test]
    fn compile_template_substitutes_every_placeholder() {
        let r = Registry::default();
        let entry = r.find_by_extension("c").unwrap();
        let argv = r.format_compile_argv(
            entry,
            Path::new("src/main.c"),
            &["inc".to_string()],
            true,
            None,
            Path::new("src/out/main.o"),
        );
        assert_eq!(argv[0], "cc");
        assert!(argv.contains(&"-Iinc".to_string()));
        assert!(argv.iter().any(|a| a.contains("main.o")));
    }

    #[test]
    fn override_replaces_existing_entry_in_place() {
        let mut r = Registry::default();
        r.apply_override(
            ".c",
            &CompilerOverride {
                cc: Some("clang {in} -c {incs}{warn}{debug}-o {out}".to_string()),
                ll: None,
                cc_dbg: None,
                ll_dbg: None,
                inc: None,
                warn: None,
            },
        )
        .unwrap();
        assert_eq!(r.entries.len(), 2);
        assert!(r.entries[0].compile_template.starts_with("clang"));
    }

    #[test]
    fn warn_as_error_disabled_strips_werror() {
        let r = Registry::default();
        let entry = r.find_by_extension("c").unwrap();
        let argv = r.format_compile_argv(entry, Path::new("a.c"), &[], false, None, Path::new("a.o"));
        assert!(!argv.iter().any(|a| a.contains("-Werror")));
    }
}
