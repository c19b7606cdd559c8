// ============================================================================
// state.rs — Per-project state and target parsing
// ============================================================================
//
// ProjectState is the in-memory model of one discovered project: its paths,
// its folder rules, its resolved dependency list, and the aggregated
// include/link sets the build engine and linker need. A root invocation
// owns one ProjectState; every resolved dependency owns its own, nested
// through DependencyEntry::child.
// ============================================================================

use std::path::{Path, PathBuf};

use crate::compiler::Registry;
use crate::error::{Error, Result};
use crate::locate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Lib,
    Src,
    Tool,
    Proj,
    None,
}

impl Rule {
    pub fn from_flag(s: &str) -> Option<Rule> {
        match s {
            "--rl" => Some(Rule::Lib),
            "--rs" => Some(Rule::Src),
            "--rt" => Some(Rule::Tool),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FolderEntry {
    /// Path including the project root, e.g. `<root>/src/`
    pub path: PathBuf,
    pub rule: Rule,
}

#[derive(Debug)]
pub struct DependencyEntry {
    pub name: String,
    pub requested_range: String,
    pub actual_version: String,
    pub inc_folder: Option<PathBuf>,
    pub lib_file: Option<PathBuf>,
    pub built: bool,
    pub child: Option<Box<ProjectState>>,
}

#[derive(Debug)]
pub struct ProjectState {
    pub full_path: PathBuf,
    /// Empty, or ends in a path separator: relative label under a parent project.
    pub root_rel: String,
    pub inc_folder: Option<PathBuf>,
    pub deps_folder: PathBuf,
    pub manifest_path: PathBuf,
    pub project_name: String,
    pub project_version: String,
    pub compilers: Registry,
    pub folders: Vec<FolderEntry>,
    pub deps: Vec<DependencyEntry>,
    pub aggregated_includes: Vec<String>,
    pub aggregated_libs: Vec<String>,
    pub lib_compiled: bool,
    /// True when no manifest/conventional folder was found and the root
    /// folder itself was synthesized as the single Lib folder. Simple
    /// projects are enumerated to a shallower depth than regular ones.
    pub simple_project: bool,
    /// Raw `[dependencies]` entries not yet resolved; consumed by resolver.rs
    /// once this state's own position in the recursion is known.
    pub deps_pending: Vec<(String, crate::manifest::DependencySpec)>,
}

impl ProjectState {
    pub fn new(full_path: PathBuf, project_name: String) -> Self {
        let manifest_path = full_path.join(crate::manifest::MANIFEST_FILE_NAME);
        let deps_folder = full_path.join("deps");
        ProjectState {
            full_path,
            root_rel: String::new(),
            inc_folder: None,
            deps_folder,
            manifest_path,
            project_name,
            project_version: "*".to_string(),
            compilers: Registry::default(),
            folders: Vec::new(),
            deps: Vec::new(),
            aggregated_includes: vec![".".to_string()],
            aggregated_libs: Vec::new(),
            lib_compiled: false,
            simple_project: false,
            deps_pending: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Target {
    pub original_string: String,
    pub folder: PathBuf,
    pub file: Option<String>,
    pub rule: Rule,
}

/// Parses a user-supplied target string into a folder/file/rule triple,
/// validating it resolves inside `state`'s project root.
pub fn parse_target(state: &ProjectState, user_string: &str, forced_rule: Option<Rule>) -> Result<Target> {
    let raw = Path::new(user_string);
    let full = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        state.full_path.join(raw)
    };

    let (folder, file) = if full.is_file() {
        (
            full.parent().unwrap_or(&state.full_path).to_path_buf(),
            full.file_name().map(|f| f.to_string_lossy().to_string()),
        )
    } else if full.is_dir() {
        (full.clone(), None)
    } else {
        return Err(Error::BadPath(full));
    };

    if folder.canonicalize().ok() == state.full_path.canonicalize().ok() {
        return Ok(Target {
            original_string: user_string.to_string(),
            folder,
            file,
            rule: Rule::Proj,
        });
    }

    if !locate::same_root(&state.compilers, &state.full_path, &folder) {
        return Err(Error::NotSameRoot(folder));
    }

    let rule = if let Some(forced) = forced_rule {
        forced
    } else {
        let canon_folder = folder.canonicalize().ok();
        state
            .folders
            .iter()
            .find(|f| f.path.canonicalize().ok() == canon_folder)
            .map(|f| f.rule)
            .ok_or_else(|| Error::NoRule(folder.clone()))?
    };

    Ok(Target {
        original_string: user_string.to_string(),
        folder,
        file,
        rule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parse_target_identifies_project_root() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src").join("main.c"), "").unwrap();
        let mut state = ProjectState::new(tmp.path().to_path_buf(), "demo".to_string());
        state.folders.push(FolderEntry {
            path: tmp.path().join("src"),
            rule: Rule::Src,
        });
        let target = parse_target(&state, ".", None).unwrap();
        assert_eq!(target.rule, Rule::Proj);
    }

    #[test]
    fn parse_target_uses_folder_list_rule() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src").join("main.c"), "").unwrap();
        let mut state = ProjectState::new(tmp.path().to_path_buf(), "demo".to_string());
        state.folders.push(FolderEntry {
            path: tmp.path().join("src"),
            rule: Rule::Src,
        });
        let target = parse_target(&state, "src", None).unwrap();
        assert_eq!(target.rule, Rule::Src);
    }

    #[test]
    fn parse_target_rejects_missing_path() {
        let tmp = tempfile::tempdir().unwrap();
        let state = ProjectState::new(tmp.path().to_path_buf(), "demo".to_string());
        assert!(parse_target(&state, "nope", None).is_err());
    }
}
