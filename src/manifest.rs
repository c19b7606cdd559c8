// ============================================================================
// manifest.rs — flymake.toml loading
// ============================================================================
//
// Reads the (optional) manifest file at a project root, applies package
// identity and compiler overrides to a fresh ProjectState, and synthesizes
// the folder list from either explicit `[folders]` entries or the
// conventional src/source/lib/library/test folders that exist on disk.
// Dependency specs are handed back raw; resolver.rs turns them into
// DependencyEntry values.
// ============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::compiler::CompilerOverride;
use crate::error::{Error, Result};
use crate::state::{FolderEntry, ProjectState, Rule};

pub const MANIFEST_FILE_NAME: &str = "flymake.toml";
const DEFAULT_FOLDERS: &[&str] = &["src", "source", "lib", "library", "test"];

#[derive(Debug, Clone, Deserialize, Default)]
struct PackageTable {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependencySpec {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub inc: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ManifestFile {
    #[serde(default)]
    package: Option<PackageTable>,
    #[serde(default)]
    compiler: Option<HashMap<String, CompilerOverride>>,
    #[serde(default)]
    folders: Option<HashMap<String, String>>,
    #[serde(default)]
    dependencies: Option<HashMap<String, DependencySpec>>,
}

pub struct LoadedManifest {
    pub state: ProjectState,
    pub dependencies: Vec<(String, DependencySpec)>,
}

/// Converts a byte offset into 1-based (line, column).
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, ch) in text.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn bad_manifest(path: &Path, text: &str, err: toml::de::Error) -> Error {
    let (line, col) = err
        .span()
        .map(|span| line_col(text, span.start))
        .unwrap_or((1, 1));
    let message = err.message().to_string();
    eprintln!("{}:{}:{}: error: {}", path.display(), line, col, message);
    if let Some(src_line) = text.lines().nth(line.saturating_sub(1)) {
        eprintln!("  {}", src_line);
        eprintln!("  {}^", " ".repeat(col.saturating_sub(1)));
    }
    Error::BadManifest {
        path: path.to_path_buf(),
        line,
        col,
        message,
    }
}

fn default_project_name(full_path: &Path) -> String {
    full_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

/// Loads the manifest at `full_path` (a project root). Synthesizes defaults
/// when no manifest file is present.
pub fn load(full_path: &Path) -> Result<LoadedManifest> {
    let manifest_path = full_path.join(MANIFEST_FILE_NAME);
    let mut state = ProjectState::new(full_path.to_path_buf(), default_project_name(full_path));

    let mut explicit_folders: HashMap<String, String> = HashMap::new();
    let mut dependencies: Vec<(String, DependencySpec)> = Vec::new();

    if manifest_path.is_file() {
        let text = std::fs::read_to_string(&manifest_path).map_err(Error::Io)?;
        let parsed: ManifestFile =
            toml::from_str(&text).map_err(|e| bad_manifest(&manifest_path, &text, e))?;

        if let Some(pkg) = &parsed.package {
            if let Some(name) = &pkg.name {
                state.project_name = name.clone();
            }
            if let Some(version) = &pkg.version {
                state.project_version = version.clone();
            }
        }

        if let Some(compiler_table) = &parsed.compiler {
            for (ext_key, over) in compiler_table {
                state.compilers.apply_override(ext_key, over)?;
            }
        }

        if let Some(folders) = &parsed.folders {
            explicit_folders = folders.clone();
        }

        if let Some(deps) = parsed.dependencies {
            for (name, spec) in deps {
                if spec.version.is_some() && spec.sha.is_some() {
                    let msg = format!(
                        "dependency '{}' cannot set both `version` and `sha`",
                        name
                    );
                    eprintln!("{}: error: {}", manifest_path.display(), msg);
                    return Err(Error::Custom);
                }
                if spec.path.is_none() && spec.git.is_none() {
                    let msg = format!("dependency '{}' needs either `path` or `git`", name);
                    eprintln!("{}: error: {}", manifest_path.display(), msg);
                    return Err(Error::Custom);
                }
                dependencies.push((name, spec));
            }
        }
    }

    if !explicit_folders.is_empty() {
        for (rel, rule_str) in &explicit_folders {
            let rule = Rule::from_flag(rule_str).ok_or_else(|| {
                eprintln!(
                    "{}: error: unknown folder rule '{}' for '{}'",
                    manifest_path.display(),
                    rule_str,
                    rel
                );
                Error::Custom
            })?;
            state.folders.push(FolderEntry {
                path: full_path.join(rel),
                rule,
            });
        }
    } else {
        for name in DEFAULT_FOLDERS {
            let path = full_path.join(name);
            if path.is_dir() {
                let rule = if *name == "test" { Rule::Tool } else if *name == "src" || *name == "source" {
                    Rule::Src
                } else {
                    Rule::Lib
                };
                state.folders.push(FolderEntry { path, rule });
            }
        }
        if state.folders.is_empty() {
            // Simple project: root itself builds as a single library folder.
            state.folders.push(FolderEntry {
                path: full_path.to_path_buf(),
                rule: Rule::Lib,
            });
            state.simple_project = true;
        }
    }

    for folder in &state.folders {
        if folder.rule == Rule::Lib {
            let libname = lib_output_name(&state.project_name, folder);
            state.aggregated_libs.push(libname);
        }
    }
    if let Some(inc) = ["inc", "include"].iter().map(|n| full_path.join(n)).find(|p| p.is_dir()) {
        state.inc_folder = Some(inc.clone());
        state
            .aggregated_includes
            .push(inc.to_string_lossy().to_string());
    }

    Ok(LoadedManifest { state, dependencies })
}

/// `<folder><libname>.a`: the project name when the folder is literally
/// `lib`/`library`, otherwise the folder's own basename.
pub fn lib_output_name(project_name: &str, folder: &FolderEntry) -> String {
    let base = folder
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = if base == "lib" || base == "library" {
        project_name
    } else {
        &base
    };
    folder
        .path
        .join(format!("{}.a", stem))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_package_table_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(MANIFEST_FILE_NAME),
            "[package]\nname = \"widget\"\nversion = \"1.2.0\"\n",
        )
        .unwrap();
        let loaded = load(tmp.path()).unwrap();
        assert_eq!(loaded.state.project_name, "widget");
        assert_eq!(loaded.state.project_version, "1.2.0");
    }

    #[test]
    fn synthesizes_default_folders_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        let loaded = load(tmp.path()).unwrap();
        assert!(loaded
            .state
            .folders
            .iter()
            .any(|f| f.path.ends_with("src") && f.rule == Rule::Src));
    }

    #[test]
    fn rejects_version_and_sha_together() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(MANIFEST_FILE_NAME),
            "[dependencies.foo]\ngit = \"https://example.com/foo\"\nversion = \"1\"\nsha = \"abc\"\n",
        )
        .unwrap();
        assert!(load(tmp.path()).is_err());
    }

    #[test]
    fn bad_toml_reports_line_and_col() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE_NAME), "[package\nname = 1\n").unwrap();
        let err = load(tmp.path()).unwrap_err();
        match err {
            Error::BadManifest { line, .. } => assert_eq!(line, 1),
            other => panic!("expected BadManifest, got {:?}", other),
        }
    }
}
