// ============================================================================
// resolver.rs — Dependency graph resolution
// ============================================================================
//
// Walks a project's [dependencies] table, classifying each entry as a
// prebuilt library, a sibling local-path project, or a Git repository.
// Local-path and Git dependencies recurse into their own manifests, so the
// aggregated include/lib sets propagate transitively up to the requesting
// project. A recursion stack catches cycles explicitly; the original this
// is ported from leaves that case to run away unbounded.
// ============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use semver::{Version, VersionReq};

use crate::error::{Error, Result};
use crate::manifest::{self, DependencySpec};
use crate::options::Options;
use crate::state::ProjectState;

#[derive(Debug, Clone)]
struct SeenDep {
    actual_version: String,
    inc_canon: Option<PathBuf>,
}

/// Loads the manifest at `full_path` and resolves its full dependency tree.
pub fn resolve_project(full_path: &Path, options: &Options) -> Result<ProjectState> {
    let loaded = manifest::load(full_path)?;
    let mut state = loaded.state;
    let mut seen: HashMap<String, SeenDep> = HashMap::new();
    let mut stack: Vec<String> = Vec::new();
    resolve_deps(&mut state, loaded.dependencies, &mut seen, &mut stack, options)?;
    Ok(state)
}

fn resolve_deps(
    state: &mut ProjectState,
    specs: Vec<(String, DependencySpec)>,
    seen: &mut HashMap<String, SeenDep>,
    stack: &mut Vec<String>,
    options: &Options,
) -> Result<()> {
    for (name, spec) in specs {
        let range = spec.version.clone().unwrap_or_else(|| "*".to_string());
        let is_prebuilt = spec.inc.is_some()
            && spec
                .path
                .as_ref()
                .map(|p| state.full_path.join(p).is_file())
                .unwrap_or(false);

        if let Some(prior) = seen.get(&name) {
            if is_prebuilt {
                let inc = resolve_rel(&state.full_path, spec.inc.as_deref().unwrap_or(""));
                let inc_canon = inc.canonicalize().ok();
                if inc_canon != prior.inc_canon {
                    return Err(Error::VersionConflict {
                        name: name.clone(),
                        requested: inc.display().to_string(),
                        resolved: prior
                            .inc_canon
                            .as_ref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_default(),
                    });
                }
            } else if !version_satisfies(&range, &prior.actual_version) {
                return Err(Error::VersionConflict {
                    name: name.clone(),
                    requested: range.clone(),
                    resolved: prior.actual_version.clone(),
                });
            }
            if let Some(inc) = &prior.inc_canon {
                push_unique(&mut state.aggregated_includes, inc.to_string_lossy().to_string());
            }
            continue;
        }

        if spec.version.is_some() && spec.sha.is_some() {
            return Err(Error::Custom);
        }

        let (actual_version, inc_folder, lib_file, mut child) = if is_prebuilt {
            resolve_prebuilt(state, &name, &spec)?
        } else if let Some(git_url) = &spec.git {
            resolve_git(state, &name, git_url, &spec, options)?
        } else if let Some(path) = &spec.path {
            resolve_local_path(state, &name, path, &range)?
        } else {
            return Err(Error::Custom);
        };

        if let Some(child_state) = &mut child {
            if stack.contains(&name) {
                return Err(Error::DependencyCycle(format!(
                    "{} -> {}",
                    stack.join(" -> "),
                    name
                )));
            }
            let child_specs = std::mem::take(&mut child_state.deps_pending);
            stack.push(name.clone());
            resolve_deps(child_state, child_specs, seen, stack, options)?;
            stack.pop();

            for inc in &child_state.aggregated_includes {
                push_unique(&mut state.aggregated_includes, inc.clone());
            }
            for lib in &child_state.aggregated_libs {
                push_unique(&mut state.aggregated_libs, lib.clone());
            }
        }

        if let Some(inc) = &inc_folder {
            push_unique(&mut state.aggregated_includes, inc.to_string_lossy().to_string());
        }
        if let Some(lib) = &lib_file {
            push_unique(&mut state.aggregated_libs, lib.to_string_lossy().to_string());
        }

        seen.insert(
            name.clone(),
            SeenDep {
                actual_version: actual_version.clone(),
                inc_canon: inc_folder.as_ref().and_then(|p| p.canonicalize().ok()),
            },
        );

        state.deps.push(crate::state::DependencyEntry {
            name,
            requested_range: range,
            actual_version,
            inc_folder,
            lib_file,
            built: false,
            child: child.map(Box::new),
        });
    }
    Ok(())
}

fn resolve_rel(base: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn version_satisfies(range: &str, actual: &str) -> bool {
    if range == "*" {
        return true;
    }
    let req = match VersionReq::parse(range) {
        Ok(r) => r,
        Err(_) => return true,
    };
    match Version::parse(actual) {
        Ok(v) => req.matches(&v),
        Err(_) => true,
    }
}

type Materialized = (String, Option<PathBuf>, Option<PathBuf>, Option<ProjectState>);

fn resolve_prebuilt(state: &ProjectState, name: &str, spec: &DependencySpec) -> Result<Materialized> {
    let path = spec.path.as_ref().ok_or(Error::Custom)?;
    let inc = spec.inc.as_ref().ok_or(Error::Custom)?;
    let lib_path = resolve_rel(&state.full_path, path);
    let inc_path = resolve_rel(&state.full_path, inc);
    if !lib_path.is_file() {
        return Err(Error::BadPath(lib_path));
    }
    if !inc_path.is_dir() {
        return Err(Error::BadPath(inc_path));
    }
    let _ = name;
    Ok(("*".to_string(), Some(inc_path), Some(lib_path), None))
}

fn resolve_local_path(
    state: &ProjectState,
    name: &str,
    path: &str,
    range: &str,
) -> Result<Materialized> {
    let child_root = resolve_rel(&state.full_path, path);
    if !child_root.is_dir() {
        return Err(Error::BadPath(child_root));
    }
    let loaded = manifest::load(&child_root)?;
    let mut child_state = loaded.state;
    child_state.deps_pending = loaded.dependencies;

    if !version_satisfies(range, &child_state.project_version) {
        return Err(Error::VersionConflict {
            name: name.to_string(),
            requested: range.to_string(),
            resolved: child_state.project_version.clone(),
        });
    }

    let has_lib = child_state
        .folders
        .iter()
        .any(|f| f.rule == crate::state::Rule::Lib);
    if !has_lib {
        return Err(Error::NoRule(child_root));
    }

    let lib_folder = child_state
        .folders
        .iter()
        .find(|f| f.rule == crate::state::Rule::Lib)
        .unwrap();
    let lib_file = PathBuf::from(manifest::lib_output_name(&child_state.project_name, lib_folder));
    let inc_folder = child_state.inc_folder.clone();
    let actual_version = child_state.project_version.clone();

    Ok((actual_version, inc_folder, Some(lib_file), Some(child_state)))
}

fn resolve_git(
    state: &ProjectState,
    name: &str,
    url: &str,
    spec: &DependencySpec,
    options: &Options,
) -> Result<Materialized> {
    let dest = state.deps_folder.join(name);
    let already_cloned = dest.join(".git").is_dir();

    if !already_cloned {
        std::fs::create_dir_all(&state.deps_folder).map_err(Error::Io)?;
        let mut argv = vec!["git".to_string(), "clone".to_string()];
        if let Some(branch) = &spec.branch {
            argv.push("--branch".to_string());
            argv.push(branch.clone());
        }
        argv.push(url.to_string());
        argv.push(dest.to_string_lossy().to_string());
        crate::compiler::run_command(&argv, options.verbose > 0, options.dry_run)
            .map_err(|_| Error::CloneFailed(url.to_string()))?;
    }

    if options.dry_run && !already_cloned {
        // Nothing was actually cloned; nothing further to resolve.
        return Ok((spec.version.clone().unwrap_or_else(|| "*".to_string()), None, None, None));
    }

    let mut matched_version: Option<Version> = None;
    if let Some(sha) = &spec.sha {
        checkout(&dest, sha, options)?;
    } else if let Some(range) = &spec.version {
        let (sha, version) = find_matching_commit(&dest, range)?;
        checkout(&dest, &sha, options)?;
        matched_version = Some(version);
    }

    let loaded = manifest::load(&dest)?;
    let mut child_state = loaded.state;
    child_state.deps_pending = loaded.dependencies;

    let actual_version = matched_version
        .map(|v| v.to_string())
        .unwrap_or_else(|| child_state.project_version.clone());

    let lib_folder = child_state
        .folders
        .iter()
        .find(|f| f.rule == crate::state::Rule::Lib);
    let lib_file = lib_folder
        .map(|f| PathBuf::from(manifest::lib_output_name(&child_state.project_name, f)));
    let inc_folder = child_state.inc_folder.clone();

    Ok((actual_version, inc_folder, lib_file, Some(child_state)))
}

fn checkout(dest: &Path, reference: &str, options: &Options) -> Result<()> {
    let argv = vec![
        "git".to_string(),
        "-C".to_string(),
        dest.to_string_lossy().to_string(),
        "checkout".to_string(),
        reference.to_string(),
    ];
    crate::compiler::run_command(&argv, options.verbose > 0, options.dry_run)
        .map_err(|_| Error::CloneFailed(dest.to_string_lossy().to_string()))
}

/// Scans `git log --oneline` for the first (newest) commit whose message
/// carries a `v`/`ver`/`version`-prefixed semver token satisfying `range`.
/// Returns the commit's SHA together with the matched version itself, since
/// that token — not the requested range — becomes the dependency's resolved
/// version.
fn find_matching_commit(dest: &Path, range: &str) -> Result<(String, Version)> {
    let req = VersionReq::parse(range).map_err(|_| Error::Custom)?;
    let output = Command::new("git")
        .args(["-C", &dest.to_string_lossy(), "log", "--oneline"])
        .output()
        .map_err(Error::Io)?;
    if !output.status.success() {
        return Err(Error::CloneFailed(dest.to_string_lossy().to_string()));
    }
    let text = String::from_utf8_lossy(&output.stdout);
    for line in text.lines() {
        let mut parts = line.splitn(2, ' ');
        let sha = parts.next().unwrap_or("").to_string();
        let message = parts.next().unwrap_or("");
        if let Some(version) = extract_version_token(message) {
            if req.matches(&version) {
                return Ok((sha, version));
            }
        }
    }
    Err(Error::CloneFailed(format!(
        "no commit in {} matches version range '{}'",
        dest.display(),
        range
    )))
}

fn extract_version_token(message: &str) -> Option<Version> {
    const PREFIXES: &[&str] = &["version", "ver", "v"];
    for word in message.split_whitespace() {
        for prefix in PREFIXES {
            if word.len() > prefix.len() && word[..prefix.len()].eq_ignore_ascii_case(prefix) {
                let rest = word[prefix.len()..].trim_start_matches(['.', ':', '-']);
                if let Ok(v) = Version::parse(rest) {
                    return Some(v);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_v_prefixed_token() {
        assert_eq!(
            extract_version_token("abc123 v1.3.0 release").unwrap().to_string(),
            "1.3.0"
        );
    }

    #[test]
    fn extracts_version_word_prefixed_token() {
        assert_eq!(
            extract_version_token("bump Version2.0.0").unwrap().to_string(),
            "2.0.0"
        );
    }

    #[test]
    fn no_token_returns_none() {
        assert!(extract_version_token("fix typo in readme").is_none());
    }

    #[test]
    fn star_range_always_satisfies() {
        assert!(version_satisfies("*", "9.9.9"));
    }

    #[test]
    fn caret_range_rejects_major_bump() {
        assert!(version_satisfies("1.2", "1.5.0"));
        assert!(!version_satisfies("1.2", "2.0.0"));
    }
}
