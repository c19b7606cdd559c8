// ============================================================================
// locate.rs — Project root discovery
// ============================================================================
//
// From an arbitrary file or folder path, ascend up to two parent levels
// looking for a manifest file or one of the conventional source folders.
// Falls back to treating the starting folder itself as a "simple project"
// when it directly holds compilable sources.
// ============================================================================

use std::path::{Path, PathBuf};

use crate::compiler::Registry;
use crate::error::{Error, Result};
use crate::manifest::MANIFEST_FILE_NAME;

const CONVENTIONAL_FOLDERS: &[&str] = &["src", "source", "lib", "library"];
const MAX_ASCENT: usize = 2;

/// Normalizes `input` (file, folder, relative, absolute, `~`-prefixed, or
/// empty meaning the current directory) to a folder path.
pub fn normalize_to_folder(input: &Path) -> PathBuf {
    let expanded = expand_home(input);
    let base = if expanded.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        expanded
    };
    if base.is_file() {
        base.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        base
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    path.to_path_buf()
}

fn qualifies(folder: &Path) -> bool {
    if folder.join(MANIFEST_FILE_NAME).is_file() {
        return true;
    }
    CONVENTIONAL_FOLDERS
        .iter()
        .any(|name| folder.join(name).is_dir())
}

/// Finds the project root for `input`. Returns the root folder path.
pub fn find_root(registry: &Registry, input: &Path) -> Result<PathBuf> {
    let start = normalize_to_folder(input);

    let mut candidate = start.clone();
    for level in 0..=MAX_ASCENT {
        if candidate.is_dir() && qualifies(&candidate) {
            return Ok(candidate);
        }
        if level == MAX_ASCENT {
            break;
        }
        candidate = match candidate.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => break,
        };
    }

    // Simple project: the starting folder itself has compilable sources.
    if start.is_dir() {
        let has_sources = std::fs::read_dir(&start)
            .map(|mut entries| {
                entries.any(|e| {
                    e.ok()
                        .map(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false) && registry.is_compilable(&e.path()))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false);
        if has_sources {
            return Ok(start);
        }
    }

    Err(Error::NotAProject(start))
}

/// Resolves two paths via `find_root` and compares them for equality using
/// canonicalized paths, treating an empty path as `.`.
pub fn same_root(registry: &Registry, a: &Path, b: &Path) -> bool {
    let ra = find_root(registry, a).ok().and_then(|p| p.canonicalize().ok());
    let rb = find_root(registry, b).ok().and_then(|p| p.canonicalize().ok());
    match (ra, rb) {
        (Some(ra), Some(rb)) => ra == rb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_root_via_src_folder() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src").join("main.c"), "").unwrap();
        let registry = Registry::default();
        let root = find_root(&registry, tmp.path().join("src").join("main.c").as_path()).unwrap();
        assert_eq!(root.canonicalize().unwrap(), tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn simple_project_fallback_when_no_conventional_folder() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("main.c"), "").unwrap();
        let registry = Registry::default();
        let root = find_root(&registry, tmp.path()).unwrap();
        assert_eq!(root.canonicalize().unwrap(), tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn fails_when_nothing_qualifies() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Registry::default();
        assert!(find_root(&registry, tmp.path()).is_err());
    }

    #[test]
    fn root_locate_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src").join("main.c"), "").unwrap();
        let registry = Registry::default();
        let r1 = find_root(&registry, tmp.path()).unwrap();
        let r2 = find_root(&registry, &r1).unwrap();
        assert_eq!(r1.canonicalize().unwrap(), r2.canonicalize().unwrap());
    }
}
