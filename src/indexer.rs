// ============================================================================
// indexer.rs — Source enumeration and tool grouping
// ============================================================================
//
// new_source_list walks a folder to a bounded depth and returns every path
// whose extension the compiler registry recognizes, sorted. new_tool_list
// groups same-folder sources into program-per-base-name "tools".
// ============================================================================

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::compiler::Registry;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Tool {
    pub name: String,
    pub sources: Vec<PathBuf>,
}

/// Sorted list of compilable source files under `folder`, recursing at most
/// `depth` levels (0 = just this folder's direct children).
pub fn new_source_list(registry: &Registry, folder: &Path, depth: usize) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        return Ok(Vec::new());
    }
    let mut out: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(depth + 1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| registry.is_compilable(p))
        .collect();
    out.sort();
    Ok(out)
}

/// Groups the direct (depth-0) sources of `folder` into tools: every source
/// sharing a basename-stem prefix with an earlier, still-unconsumed source
/// joins that source's tool.
pub fn new_tool_list(registry: &Registry, folder: &Path) -> Result<Vec<Tool>> {
    let sources = new_source_list(registry, folder, 0)?;
    let mut consumed = vec![false; sources.len()];
    let mut tools: Vec<Tool> = Vec::new();

    for i in 0..sources.len() {
        if consumed[i] {
            continue;
        }
        let stem = sources[i]
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let parent = sources[i].parent().unwrap_or(Path::new(""));
        let prefix_str = parent.join(&stem).to_string_lossy().to_string();

        let mut members = vec![sources[i].clone()];
        consumed[i] = true;
        for j in (i + 1)..sources.len() {
            if consumed[j] {
                continue;
            }
            if sources[j].to_string_lossy().starts_with(&prefix_str) {
                members.push(sources[j].clone());
                consumed[j] = true;
            }
        }
        tools.push(Tool {
            name: stem,
            sources: members,
        });
    }

    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn source_list_is_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "b.c");
        write(tmp.path(), "a.c");
        write(tmp.path(), "notes.txt");
        let registry = Registry::default();
        let list = new_source_list(&registry, tmp.path(), 0).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].ends_with("a.c"));
        assert!(list[1].ends_with("b.c"));
    }

    #[test]
    fn tool_grouping_merges_shared_stem_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "tool.c");
        write(tmp.path(), "tool_aux.c");
        write(tmp.path(), "other.cpp");
        let registry = Registry::default();
        let tools = new_tool_list(&registry, tmp.path()).unwrap();
        assert_eq!(tools.len(), 2);
        let tool = tools.iter().find(|t| t.name == "tool").unwrap();
        assert_eq!(tool.sources.len(), 2);
        let other = tools.iter().find(|t| t.name == "other").unwrap();
        assert_eq!(other.sources.len(), 1);
    }

    #[test]
    fn empty_folder_yields_empty_list_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Registry::default();
        let list = new_source_list(&registry, tmp.path(), 2).unwrap();
        assert!(list.is_empty());
    }
}
