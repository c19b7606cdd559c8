// ============================================================================
// scaffold.rs — `new` command: standard project layout generation
// ============================================================================

use std::path::Path;

use crate::error::{Error, Result};
use crate::manifest::MANIFEST_FILE_NAME;

pub struct NewOptions {
    pub cpp: bool,
    pub lib: bool,
    pub all: bool,
}

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|_| Error::WriteFailed(path.to_path_buf()))?;
    }
    std::fs::write(path, contents).map_err(|_| Error::WriteFailed(path.to_path_buf()))
}

fn project_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

/// Scaffolds a new project at `folder`, creating it if necessary.
pub fn new_project(folder: &Path, opts: &NewOptions) -> Result<()> {
    std::fs::create_dir_all(folder).map_err(|_| Error::WriteFailed(folder.to_path_buf()))?;
    let name = project_name(folder);
    let (hdr_ext, src_ext) = if opts.cpp { ("hpp", "cpp") } else { ("h", "c") };
    let src_folder = if opts.lib { "lib" } else { "src" };

    write(
        &folder.join(MANIFEST_FILE_NAME),
        &manifest_template(&name, opts),
    )?;
    write(&folder.join("LICENSE.txt"), &mit_license_template(&name))?;
    write(&folder.join("README.md"), &readme_template(&name))?;
    write(
        &folder.join("inc").join(format!("{}.{}", name, hdr_ext)),
        &header_template(&name, opts.cpp),
    )?;
    write(
        &folder.join(src_folder).join(format!("{}.{}", name, src_ext)),
        &main_template(&name, opts.cpp),
    )?;
    write(
        &folder
            .join(src_folder)
            .join(format!("{}_print.{}", name, src_ext)),
        &print_template(&name, opts.cpp),
    )?;

    if opts.lib || opts.all {
        write(
            &folder.join("test").join(format!("test_{}.{}", name, src_ext)),
            &test_template(&name, opts.cpp),
        )?;
    }
    if opts.all {
        write(&folder.join("docs").join("api_guide.md"), &api_guide_template(&name))?;
    }

    Ok(())
}

fn manifest_template(name: &str, opts: &NewOptions) -> String {
    let rule = if opts.lib { "--rl" } else { "--rs" };
    let src_folder = if opts.lib { "lib" } else { "src" };
    let mut folders = format!("\"{src}/\" = \"{rule}\"\n", src = src_folder, rule = rule);
    if opts.lib || opts.all {
        folders.push_str("\"test/\" = \"--rt\"\n");
    }
    format!(
        "[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n\n[folders]\n{folders}",
        name = name,
        folders = folders,
    )
}

fn mit_license_template(name: &str) -> String {
    format!(
        "MIT License\n\nCopyright (c) {name}\n\nPermission is hereby granted, free of charge, to any person obtaining a copy\nof this software and associated documentation files, to deal in the\nSoftware without restriction, including without limitation the rights to\nuse, copy, modify, merge, publish, distribute, sublicense, and/or sell\ncopies of the Software, subject to the following conditions: the above\ncopyright notice and this permission notice shall be included in all\ncopies of the Software.\n",
        name = name,
    )
}

fn readme_template(name: &str) -> String {
    format!("# {name}\n\nBuild with `flymake build`, run with `flymake run`.\n", name = name)
}

fn header_template(name: &str, cpp: bool) -> String {
    let guard = format!("{}_H", name.to_uppercase());
    if cpp {
        format!(
            "#ifndef {guard}\n#define {guard}\n\nvoid {name}_print();\n\n#endif\n",
            guard = guard,
            name = name,
        )
    } else {
        format!(
            "#ifndef {guard}\n#define {guard}\n\nvoid {name}_print(void);\n\n#endif\n",
            guard = guard,
            name = name,
        )
    }
}

fn main_template(name: &str, cpp: bool) -> String {
    if cpp {
        format!(
            "#include \"{name}.hpp\"\n\nint main() {{\n    {name}_print();\n    return 0;\n}}\n",
            name = name,
        )
    } else {
        format!(
            "#include \"{name}.h\"\n\nint main(void) {{\n    {name}_print();\n    return 0;\n}}\n",
            name = name,
        )
    }
}

fn print_template(name: &str, cpp: bool) -> String {
    if cpp {
        format!(
            "#include <cstdio>\n#include \"{name}.hpp\"\n\nvoid {name}_print() {{\n    std::printf(\"hello {name}!\\n\");\n}}\n",
            name = name,
        )
    } else {
        format!(
            "#include <stdio.h>\n#include \"{name}.h\"\n\nvoid {name}_print(void) {{\n    printf(\"hello {name}!\\n\");\n}}\n",
            name = name,
        )
    }
}

fn test_template(name: &str, cpp: bool) -> String {
    if cpp {
        format!(
            "#include <cstdio>\n#include \"{name}.hpp\"\n\nint main() {{\n    {name}_print();\n    std::printf(\"test passed\\n\");\n    return 0;\n}}\n",
            name = name,
        )
    } else {
        format!(
            "#include <stdio.h>\n#include \"{name}.h\"\n\nint main(void) {{\n    {name}_print();\n    printf(\"test passed\\n\");\n    return 0;\n}}\n",
            name = name,
        )
    }
}

fn api_guide_template(name: &str) -> String {
    format!("# {name} API guide\n\n`{name}_print()` writes a greeting to stdout.\n", name = name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_writes_manifest_and_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("foo");
        new_project(&folder, &NewOptions { cpp: false, lib: false, all: false }).unwrap();
        assert!(folder.join(MANIFEST_FILE_NAME).is_file());
        assert!(folder.join("src").join("foo.c").is_file());
        assert!(folder.join("inc").join("foo.h").is_file());
        let main_src = std::fs::read_to_string(folder.join("src").join("foo.c")).unwrap();
        assert!(main_src.contains("foo_print"));
    }

    #[test]
    fn lib_scaffold_adds_test_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("bar");
        new_project(&folder, &NewOptions { cpp: true, lib: true, all: false }).unwrap();
        assert!(folder.join("lib").join("bar.cpp").is_file());
        assert!(folder.join("test").join("test_bar.cpp").is_file());
    }
}
