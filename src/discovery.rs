//! Discovery Module
//!
//! Recursively scans a project directory for script files and lints them
//! in parallel against one configuration snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::config::LintContext;
use crate::host::{lint_source, LintReport};

pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "mts", "cts"];

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "node_modules" || name.starts_with('.')
}

/// Recursively find lintable script files, sorted by path.
pub fn find_source_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry))
        .flatten()
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let lintable = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| SCRIPT_EXTENSIONS.contains(&ext));
        if lintable {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files
}

/// Lint every script file under `dir`. Unreadable files are logged and
/// skipped; reports come back sorted by path.
pub fn lint_directory(dir: &Path, ctx: &LintContext) -> Vec<LintReport> {
    let files = find_source_files(dir);

    let mut reports: Vec<LintReport> = files
        .par_iter()
        .filter_map(|path| match fs::read_to_string(path) {
            Ok(source) => Some(lint_source(&path.to_string_lossy(), &source, ctx)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read source file");
                None
            }
        })
        .collect();

    reports.sort_by(|a, b| a.file.cmp(&b.file));
    reports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("classlint-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_find_source_files_skips_vendor_and_hidden() {
        let dir = scratch_dir("find");
        fs::create_dir_all(dir.join("src/components")).unwrap();
        fs::create_dir_all(dir.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.join(".cache")).unwrap();
        fs::write(dir.join("src/components/Button.tsx"), "").unwrap();
        fs::write(dir.join("src/index.ts"), "").unwrap();
        fs::write(dir.join("src/styles.css"), "").unwrap();
        fs::write(dir.join("node_modules/pkg/index.js"), "").unwrap();
        fs::write(dir.join(".cache/tmp.js"), "").unwrap();

        let files = find_source_files(&dir);
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(&dir).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["src/components/Button.tsx", "src/index.ts"]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_lint_directory_reports_per_file() {
        let dir = scratch_dir("lint");
        fs::write(
            dir.join("a.tsx"),
            "export const A = () => <div className=\"flex flex\" />;\n",
        )
        .unwrap();
        fs::write(
            dir.join("b.tsx"),
            "export const B = () => <div className=\"flex p-4\" />;\n",
        )
        .unwrap();

        let reports = lint_directory(&dir, &LintContext::default());
        assert_eq!(reports.len(), 2);
        assert!(reports[0].file.ends_with("a.tsx"));
        assert_eq!(reports[0].diagnostics.len(), 2);
        assert!(reports[1].is_clean());

        fs::remove_dir_all(&dir).ok();
    }
}
