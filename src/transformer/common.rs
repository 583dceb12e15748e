//! Helpers shared by the built-in transformers.

use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Default directory, relative to the output root, that receives the source
/// copy.
pub const DEFAULT_SOURCE_DIR: &str = "source";

/// Recursively lists files under `dir` whose extension is one of `exts`,
/// skipping anything below `excluded`. Results are sorted.
pub fn files_by_ext(dir: &Path, exts: &[&str], excluded: &[PathBuf]) -> Vec<PathBuf> {
    let excluded = excluded.to_vec();
    let mut files = Vec::new();
    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(move |entry| !excluded.iter().any(|x| entry.path().starts_with(x)))
        .build();

    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| exts.contains(&e))
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}

/// Files directly inside `dir` with one of `exts`.
pub fn files_in_dir(dir: &Path, exts: &[&str]) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| exts.contains(&e))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Lexically resolves `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `base.join(rel)` unless `rel` is already absolute, normalised.
pub fn resolve(base: &Path, rel: &str) -> PathBuf {
    let rel = Path::new(rel);
    if rel.is_absolute() {
        normalize_path(rel)
    } else {
        normalize_path(&base.join(rel))
    }
}

/// Path of `path` relative to `base`, or `path` unchanged when it is not
/// below `base`.
pub fn relative_to(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Lowercase DNS-1123 label: `[a-z0-9-]`, no leading or trailing dash, at
/// most 63 characters.
pub fn make_dns_compliant(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed: String = out.trim_matches('-').chars().take(63).collect();
    trimmed.trim_end_matches('-').to_string()
}

/// Image repository name derived from a service name.
pub fn make_image_name_compliant(name: &str) -> String {
    make_dns_compliant(name)
}
