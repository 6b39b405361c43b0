//! Candidate subtitle discovery around a video file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Name of the conventional subtitle subdirectory, matched case-insensitively.
pub const SUBS_DIRECTORY: &str = "subs";

/// Search limits for candidate discovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Recurse below the `Subs` directory.
    pub deep: bool,
    /// Maximum subdirectory depth below a search root, 0 means unbounded.
    pub max_depth: usize,
}

/// Collect subtitle candidates for a video located in `video_dir`.
///
/// Files directly in the video directory are always included.
/// A `Subs` subdirectory is searched as well, recursively if deep matching is enabled.
/// Unreadable directories are silently skipped.
#[must_use]
pub fn find_candidates(video_dir: &Path, extensions: &[String], options: WalkOptions) -> BTreeSet<PathBuf> {
    let mut candidates = BTreeSet::new();
    if extensions.is_empty() {
        return candidates;
    }

    let extensions: Vec<String> = extensions.iter().map(|ext| ext.to_lowercase()).collect();

    collect_files(video_dir, &extensions, WalkOptions::default(), &mut candidates);

    for subs_dir in subs_directories(video_dir) {
        collect_files(&subs_dir, &extensions, options, &mut candidates);
    }

    candidates
}

/// Find subdirectories named `Subs` in any letter case.
fn subs_directories(video_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(video_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(SUBS_DIRECTORY))
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Collect matching files below `root`.
///
/// Files directly in `root` are at walk depth 1, so a subdirectory limit of `max_depth`
/// means files down to depth `max_depth + 1`. Unreadable entries are skipped.
fn collect_files(root: &Path, extensions: &[String], options: WalkOptions, found: &mut BTreeSet<PathBuf>) {
    let max_depth = match (options.deep, options.max_depth) {
        (false, _) => 1,
        (true, 0) => usize::MAX,
        (true, depth) => depth.saturating_add(1),
    };

    found.extend(
        WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| !entry.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| has_extension(path, extensions)),
    );
}

/// Case-insensitive suffix test against lowercase extensions.
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let name = crate::path_to_filename_string(path).to_lowercase();
    extensions.iter().any(|ext| !ext.is_empty() && name.ends_with(ext.as_str()))
}
