//! Destination naming and copy/move of matched subtitles.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

static RE_DESTINATION_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)%(fn|l|fe)%").expect("Failed to create regex pattern for destination placeholders")
});

/// What to do with a matched subtitle.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementOptions {
    /// Write the subtitle next to the video. When false, matches are only reported.
    pub copy_to_media_folder: bool,
    /// Move the source instead of copying it.
    pub move_instead_of_copy: bool,
    /// Replace an existing destination file.
    pub overwrite: bool,
}

/// Why a placement was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Destination exists and overwriting is disabled
    DestinationExists,
    /// Source already is the destination file
    AlreadyInPlace,
}

/// Result of placing a single subtitle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Subtitle was copied or moved to the destination
    Placed { destination: PathBuf, moved: bool },
    /// Dry run: subtitle would have been written
    Planned { destination: PathBuf },
    /// Discovery only, nothing is written
    Reported { destination: PathBuf },
    /// Placement was skipped
    Skipped { destination: PathBuf, reason: SkipReason },
    /// Filesystem operation failed
    Failed { destination: PathBuf, error: String },
}

impl PlacementOutcome {
    /// True if the subtitle was written, or would have been in a dry run.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Placed { .. } | Self::Planned { .. })
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        match self {
            Self::Placed { destination, .. }
            | Self::Planned { destination }
            | Self::Reported { destination }
            | Self::Skipped { destination, .. }
            | Self::Failed { destination, .. } => destination,
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DestinationExists => write!(f, "Destination already exists"),
            Self::AlreadyInPlace => write!(f, "Subtitle is already in place"),
        }
    }
}

/// Build the destination path by substituting `%fn%`, `%l%` and `%fe%` in the pattern.
///
/// Placeholders are replaced in a single pass, so inserted names are never substituted again.
///
/// The result is relative to the video directory.
///
/// ```rust
/// use std::path::Path;
/// use subtitle_sweep::subtitle::destination_path;
///
/// let path = destination_path(Path::new("/lib"), "%fn%.%l%.%fe%", "Movie", "fra", "srt");
/// assert_eq!(path, Path::new("/lib/Movie.fra.srt"));
/// ```
#[must_use]
pub fn destination_path(video_dir: &Path, pattern: &str, video_base_name: &str, language: &str, extension: &str) -> PathBuf {
    let name = RE_DESTINATION_PLACEHOLDER.replace_all(pattern, |captures: &Captures| {
        let value = match captures[1].to_lowercase().as_str() {
            "fn" => video_base_name,
            "l" => language,
            _ => extension,
        };
        value.to_string()
    });

    video_dir.join(name.replace('\\', "/"))
}

/// Place the source subtitle at the destination according to the options.
///
/// Never returns an error: failures are reported as [`PlacementOutcome::Failed`].
#[must_use]
pub fn place(source: &Path, destination: PathBuf, options: PlacementOptions, dryrun: bool) -> PlacementOutcome {
    if !options.copy_to_media_folder {
        return PlacementOutcome::Reported { destination };
    }

    if is_same_file(source, &destination) {
        return PlacementOutcome::Skipped {
            destination,
            reason: SkipReason::AlreadyInPlace,
        };
    }

    if destination.exists() && !options.overwrite {
        return PlacementOutcome::Skipped {
            destination,
            reason: SkipReason::DestinationExists,
        };
    }

    if dryrun {
        return PlacementOutcome::Planned { destination };
    }

    match write_subtitle(source, &destination, options) {
        Ok(()) => PlacementOutcome::Placed {
            destination,
            moved: options.move_instead_of_copy,
        },
        Err(error) => PlacementOutcome::Failed {
            destination,
            error: format!("{error:#}"),
        },
    }
}

fn write_subtitle(source: &Path, destination: &Path, options: PlacementOptions) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    if options.move_instead_of_copy {
        if destination.exists() {
            fs::remove_file(destination)
                .with_context(|| format!("Failed to remove existing file {}", destination.display()))?;
        }
        if fs::rename(source, destination).is_err() {
            // Rename fails across filesystems
            fs::copy(source, destination).with_context(|| format!("Failed to move {}", source.display()))?;
            fs::remove_file(source).with_context(|| format!("Failed to remove source {}", source.display()))?;
        }
    } else {
        fs::copy(source, destination).with_context(|| format!("Failed to copy {}", source.display()))?;
    }

    Ok(())
}

fn is_same_file(source: &Path, destination: &Path) -> bool {
    if source == destination {
        return true;
    }
    match (dunce::canonicalize(source), dunce::canonicalize(destination)) {
        (Ok(source), Ok(destination)) => source == destination,
        _ => false,
    }
}

#[cfg(test)]
mod placement_tests {
    use super::*;

    use tempfile::TempDir;

    const COPY: PlacementOptions = PlacementOptions {
        copy_to_media_folder: true,
        move_instead_of_copy: false,
        overwrite: false,
    };

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(path, content).expect("Failed to write test file");
    }

    #[test]
    fn destination_does_not_substitute_inside_video_name() {
        let path = destination_path(Path::new("/lib"), "%fn%.%L%.%fe%", "Odd %l% %fe% Name", "fra", "srt");
        assert_eq!(path, Path::new("/lib/Odd %l% %fe% Name.fra.srt"));
    }

    #[test]
    fn destination_substitutes_placeholders() {
        let path = destination_path(Path::new("/lib"), "Subs/%fn%/%l%.%fe%", "Movie", "eng", "ass");
        assert_eq!(path, Path::new("/lib/Subs/Movie/eng.ass"));
    }

    #[test]
    fn destination_does_not_interpret_regex() {
        let path = destination_path(Path::new("/lib"), "%fn%.%l%.%fe%", "A+B (1)", "und", "srt");
        assert_eq!(path, Path::new("/lib/A+B (1).und.srt"));
    }

    #[test]
    fn copies_subtitle() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("Subs/fra.srt");
        write(&source, "bonjour");
        let destination = temp.path().join("Movie.fra.srt");

        let outcome = place(&source, destination.clone(), COPY, false);
        assert_eq!(
            outcome,
            PlacementOutcome::Placed {
                destination: destination.clone(),
                moved: false
            }
        );
        assert!(source.exists());
        assert_eq!(fs::read_to_string(&destination).expect("read"), "bonjour");
    }

    #[test]
    fn moves_subtitle() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("Subs/fra.srt");
        write(&source, "bonjour");
        let destination = temp.path().join("Movie.fra.srt");

        let options = PlacementOptions {
            move_instead_of_copy: true,
            ..COPY
        };
        let outcome = place(&source, destination.clone(), options, false);
        assert!(outcome.is_write());
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&destination).expect("read"), "bonjour");
    }

    #[test]
    fn existing_destination_is_skipped() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("Subs/fra.srt");
        write(&source, "new");
        let destination = temp.path().join("Movie.fra.srt");
        write(&destination, "old");

        let outcome = place(&source, destination.clone(), COPY, false);
        assert_eq!(
            outcome,
            PlacementOutcome::Skipped {
                destination: destination.clone(),
                reason: SkipReason::DestinationExists
            }
        );
        assert_eq!(fs::read_to_string(&destination).expect("read"), "old");
    }

    #[test]
    fn overwrite_replaces_existing_destination() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("Subs/fra.srt");
        write(&source, "new");
        let destination = temp.path().join("Movie.fra.srt");
        write(&destination, "old");

        let options = PlacementOptions {
            overwrite: true,
            move_instead_of_copy: true,
            ..COPY
        };
        assert!(place(&source, destination.clone(), options, false).is_write());
        assert_eq!(fs::read_to_string(&destination).expect("read"), "new");
        assert!(!source.exists());
    }

    #[test]
    fn placing_twice_is_idempotent() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("Subs/eng.srt");
        write(&source, "hello");
        let destination = temp.path().join("Movie.eng.srt");

        assert!(place(&source, destination.clone(), COPY, false).is_write());
        let first = fs::read(&destination).expect("read");
        let second = place(&source, destination.clone(), COPY, false);
        assert!(!second.is_write());
        assert_eq!(fs::read(&destination).expect("read"), first);
    }

    #[test]
    fn same_file_is_never_copied_onto_itself() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("Movie.eng.srt");
        write(&source, "hello");

        let options = PlacementOptions { overwrite: true, ..COPY };
        let outcome = place(&source, source.clone(), options, false);
        assert!(matches!(
            outcome,
            PlacementOutcome::Skipped {
                reason: SkipReason::AlreadyInPlace,
                ..
            }
        ));
        assert_eq!(fs::read_to_string(&source).expect("read"), "hello");
    }

    #[test]
    fn dryrun_does_not_write() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("Subs/eng.srt");
        write(&source, "hello");
        let destination = temp.path().join("Movie.eng.srt");

        let outcome = place(&source, destination.clone(), COPY, true);
        assert_eq!(
            outcome,
            PlacementOutcome::Planned {
                destination: destination.clone()
            }
        );
        assert!(outcome.is_write());
        assert!(!destination.exists());
    }

    #[test]
    fn discovery_only_does_not_write() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("Subs/eng.srt");
        write(&source, "hello");
        let destination = temp.path().join("Movie.eng.srt");

        let options = PlacementOptions::default();
        let outcome = place(&source, destination.clone(), options, false);
        assert!(matches!(outcome, PlacementOutcome::Reported { .. }));
        assert!(!outcome.is_write());
        assert!(!destination.exists());
    }

    #[test]
    fn creates_destination_directory() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("eng.srt");
        write(&source, "hello");
        let destination = temp.path().join("Subtitles/Movie/Movie.eng.srt");

        assert!(place(&source, destination.clone(), COPY, false).is_write());
        assert!(destination.exists());
    }

    #[test]
    fn missing_source_fails_without_panic() {
        let temp = TempDir::new().expect("temp dir");
        let source = temp.path().join("missing.srt");
        let destination = temp.path().join("Movie.eng.srt");

        let outcome = place(&source, destination.clone(), COPY, false);
        assert!(matches!(outcome, PlacementOutcome::Failed { .. }));
        assert_eq!(outcome.destination(), destination);
    }
}
