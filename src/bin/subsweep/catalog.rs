use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::WalkDir;

use subtitle_sweep::subtitle::{VideoCatalog, VideoItem};

const VIDEO_EXTENSIONS: [&str; 10] = ["mkv", "mp4", "avi", "m4v", "mov", "wmv", "ts", "webm", "mpg", "flv"];

/// Video files found under a library directory.
#[derive(Debug, Clone)]
pub struct LibraryCatalog {
    root: PathBuf,
}

impl LibraryCatalog {
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl VideoCatalog for LibraryCatalog {
    fn videos(&self) -> Result<Vec<VideoItem>> {
        if self.root.is_file() {
            if !is_video(&self.root) {
                anyhow::bail!("Not a video file: {}", self.root.display());
            }
            return Ok(vec![VideoItem::from_path(&self.root)?]);
        }
        if !self.root.is_dir() {
            anyhow::bail!("Library path does not exist: {}", self.root.display());
        }

        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !subtitle_sweep::is_hidden(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_video(entry.path()))
            .map(|entry| VideoItem::from_path(entry.path()))
            .collect()
    }
}

/// Check if the path has a known video file extension.
pub fn is_video(path: &Path) -> bool {
    let extension = subtitle_sweep::path_to_file_extension_string(path);
    VIDEO_EXTENSIONS.contains(&extension.as_str())
}

#[cfg(test)]
mod catalog_tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(path, "").expect("Failed to write test file");
    }

    #[test]
    fn finds_videos_recursively_in_name_order() {
        let temp = TempDir::new().expect("temp dir");
        touch(&temp.path().join("Show/Season 1/Show.S01E02.mkv"));
        touch(&temp.path().join("Show/Season 1/Show.S01E01.MP4"));
        touch(&temp.path().join("Show/Season 1/Subs/eng.srt"));
        touch(&temp.path().join("Movie/Movie.avi"));
        touch(&temp.path().join("Movie/notes.txt"));

        let videos = LibraryCatalog::new(temp.path().to_path_buf()).videos().expect("videos");
        let names: Vec<&str> = videos.iter().map(|video| video.base_name.as_str()).collect();
        assert_eq!(names, vec!["Movie", "Show.S01E01", "Show.S01E02"]);
    }

    #[test]
    fn skips_hidden_entries() {
        let temp = TempDir::new().expect("temp dir");
        touch(&temp.path().join(".trash/Old.mkv"));
        touch(&temp.path().join(".Hidden.mkv"));
        touch(&temp.path().join("Visible.mkv"));

        let videos = LibraryCatalog::new(temp.path().to_path_buf()).videos().expect("videos");
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].base_name, "Visible");
    }

    #[test]
    fn single_video_file() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("Movie.mkv");
        touch(&path);

        let videos = LibraryCatalog::new(path.clone()).videos().expect("videos");
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].path, path);
        assert_eq!(videos[0].directory, temp.path());
    }

    #[test]
    fn non_video_file_is_an_error() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("Movie.srt");
        touch(&path);
        assert!(LibraryCatalog::new(path).videos().is_err());
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = TempDir::new().expect("temp dir");
        assert!(LibraryCatalog::new(temp.path().join("missing")).videos().is_err());
    }

    #[test]
    fn video_extensions_are_case_insensitive() {
        assert!(is_video(Path::new("a/Movie.MKV")));
        assert!(is_video(Path::new("Clip.webm")));
        assert!(!is_video(Path::new("Movie.srt")));
        assert!(!is_video(Path::new("mkv")));
    }
}
