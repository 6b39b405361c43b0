//! Configuration for subtitle sweeps.
//!
//! Settings are read from the `[subsweep]` section of the user config file
//! (`~/.config/subtitle-sweep.toml`) and normalized into a [`SweepConfig`] snapshot.
//!
//! # Example config file section
//!
//! ```toml
//! [subsweep]
//! templates = ["%fn%.%l%.%fe%", "Subs/%any%.%fe%"]
//! extensions = [".srt", ".ass"]
//! languages = ["en|eng|english", "fr|fra|fre|french"]
//! allow_deep_match = true
//! max_depth = 2
//! destination_pattern = "%fn%.%l%.%fe%"
//! overwrite = false
//! ```

use std::{fmt, fs};

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use serde::Deserialize;

const DEFAULT_TEMPLATES: [&str; 8] = [
    "%fn%.%l%.%fe%",
    "%fn%.%fe%",
    "%fn%/%any%.%fe%",
    "Subs/%fn%.%l%.%fe%",
    "Subs/%l%.%fe%",
    "Subs/%n%_%l%.%fe%",
    "Subs/%fn%/%n%_%l%.%fe%",
    "Subs/%any%.%fe%",
];

const DEFAULT_EXTENSIONS: [&str; 7] = [".srt", ".ass", ".ssa", ".sub", ".idx", ".vtt", ".sup"];

const DEFAULT_LANGUAGES: [&str; 12] = [
    "en|eng|english",
    "fr|fra|fre|french",
    "de|deu|ger|german",
    "es|spa|spanish",
    "da|dan|danish",
    "it|ita|italian",
    "nl|nld|dut|dutch",
    "sv|swe|swedish",
    "no|nor|nob|norwegian",
    "fi|fin|finnish",
    "pt|por|portuguese",
    "ja|jpn|japanese",
];

const DEFAULT_DESTINATION_PATTERN: &str = "%fn%.%l%.%fe%";
const DEFAULT_MAX_DEPTH: usize = 2;
const DEFAULT_DEBOUNCE_SECONDS: u64 = 8;

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct SubsweepConfig {
    #[serde(default)]
    pub templates: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub allow_deep_match: Option<bool>,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub extended_language_mapping: Option<bool>,
    #[serde(default)]
    pub path_filter: Option<String>,
    #[serde(default)]
    pub name_filter: Option<String>,
    #[serde(default)]
    pub copy_to_media_folder: Option<bool>,
    #[serde(default)]
    pub move_instead_of_copy: bool,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub destination_pattern: Option<String>,
    #[serde(default)]
    pub debounce_seconds: Option<u64>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub log_file: bool,
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    subsweep: SubsweepConfig,
}

/// Configuration snapshot used for one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Subtitle location templates, tried in order.
    pub templates: Vec<String>,
    /// Accepted subtitle extensions, each starting with a dot.
    pub extensions: Vec<String>,
    /// Language synonym lines like `en|eng|english`.
    pub languages: Vec<String>,
    /// Recurse below the `Subs` directory.
    pub allow_deep_match: bool,
    /// Maximum recursion depth, 0 is unbounded.
    pub max_depth: usize,
    /// Recognize common language names when no synonym group matches.
    pub extended_language_mapping: bool,
    /// Only process videos whose path contains this text.
    pub path_filter: Option<String>,
    /// Only process videos whose name contains this text.
    pub name_filter: Option<String>,
    /// Write matched subtitles next to the video.
    pub copy_to_media_folder: bool,
    /// Move instead of copy.
    pub move_instead_of_copy: bool,
    /// Replace existing destination files.
    pub overwrite: bool,
    /// Destination file name pattern relative to the video directory.
    pub destination_pattern: String,
    /// Delay before a scan is launched after a change notification.
    pub debounce_seconds: u64,
    pub debug: bool,
    pub verbose: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            templates: to_strings(&DEFAULT_TEMPLATES),
            extensions: to_strings(&DEFAULT_EXTENSIONS),
            languages: to_strings(&DEFAULT_LANGUAGES),
            allow_deep_match: true,
            max_depth: DEFAULT_MAX_DEPTH,
            extended_language_mapping: true,
            path_filter: None,
            name_filter: None,
            copy_to_media_folder: true,
            move_instead_of_copy: false,
            overwrite: false,
            destination_pattern: DEFAULT_DESTINATION_PATTERN.to_string(),
            debounce_seconds: DEFAULT_DEBOUNCE_SECONDS,
            debug: false,
            verbose: false,
        }
    }
}

impl SubsweepConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> Result<Self> {
        let Some(path) = crate::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow!("Failed to read config file {}: {error}", path.display())),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.subsweep)
            .with_context(|| "Failed to parse config TOML")
    }
}

impl SweepConfig {
    /// Load the current configuration from the user config file.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn from_user_config() -> Result<Self> {
        let user_config = SubsweepConfig::get_user_config()?;
        Ok(Self::from_file_config(user_config))
    }

    /// Create a normalized snapshot from the config file section.
    #[must_use]
    pub fn from_file_config(user_config: SubsweepConfig) -> Self {
        let defaults = Self::default();
        let mut config = Self {
            templates: user_config.templates,
            extensions: user_config.extensions,
            languages: user_config.languages,
            allow_deep_match: user_config.allow_deep_match.unwrap_or(defaults.allow_deep_match),
            max_depth: user_config.max_depth.unwrap_or(defaults.max_depth),
            extended_language_mapping: user_config
                .extended_language_mapping
                .unwrap_or(defaults.extended_language_mapping),
            path_filter: user_config.path_filter,
            name_filter: user_config.name_filter,
            copy_to_media_folder: user_config.copy_to_media_folder.unwrap_or(defaults.copy_to_media_folder),
            move_instead_of_copy: user_config.move_instead_of_copy,
            overwrite: user_config.overwrite,
            destination_pattern: user_config.destination_pattern.unwrap_or_default(),
            debounce_seconds: user_config.debounce_seconds.unwrap_or(defaults.debounce_seconds),
            debug: user_config.debug,
            verbose: user_config.verbose,
        };
        config.normalize();
        config
    }

    /// Clean up user-edited lists.
    ///
    /// Trims and de-duplicates entries, moves extensions that look like language lines
    /// and language lines that look like extensions to the right list,
    /// and substitutes defaults for empty lists.
    pub fn normalize(&mut self) {
        let mut extensions = Vec::new();
        let mut languages = Vec::new();
        let mut moved_extensions = Vec::new();
        let mut moved_languages = Vec::new();

        for entry in &self.extensions {
            let entry = entry.trim().to_lowercase();
            if entry.is_empty() {
                continue;
            }
            if entry.contains('|') {
                moved_languages.push(entry);
            } else if entry.starts_with('.') {
                extensions.push(entry);
            } else {
                extensions.push(format!(".{entry}"));
            }
        }

        for entry in &self.languages {
            let entry = entry.trim().to_lowercase();
            if entry.is_empty() {
                continue;
            }
            if !entry.contains('|') && entry.starts_with('.') {
                moved_extensions.push(entry);
            } else {
                languages.push(entry);
            }
        }

        // Misplaced entries go after the configured ones so group order is kept.
        extensions.extend(moved_extensions);
        languages.extend(moved_languages);

        self.extensions = extensions.into_iter().filter(|e| e.len() > 1).unique().collect();
        self.languages = languages.into_iter().unique().collect();
        self.templates = self
            .templates
            .iter()
            .map(|template| template.trim().to_string())
            .filter(|template| !template.is_empty())
            .unique()
            .collect();
        self.destination_pattern = self.destination_pattern.trim().to_string();
        self.path_filter = self.path_filter.take().filter(|filter| !filter.trim().is_empty());
        self.name_filter = self.name_filter.take().filter(|filter| !filter.trim().is_empty());

        if self.templates.is_empty() {
            self.templates = to_strings(&DEFAULT_TEMPLATES);
        }
        if self.extensions.is_empty() {
            self.extensions = to_strings(&DEFAULT_EXTENSIONS);
        }
        if self.languages.is_empty() {
            self.languages = to_strings(&DEFAULT_LANGUAGES);
        }
        if self.destination_pattern.is_empty() {
            self.destination_pattern = DEFAULT_DESTINATION_PATTERN.to_string();
        }
    }
}

impl fmt::Display for SweepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config:")?;
        writeln!(f, "  templates: [{}]", self.templates.iter().join(", "))?;
        writeln!(f, "  extensions: [{}]", self.extensions.iter().join(", "))?;
        writeln!(f, "  languages: [{}]", self.languages.iter().join(", "))?;
        writeln!(f, "  allow_deep_match: {}", crate::colorize_bool(self.allow_deep_match))?;
        writeln!(f, "  max_depth: {}", self.max_depth)?;
        writeln!(
            f,
            "  extended_language_mapping: {}",
            crate::colorize_bool(self.extended_language_mapping)
        )?;
        writeln!(f, "  path_filter: {:?}", self.path_filter)?;
        writeln!(f, "  name_filter: {:?}", self.name_filter)?;
        writeln!(f, "  copy_to_media_folder: {}", crate::colorize_bool(self.copy_to_media_folder))?;
        writeln!(f, "  move_instead_of_copy: {}", crate::colorize_bool(self.move_instead_of_copy))?;
        writeln!(f, "  overwrite: {}", crate::colorize_bool(self.overwrite))?;
        writeln!(f, "  destination_pattern: {}", self.destination_pattern)?;
        write!(f, "  debounce_seconds: {}", self.debounce_seconds)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
