//! Subtitle sweep over a collection of videos.

use std::fmt;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::subtitle::config::SweepConfig;
use crate::subtitle::language::LanguageResolver;
use crate::subtitle::placement::{self, PlacementOptions, PlacementOutcome};
use crate::subtitle::related::is_related;
use crate::subtitle::template::{MatchContext, Template, TemplateMatcher, normalize_separators};
use crate::subtitle::walker::{self, WalkOptions};
use crate::{print_error, print_warning};

/// A video file known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoItem {
    /// Absolute path to the video file.
    pub path: PathBuf,
    /// Directory containing the video.
    pub directory: PathBuf,
    /// File name without extension.
    pub base_name: String,
    /// Human-readable name used for name filtering.
    pub display_name: String,
}

/// Source of the videos to sweep.
pub trait VideoCatalog {
    /// List all known videos.
    ///
    /// # Errors
    /// Returns an error if the catalog cannot be read.
    fn videos(&self) -> Result<Vec<VideoItem>>;
}

/// Provides the live configuration for a sweep.
pub trait ConfigSource {
    /// Read the current configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded.
    fn current_config(&self) -> Result<SweepConfig>;
}

/// The `[subsweep]` section of the user config file.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserConfigFile;

impl ConfigSource for UserConfigFile {
    fn current_config(&self) -> Result<SweepConfig> {
        SweepConfig::from_user_config()
    }
}

/// Counts from a single sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub items_visited: usize,
    pub sub_candidates: usize,
    pub matches: usize,
    pub writes_or_planned: usize,
    pub failures: usize,
    pub cancelled: bool,
}

/// Runs the discover, classify, decide, and place steps for each video.
#[derive(Debug)]
pub struct SubtitleSweep<'a> {
    config: &'a SweepConfig,
    resolver: LanguageResolver,
    templates: Vec<Template>,
    dryrun: bool,
}

impl VideoItem {
    /// Create a video item from a video file path.
    ///
    /// # Errors
    /// Returns an error if the path has no parent directory or file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let directory = path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {}", path.display()))?
            .to_path_buf();
        let (base_name, _) = crate::get_normalized_file_name_and_extension(path)?;
        let display_name = base_name.replace(['.', '_'], " ").trim().to_string();

        Ok(Self {
            path: path.to_path_buf(),
            directory,
            base_name,
            display_name,
        })
    }
}

impl AddAssign for ScanReport {
    fn add_assign(&mut self, other: Self) {
        self.items_visited += other.items_visited;
        self.sub_candidates += other.sub_candidates;
        self.matches += other.matches;
        self.writes_or_planned += other.writes_or_planned;
        self.failures += other.failures;
        self.cancelled |= other.cancelled;
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Visited {} video(s), examined {} candidate(s), found {} match(es), {} written",
            self.items_visited, self.sub_candidates, self.matches, self.writes_or_planned
        )?;
        if self.failures > 0 {
            write!(f, ", {} failed", self.failures)?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

impl<'a> SubtitleSweep<'a> {
    /// Prepare a sweep: load language groups and parse templates.
    ///
    /// Templates that fail to parse are reported and left out.
    #[must_use]
    pub fn new(config: &'a SweepConfig, dryrun: bool) -> Self {
        let resolver = LanguageResolver::new(&config.languages, config.extended_language_mapping);
        let templates = config
            .templates
            .iter()
            .filter_map(|template| match Template::parse(template) {
                Ok(template) => Some(template),
                Err(error) => {
                    print_warning!("Ignoring template '{template}': {error}");
                    None
                }
            })
            .collect();

        Self {
            config,
            resolver,
            templates,
            dryrun,
        }
    }

    /// Sweep all given videos.
    ///
    /// The abort flag is checked before each video.
    /// When set, the sweep stops and returns the counts so far.
    pub fn run(&self, videos: &[VideoItem], abort_flag: &AtomicBool) -> ScanReport {
        let mut report = ScanReport::default();

        for video in videos.iter().filter(|video| self.should_include(video)) {
            if abort_flag.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }
            report += self.process_video(video);
        }

        report
    }

    /// Check that the video still exists and passes the path and name filters.
    fn should_include(&self, video: &VideoItem) -> bool {
        if !video.path.is_file() {
            return false;
        }
        if let Some(filter) = &self.config.path_filter {
            let path = crate::path_to_string(&video.path).to_lowercase();
            if !path.contains(&filter.to_lowercase()) {
                return false;
            }
        }
        if let Some(filter) = &self.config.name_filter
            && !video.display_name.to_lowercase().contains(&filter.to_lowercase())
        {
            return false;
        }
        true
    }

    fn process_video(&self, video: &VideoItem) -> ScanReport {
        let mut report = ScanReport {
            items_visited: 1,
            ..ScanReport::default()
        };

        let options = WalkOptions {
            deep: self.config.allow_deep_match,
            max_depth: self.config.max_depth,
        };
        let candidates = walker::find_candidates(&video.directory, &self.config.extensions, options);

        for candidate in candidates.iter().filter(|candidate| **candidate != video.path) {
            report.sub_candidates += 1;

            let file_name = crate::path_to_filename_string(candidate);
            let relative_path = normalize_separators(&crate::get_relative_path_or_filename(candidate, &video.directory));
            let extension = crate::os_str_to_string(candidate.extension().unwrap_or_default());
            let language = self.resolver.detect(&file_name);

            let context = MatchContext {
                video_base_name: &video.base_name,
                extension: &extension,
                language: self.resolver.find_group(&file_name),
                language_code: &language,
            };

            if !self.is_match(&context, &relative_path, &file_name) {
                continue;
            }
            report.matches += 1;

            let destination = placement::destination_path(
                &video.directory,
                &self.config.destination_pattern,
                &video.base_name,
                &language,
                &extension,
            );
            let outcome = placement::place(candidate, destination, self.placement_options(), self.dryrun);
            self.print_outcome(&relative_path, &outcome);

            if outcome.is_write() {
                report.writes_or_planned += 1;
            } else if matches!(outcome, PlacementOutcome::Failed { .. }) {
                report.failures += 1;
            }
        }

        report
    }

    /// A candidate matches if any template hits or it shares a token with the video name.
    fn is_match(&self, context: &MatchContext, relative_path: &str, file_name: &str) -> bool {
        self.templates
            .iter()
            .any(|template| self.compile_template(template, context).is_match(relative_path, file_name))
            || is_related(context.video_base_name, file_name)
    }

    fn compile_template(&self, template: &Template, context: &MatchContext) -> TemplateMatcher {
        template.compile(context).unwrap_or_else(|error| {
            print_warning!("{error:#}");
            if self.config.debug {
                eprintln!("Pattern: {}", template.pattern(context));
            }
            TemplateMatcher::never()
        })
    }

    const fn placement_options(&self) -> PlacementOptions {
        PlacementOptions {
            copy_to_media_folder: self.config.copy_to_media_folder,
            move_instead_of_copy: self.config.move_instead_of_copy,
            overwrite: self.config.overwrite,
        }
    }

    fn print_outcome(&self, relative_path: &str, outcome: &PlacementOutcome) {
        let destination = crate::path_to_filename_string(outcome.destination());
        match outcome {
            PlacementOutcome::Placed { moved, .. } => {
                if self.config.verbose {
                    let action = if *moved { "Moved" } else { "Copied" };
                    println!("{action}: {relative_path} {} {}", "→".green(), destination.green());
                }
            }
            PlacementOutcome::Planned { .. } => {
                println!("Dryrun: {relative_path} {} {}", "→".cyan(), destination.cyan());
            }
            PlacementOutcome::Reported { .. } => {
                if self.config.verbose {
                    println!("Match: {relative_path} {} {destination}", "→".yellow());
                }
            }
            PlacementOutcome::Skipped { reason, .. } => {
                if self.config.verbose {
                    print_warning!("Skipped {relative_path}: {reason} ({destination})");
                }
            }
            PlacementOutcome::Failed { error, .. } => {
                print_error!("Failed to place {relative_path}: {error}");
            }
        }
    }
}

/// Sweep the given videos once with the given configuration.
pub fn run_once(config: &SweepConfig, videos: &[VideoItem], dryrun: bool, abort_flag: &AtomicBool) -> ScanReport {
    SubtitleSweep::new(config, dryrun).run(videos, abort_flag)
}

/// Load the current configuration and sweep every video in the catalog.
///
/// # Errors
/// Returns an error if no configuration is available or the catalog cannot be read.
/// Nothing is scanned in that case.
pub fn run_with_current_config(
    source: &impl ConfigSource,
    catalog: &impl VideoCatalog,
    dryrun: bool,
    abort_flag: &AtomicBool,
) -> Result<ScanReport> {
    let config = source.current_config().context("No configuration available for sweep")?;
    let videos = catalog.videos().context("Failed to read video catalog")?;
    Ok(run_once(&config, &videos, dryrun, abort_flag))
}
