//! Subtitle discovery and placement.
//!
//! For every video, nearby subtitle files are collected from the video directory
//! and its `Subs` folder, classified by language, matched against path templates
//! and the video name, and then copied or moved next to the video.

mod config;
mod language;
mod placement;
mod related;
mod scan;
mod template;
mod trigger;
mod walker;

pub use config::{SubsweepConfig, SweepConfig};
pub use language::{LanguageGroup, LanguageResolver, UNDETERMINED, tokenize};
pub use placement::{PlacementOptions, PlacementOutcome, SkipReason, destination_path, place};
pub use related::is_related;
pub use scan::{
    ConfigSource, ScanReport, SubtitleSweep, UserConfigFile, VideoCatalog, VideoItem, run_once, run_with_current_config,
};
pub use template::{MatchContext, Template, TemplateMatcher, compile};
pub use trigger::{DebounceTrigger, SweepRunner, TriggerState};
pub use walker::{SUBS_DIRECTORY, WalkOptions, find_candidates};
