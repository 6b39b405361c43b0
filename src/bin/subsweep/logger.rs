use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;

use subtitle_sweep::subtitle::ScanReport;

use crate::config::Config;

/// Simple file logger for sweeps with buffered writes
pub struct FileLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLogger {
    /// Create a new file logger, writing to ~/logs/subtitle-sweep/subsweep_<timestamp>.log
    pub(crate) fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        Self::new_in(&home_dir.join("logs").join("subtitle-sweep"))
    }

    /// Create a new file logger in the given directory.
    pub(crate) fn new_in(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let log_path = log_dir.join(format!("subsweep_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: log_path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log when starting the program
    pub(crate) fn log_init(&mut self, config: &Config) {
        let sweep = &config.sweep;
        let _ = writeln!(self.writer, "[{}] INIT \"{}\"", Self::timestamp(), config.path.display());
        let _ = writeln!(self.writer, "  templates: {:?}", sweep.templates);
        let _ = writeln!(self.writer, "  extensions: {:?}", sweep.extensions);
        let _ = writeln!(self.writer, "  languages: {:?}", sweep.languages);
        let _ = writeln!(self.writer, "  allow_deep_match: {}", sweep.allow_deep_match);
        let _ = writeln!(self.writer, "  max_depth: {}", sweep.max_depth);
        if let Some(filter) = &sweep.path_filter {
            let _ = writeln!(self.writer, "  path_filter: {filter}");
        }
        if let Some(filter) = &sweep.name_filter {
            let _ = writeln!(self.writer, "  name_filter: {filter}");
        }
        let _ = writeln!(self.writer, "  copy_to_media_folder: {}", sweep.copy_to_media_folder);
        let _ = writeln!(self.writer, "  move_instead_of_copy: {}", sweep.move_instead_of_copy);
        let _ = writeln!(self.writer, "  overwrite: {}", sweep.overwrite);
        let _ = writeln!(self.writer, "  destination_pattern: {}", sweep.destination_pattern);
        let _ = writeln!(self.writer, "  dryrun: {}", config.dryrun);
        let _ = writeln!(self.writer, "  watch: {}", config.watch);
        let _ = self.writer.flush();
    }

    /// Log a library change that armed the watch trigger
    pub(crate) fn log_change(&mut self, path: &Path) {
        let _ = writeln!(self.writer, "[{}] CHANGE  \"{}\"", Self::timestamp(), path.display());
        let _ = self.writer.flush();
    }

    /// Log a sweep that could not run
    pub(crate) fn log_failure(&mut self, error: &str) {
        let _ = writeln!(self.writer, "[{}] ERROR   {error}", Self::timestamp());
        let _ = self.writer.flush();
    }

    /// Log the result of one sweep
    pub(crate) fn log_report(&mut self, report: &ScanReport, duration: Duration) {
        let _ = writeln!(self.writer, "[{}] SWEEP", Self::timestamp());
        let _ = writeln!(self.writer, "  Videos visited:     {}", report.items_visited);
        let _ = writeln!(self.writer, "  Candidates:         {}", report.sub_candidates);
        let _ = writeln!(self.writer, "  Matches:            {}", report.matches);
        let _ = writeln!(self.writer, "  Written or planned: {}", report.writes_or_planned);
        if report.failures > 0 {
            let _ = writeln!(self.writer, "  Failed:             {}", report.failures);
        }
        if report.cancelled {
            let _ = writeln!(self.writer, "  Cancelled");
        }
        let _ = writeln!(
            self.writer,
            "  Total time: {}",
            subtitle_sweep::format_duration(duration)
        );
        let _ = self.writer.flush();
    }

    /// Log when the program exits
    pub(crate) fn log_end(&mut self) {
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
