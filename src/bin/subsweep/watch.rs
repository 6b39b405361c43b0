use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::event::{EventKind, ModifyKind};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::Notify;

use subtitle_sweep::print_error;
use subtitle_sweep::subtitle::{self, DebounceTrigger, ScanReport, SweepRunner};

use crate::SubsweepArgs;
use crate::catalog::{LibraryCatalog, is_video};
use crate::config::{CliConfigSource, Config};
use crate::logger::FileLogger;
use crate::subsweep::print_report;

type SharedLogger = Arc<Mutex<FileLogger>>;

/// Sweep launched by the debounce trigger.
///
/// The catalog and the user config are read again for every sweep,
/// and files are always placed.
struct WatchSweep {
    source: CliConfigSource,
    root: PathBuf,
    abort_flag: Arc<AtomicBool>,
    json: bool,
    logger: Option<SharedLogger>,
}

impl SweepRunner for WatchSweep {
    fn run_sweep(&self) -> Result<ScanReport> {
        let start = Instant::now();
        let catalog = LibraryCatalog::new(self.root.clone());
        let result = subtitle::run_with_current_config(&self.source, &catalog, false, &self.abort_flag);
        let duration = start.elapsed();

        match &result {
            Ok(report) => {
                print_report(report, self.json, duration)?;
                if let Some(logger) = &self.logger {
                    lock(logger).log_report(report, duration);
                }
            }
            Err(error) => {
                if let Some(logger) = &self.logger {
                    lock(logger).log_failure(&format!("{error:#}"));
                }
            }
        }
        result
    }
}

/// Watch the library and sweep after changes have settled.
///
/// Runs until Ctrl+C.
pub(crate) async fn watch_library(
    config: &Config,
    args: SubsweepArgs,
    abort_flag: Arc<AtomicBool>,
    shutdown: &Notify,
    logger: Option<FileLogger>,
) -> Result<()> {
    let logger = logger.map(|logger| Arc::new(Mutex::new(logger)));
    let runner = WatchSweep {
        source: CliConfigSource::new(args),
        root: config.path.clone(),
        abort_flag,
        json: config.json,
        logger: logger.clone(),
    };

    let delay = Duration::from_secs(config.sweep.debounce_seconds);
    let trigger = Arc::new(DebounceTrigger::new(delay, runner)?);

    // Place anything that arrived while not watching.
    trigger.notify();

    let extensions = config.sweep.extensions.clone();
    let verbose = config.sweep.verbose;
    let root = config.path.clone();
    let event_trigger = Arc::clone(&trigger);
    let event_logger = logger.clone();
    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| match result {
            Ok(event) => {
                if let Some(path) = relevant_path(&event, &extensions) {
                    if verbose {
                        println!("Changed: {}", subtitle_sweep::get_relative_path_or_filename(path, &root));
                    }
                    if let Some(logger) = &event_logger {
                        lock(logger).log_change(path);
                    }
                    event_trigger.notify();
                }
            }
            Err(error) => print_error!("Watch error: {error}"),
        },
        NotifyConfig::default(),
    )
    .context("Failed to create file watcher")?;

    watcher
        .watch(&config.path, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", config.path.display()))?;

    println!(
        "Watching {} (sweep {}s after the last change, Ctrl+C to stop)",
        config.path.display(),
        config.sweep.debounce_seconds
    );

    shutdown.notified().await;

    drop(watcher);
    trigger.shutdown();
    if let Some(logger) = &logger {
        lock(logger).log_end();
    }
    Ok(())
}

/// Return the first video or subtitle path of a create, modify, or remove event.
fn relevant_path<'a>(event: &'a Event, extensions: &[String]) -> Option<&'a Path> {
    let is_change = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Name(_) | ModifyKind::Data(_) | ModifyKind::Any)
    );
    if !is_change {
        return None;
    }
    event
        .paths
        .iter()
        .map(PathBuf::as_path)
        .find(|path| is_video(path) || is_subtitle(path, extensions))
}

fn is_subtitle(path: &Path, extensions: &[String]) -> bool {
    let name = subtitle_sweep::path_to_filename_string(path).to_lowercase();
    extensions.iter().any(|extension| name.ends_with(extension.as_str()))
}

fn lock(logger: &SharedLogger) -> std::sync::MutexGuard<'_, FileLogger> {
    logger.lock().unwrap_or_else(PoisonError::into_inner)
}
