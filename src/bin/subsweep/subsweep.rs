use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::sync::Notify;

use subtitle_sweep::print_bold;
use subtitle_sweep::subtitle::{self, ScanReport, VideoCatalog};

use crate::SubsweepArgs;
use crate::catalog::LibraryCatalog;
use crate::config::Config;
use crate::logger::FileLogger;
use crate::watch;

pub struct SubSweep {
    args: SubsweepArgs,
    config: Config,
    logger: Option<FileLogger>,
}

impl SubSweep {
    pub fn new(args: SubsweepArgs) -> Result<Self> {
        let config = Config::from_args(args.clone())?;
        let logger = if config.log_file {
            Some(FileLogger::new()?)
        } else {
            None
        };
        Ok(Self { args, config, logger })
    }

    pub async fn run(mut self) -> Result<()> {
        if self.config.sweep.debug {
            println!("{}", self.config.sweep);
        }
        if let Some(logger) = &mut self.logger {
            logger.log_init(&self.config);
            if self.config.sweep.verbose {
                println!("Logging to {}", logger.path().display());
            }
        }

        let abort_flag = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());
        install_ctrlc_handler(Arc::clone(&abort_flag), Arc::clone(&shutdown))?;

        if self.config.watch {
            watch::watch_library(&self.config, self.args, abort_flag, &shutdown, self.logger).await
        } else {
            let report = self.sweep_once(&abort_flag)?;
            if report.failures > 0 {
                anyhow::bail!("Failed to place {} subtitle file(s)", report.failures);
            }
            Ok(())
        }
    }

    /// Sweep the whole library once.
    fn sweep_once(&mut self, abort_flag: &AtomicBool) -> Result<ScanReport> {
        let start = Instant::now();
        let videos = LibraryCatalog::new(self.config.path.clone()).videos()?;
        if self.config.sweep.verbose {
            println!("Found {} video(s) in {}", videos.len(), self.config.path.display());
        }

        let report = subtitle::run_once(&self.config.sweep, &videos, self.config.dryrun, abort_flag);
        let duration = start.elapsed();

        if report.cancelled {
            println!("\n{}", "Aborted by user".bold().red());
        }
        print_report(&report, self.config.json, duration)?;

        if let Some(logger) = &mut self.logger {
            logger.log_report(&report, duration);
            logger.log_end();
        }
        Ok(report)
    }
}

/// Print the sweep summary, or the report as JSON.
pub fn print_report(report: &ScanReport, json: bool, duration: std::time::Duration) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_bold!("{report} in {}", subtitle_sweep::format_duration(duration));
    }
    Ok(())
}

/// First Ctrl+C stops after the current video, second one exits immediately.
fn install_ctrlc_handler(abort_flag: Arc<AtomicBool>, shutdown: Arc<Notify>) -> Result<()> {
    ctrlc::set_handler(move || {
        if abort_flag.load(Ordering::SeqCst) {
            std::process::exit(130);
        }
        println!("\n{}", "Received Ctrl+C, finishing current video...".yellow().bold());
        abort_flag.store(true, Ordering::SeqCst);
        shutdown.notify_one();
    })
    .context("Failed to set Ctrl+C handler")
}
