use std::path::PathBuf;

use anyhow::Result;
use itertools::Itertools;

use subtitle_sweep::subtitle::{ConfigSource, SubsweepConfig, SweepConfig};

use crate::SubsweepArgs;

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) path: PathBuf,
    pub(crate) sweep: SweepConfig,
    pub(crate) dryrun: bool,
    pub(crate) json: bool,
    pub(crate) log_file: bool,
    pub(crate) watch: bool,
}

/// Re-reads the user config file for every sweep and applies the CLI arguments on top.
#[derive(Debug, Clone)]
pub struct CliConfigSource {
    args: SubsweepArgs,
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be parsed or the input path does not exist.
    pub fn from_args(args: SubsweepArgs) -> Result<Self> {
        let user_config = SubsweepConfig::get_user_config()?;
        Self::from_parts(args, user_config)
    }

    fn from_parts(args: SubsweepArgs, user_config: SubsweepConfig) -> Result<Self> {
        let path = subtitle_sweep::resolve_input_path(args.path.as_deref())?;
        let dryrun = args.print || user_config.dryrun;
        let log_file = args.log || user_config.log_file;

        let templates: Vec<String> = user_config.templates.into_iter().chain(args.template).unique().collect();
        let extensions: Vec<String> = user_config
            .extensions
            .into_iter()
            .chain(args.extension)
            .unique()
            .collect();
        let languages: Vec<String> = user_config
            .languages
            .into_iter()
            .chain(args.language)
            .map(|s| s.to_lowercase())
            .unique()
            .collect();

        let merged = SubsweepConfig {
            templates,
            extensions,
            languages,
            allow_deep_match: if args.shallow {
                Some(false)
            } else {
                user_config.allow_deep_match
            },
            max_depth: args.depth.or(user_config.max_depth),
            extended_language_mapping: user_config.extended_language_mapping,
            path_filter: args.path_filter.or(user_config.path_filter),
            name_filter: args.name.or(user_config.name_filter),
            copy_to_media_folder: if args.discover {
                Some(false)
            } else {
                user_config.copy_to_media_folder
            },
            move_instead_of_copy: args.move_files || user_config.move_instead_of_copy,
            overwrite: args.force || user_config.overwrite,
            destination_pattern: args.output.or(user_config.destination_pattern),
            debounce_seconds: args.delay.or(user_config.debounce_seconds),
            debug: args.debug || user_config.debug,
            dryrun,
            log_file,
            verbose: args.verbose || user_config.verbose,
        };

        Ok(Self {
            path,
            sweep: SweepConfig::from_file_config(merged),
            dryrun,
            json: args.json,
            log_file,
            watch: args.watch,
        })
    }
}

impl CliConfigSource {
    pub const fn new(args: SubsweepArgs) -> Self {
        Self { args }
    }
}

impl ConfigSource for CliConfigSource {
    fn current_config(&self) -> Result<SweepConfig> {
        Config::from_args(self.args.clone()).map(|config| config.sweep)
    }
}

#[cfg(test)]
mod subsweep_cli_config_tests {
    use super::*;

    use clap::Parser;
    use tempfile::TempDir;

    fn args(extra: &[&str], dir: &TempDir) -> SubsweepArgs {
        let path = dir.path().to_string_lossy().to_string();
        let mut argv = vec!["subsweep".to_string()];
        argv.extend(extra.iter().map(ToString::to_string));
        argv.push(path);
        SubsweepArgs::try_parse_from(argv).expect("should parse args")
    }

    #[test]
    fn defaults_without_args_or_user_config() {
        let dir = TempDir::new().expect("temp dir");
        let config = Config::from_parts(args(&[], &dir), SubsweepConfig::default()).expect("config");
        assert_eq!(config.sweep, SweepConfig::default());
        assert!(!config.dryrun);
        assert!(!config.json);
        assert!(!config.watch);
    }

    #[test]
    fn cli_lists_are_appended_to_user_config() {
        let dir = TempDir::new().expect("temp dir");
        let user_config = SubsweepConfig::from_toml_str(
            r#"
[subsweep]
templates = ["%fn%.%l%.%fe%"]
extensions = [".srt"]
languages = ["en|eng|english"]
"#,
        )
        .expect("should parse config");

        let cli = args(
            &["-t", "Subs/%l%.%fe%", "-t", "%fn%.%l%.%fe%", "-x", "vtt", "-L", "FI|fin|Finnish"],
            &dir,
        );
        let config = Config::from_parts(cli, user_config).expect("config");
        assert_eq!(config.sweep.templates, vec!["%fn%.%l%.%fe%", "Subs/%l%.%fe%"]);
        assert_eq!(config.sweep.extensions, vec![".srt", ".vtt"]);
        assert_eq!(config.sweep.languages, vec!["en|eng|english", "fi|fin|finnish"]);
    }

    #[test]
    fn cli_flags_override_user_config() {
        let dir = TempDir::new().expect("temp dir");
        let user_config = SubsweepConfig::from_toml_str(
            r#"
[subsweep]
allow_deep_match = true
max_depth = 4
destination_pattern = "%fn%.%fe%"
name_filter = "Movie"
"#,
        )
        .expect("should parse config");

        let cli = args(
            &["--shallow", "--depth", "1", "-o", "%fn%.%l%.%fe%", "-n", "Show", "-d", "-m", "-f", "--delay", "2"],
            &dir,
        );
        let config = Config::from_parts(cli, user_config).expect("config");
        assert!(!config.sweep.allow_deep_match);
        assert_eq!(config.sweep.max_depth, 1);
        assert_eq!(config.sweep.destination_pattern, "%fn%.%l%.%fe%");
        assert_eq!(config.sweep.name_filter.as_deref(), Some("Show"));
        assert!(!config.sweep.copy_to_media_folder);
        assert!(config.sweep.move_instead_of_copy);
        assert!(config.sweep.overwrite);
        assert_eq!(config.sweep.debounce_seconds, 2);
    }

    #[test]
    fn user_config_flags_are_combined_with_cli_flags() {
        let dir = TempDir::new().expect("temp dir");
        let user_config = SubsweepConfig::from_toml_str(
            r"
[subsweep]
dryrun = true
log_file = true
verbose = true
",
        )
        .expect("should parse config");

        let config = Config::from_parts(args(&["-j"], &dir), user_config).expect("config");
        assert!(config.dryrun);
        assert!(config.log_file);
        assert!(config.json);
        assert!(config.sweep.verbose);
    }

    #[test]
    fn watch_conflicts_with_print() {
        let result = SubsweepArgs::try_parse_from(["subsweep", "--watch", "--print"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_input_path_is_an_error() {
        let cli = SubsweepArgs::try_parse_from(["subsweep", "/definitely/not/a/library"]).expect("should parse args");
        assert!(Config::from_parts(cli, SubsweepConfig::default()).is_err());
    }
}
