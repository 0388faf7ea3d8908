use clap::ArgMatches;
use h5fetch_core::PipelineOptions;
use h5fetch_scanner::RetryPolicy;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_DOWNLOAD_DIR: &str = "./files";
pub const DEFAULT_EXPORT_FILE: &str = "urls.txt";

/// Problems with what the user asked for. Always fatal, always reported
/// before any network activity.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("either --url or --file must be specified")]
    MissingSource,

    #[error("cannot specify both --url and --file")]
    ConflictingSources,

    #[error("workers must be at least 1")]
    InvalidWorkers,

    #[error("invalid file format: {0}")]
    InvalidFileFormat(PathBuf),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid depth in line: {0}")]
    InvalidDepth(String),
}

/// Fully resolved run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: Option<String>,
    pub file: Option<PathBuf>,
    pub depth: usize,
    pub workers: usize,
    pub export_only: bool,
    pub flat: bool,
    pub output: PathBuf,
    pub cache_dir: PathBuf,
    pub ledger_dir: PathBuf,
    pub retries: u32,
    pub dedup: bool,
    pub quiet: bool,
    pub verbose: bool,
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

impl Config {
    pub fn from_matches(args: &ArgMatches) -> Result<Self, ConfigError> {
        let export_only = args.get_flag("export-only");
        let output = match args.get_one::<String>("output") {
            Some(output) => expand(output),
            None if export_only => PathBuf::from(DEFAULT_EXPORT_FILE),
            None => PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        };

        let config = Self {
            url: args.get_one::<String>("url").cloned(),
            file: args.get_one::<PathBuf>("file").cloned(),
            depth: args.get_one::<usize>("depth").copied().unwrap_or(4),
            workers: args.get_one::<usize>("workers").copied().unwrap_or(4),
            export_only,
            flat: args.get_flag("flat"),
            output,
            cache_dir: args
                .get_one::<String>("cache-dir")
                .map(|p| expand(p))
                .unwrap_or_else(|| PathBuf::from("url_cache")),
            ledger_dir: args
                .get_one::<String>("ledger-dir")
                .map(|p| expand(p))
                .unwrap_or_else(|| PathBuf::from("downloaded_db")),
            retries: args.get_one::<u32>("retries").copied().unwrap_or(0),
            dedup: args.get_flag("dedup"),
            quiet: args.get_flag("quiet"),
            verbose: args.get_flag("verbose"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.url, &self.file) {
            (None, None) => return Err(ConfigError::MissingSource),
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingSources),
            _ => {}
        }
        if self.workers < 1 {
            return Err(ConfigError::InvalidWorkers);
        }
        Ok(())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            cache_dir: self.cache_dir.clone(),
            ledger_dir: self.ledger_dir.clone(),
            output: self.output.clone(),
            workers: self.workers,
            flat: self.flat,
            dedup: self.dedup,
            retry: RetryPolicy::with_retries(self.retries),
            show_progress_bars: !self.quiet,
        }
    }
}
