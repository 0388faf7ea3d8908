use crate::config::{Config, ConfigError};
use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use h5fetch_core::export::export_urls;
use h5fetch_core::{CrawlTask, PipelineProgressCallback, RootDownloadReport, discover, download_all, total_urls};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::Level;

/// Load crawl tasks from either a file or a single URL argument
pub fn load_tasks_from_source(
    url: Option<&str>,
    file: Option<&Path>,
    default_depth: usize,
) -> Result<Vec<CrawlTask>, ConfigError> {
    match (url, file) {
        (Some(_), Some(_)) => Err(ConfigError::ConflictingSources),
        (Some(url), None) => Ok(vec![CrawlTask::new(url, default_depth)]),
        (None, Some(file)) => load_tasks_from_file(file, default_depth),
        (None, None) => Err(ConfigError::MissingSource),
    }
}

/// Load and parse crawl tasks from a `.txt` file, one root per line
pub fn load_tasks_from_file(path: &Path, default_depth: usize) -> Result<Vec<CrawlTask>, ConfigError> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
        return Err(ConfigError::InvalidFileFormat(path.to_path_buf()));
    }

    let content =
        fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound(path.to_path_buf()))?;

    let mut tasks = Vec::new();
    for line in content.lines() {
        if let Some(task) = parse_task_line(line, default_depth)? {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

/// Parse `<url> [depth]`. Blank lines yield `None`; a bad depth is an error.
pub fn parse_task_line(line: &str, default_depth: usize) -> Result<Option<CrawlTask>, ConfigError> {
    let line = line.trim();
    let mut fields = line.split_whitespace();
    let Some(url) = fields.next() else {
        return Ok(None);
    };

    let depth = match fields.next() {
        Some(depth) => depth
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidDepth(line.to_string()))?,
        None => default_depth,
    };

    Ok(Some(CrawlTask::new(url, depth)))
}

/// Ask on stdout, answer from `input`. Only `y`/`yes` confirms.
pub fn confirm<R: BufRead>(input: &mut R, prompt: &str) -> bool {
    print!("{} ", prompt.bright_cyan().bold());
    let _ = io::stdout().flush();

    let mut response = String::new();
    if input.read_line(&mut response).is_err() {
        return false;
    }
    let response = response.trim().to_lowercase();
    response == "y" || response == "yes"
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    // A second initialisation (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .try_init();
}

fn print_download_summary(reports: &[RootDownloadReport]) {
    let downloaded: usize = reports.iter().map(|r| r.pool.downloaded).sum();
    let skipped: usize = reports.iter().map(|r| r.skipped).sum();
    let failed: Vec<_> = reports.iter().flat_map(|r| r.pool.failed.iter()).collect();

    println!();
    println!("{} Downloaded: {}", "✓".green().bold(), downloaded);
    if skipped > 0 {
        println!("{} Already complete: {}", "→".blue(), skipped);
    }
    if !failed.is_empty() {
        println!("{} Failed: {}", "✗".red().bold(), failed.len());
        for failure in failed {
            println!("  {} {}: {}", "•".yellow(), failure.url, failure.error);
        }
    }
}

/// Run a whole crawl, then export or download.
pub async fn handle_fetch(args: &ArgMatches) -> anyhow::Result<()> {
    let config = Config::from_matches(args)?;
    init_tracing(config.verbose);
    run(&config, &mut io::stdin().lock()).await
}

/// Everything after argument parsing; `input` answers the confirmation prompt.
pub async fn run<R: BufRead>(config: &Config, input: &mut R) -> anyhow::Result<()> {
    let tasks = load_tasks_from_source(config.url.as_deref(), config.file.as_deref(), config.depth)?;

    if tasks.is_empty() {
        bail!("No URLs detected");
    }
    if tasks.len() > 1 {
        println!("Detected {} URLs", tasks.len());
    }

    let options = config.pipeline_options();
    let progress_callback: Option<PipelineProgressCallback> = if config.quiet {
        None
    } else {
        Some(Arc::new(|msg: String| println!("{}", msg)))
    };

    println!("\n{}", "Scraping and finding download URLs:".bright_blue().bold());
    let discoveries = discover(&tasks, &options, progress_callback.clone()).await?;

    let total = total_urls(&discoveries);
    if total == 0 {
        bail!("No downloadable files found");
    }
    println!("\nTotal Downloadable Files: {}", total.to_string().cyan());

    if config.export_only {
        println!("Exporting URLs to {}...", config.output.display());
        let lines = export_urls(&config.output, &discoveries, config.flat)
            .with_context(|| format!("Error creating output file {}", config.output.display()))?;
        println!("{} Successfully exported {} URLs", "✓".green().bold(), lines);
        return Ok(());
    }

    if !confirm(input, "Press y to continue:") {
        bail!("Aborting...");
    }

    let reports = download_all(&discoveries, &options, progress_callback).await?;
    print_download_summary(&reports);
    Ok(())
}
