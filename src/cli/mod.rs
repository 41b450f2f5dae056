//! # CLI Module
//!
//! Command-line interface for the duplicate image finder.
//!
//! ## Usage
//! ```bash
//! # Scan folders for duplicates
//! doppelganger scan ~/Pictures ~/Downloads
//!
//! # Stricter matching, largest files first
//! doppelganger scan ~/Pictures --sensitivity 4 --sort file-size
//!
//! # JSON output, no thumbnails
//! doppelganger scan ~/Pictures --lazy --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use doppelganger::core::cache::default_cache_path;
use doppelganger::core::comparator::{ImageGroup, Sensitivity, SortKey};
use doppelganger::core::pipeline::{Delivery, Pipeline, PipelineConfig, PipelineResult};
use doppelganger::core::scanner::ImageFile;
use doppelganger::error::{DoppelgangerError, Result};
use doppelganger::events::{Event, EventChannel, HashEvent, PipelineEvent, PipelineOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::thread;

/// Doppelganger - find visually duplicate images
#[derive(Parser, Debug)]
#[command(name = "doppelganger")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan folders for duplicate images
    Scan(ScanArgs),
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    /// Folders to scan
    folders: Vec<PathBuf>,

    /// Largest Hamming distance still counted as a duplicate (0-64), or
    /// one of exact, strict, balanced, permissive
    #[arg(short, long)]
    sensitivity: Option<Sensitivity>,

    /// Only scan the top level of each folder
    #[arg(long)]
    no_subfolders: bool,

    /// Include hidden files and folders
    #[arg(long)]
    include_hidden: bool,

    /// Worker threads (capped at the number of cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Order of images in each group: difference, file-size, dimensions, path
    #[arg(long)]
    sort: Option<SortKey>,

    /// Skip thumbnails and report all groups at once
    #[arg(long)]
    lazy: bool,

    /// Minimum image width in pixels
    #[arg(long)]
    min_width: Option<u32>,

    /// Maximum image width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Minimum image height in pixels
    #[arg(long)]
    min_height: Option<u32>,

    /// Maximum image height in pixels
    #[arg(long)]
    max_height: Option<u32>,

    /// Longer side of thumbnails in pixels
    #[arg(long)]
    thumbnail_size: Option<u32>,

    /// Hash cache file
    #[arg(long, conflicts_with = "no_cache")]
    cache: Option<PathBuf>,

    /// Don't read or write the hash cache
    #[arg(long)]
    no_cache: bool,

    /// JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (duplicate paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => run_scan(args),
    }
}

impl ScanArgs {
    /// Merge the flags over the config file (or the defaults)
    fn into_config(self) -> Result<(PipelineConfig, OutputFormat, bool)> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if !self.folders.is_empty() {
            config.folders = self.folders;
        }
        if config.folders.is_empty() {
            return Err(DoppelgangerError::Config(
                "no folders given; pass at least one folder or set `folders` in the config file"
                    .to_string(),
            ));
        }
        if let Some(sensitivity) = self.sensitivity {
            config.sensitivity = sensitivity;
        }
        if self.no_subfolders {
            config.include_subfolders = false;
        }
        if self.include_hidden {
            config.include_hidden = true;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(sort) = self.sort {
            config.sort = sort;
        }
        if self.lazy {
            config.delivery = Delivery::Lazy;
        }
        if let Some(size) = self.thumbnail_size {
            config.thumbnail_size = size;
        }

        let bounds = [self.min_width, self.max_width, self.min_height, self.max_height];
        if bounds.iter().any(Option::is_some) {
            let mut filter = config.size_filter.unwrap_or_default();
            filter.min_width = self.min_width.unwrap_or(filter.min_width);
            filter.max_width = self.max_width.unwrap_or(filter.max_width);
            filter.min_height = self.min_height.unwrap_or(filter.min_height);
            filter.max_height = self.max_height.unwrap_or(filter.max_height);
            config.size_filter = Some(filter);
        }

        config.cache_path = if self.no_cache {
            None
        } else {
            self.cache
                .or(config.cache_path)
                .or_else(|| Some(default_cache_path()))
        };

        Ok((config, self.output, self.verbose))
    }
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let (config, output, verbose) = args.into_config()?;
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Doppelganger").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let mut pipeline = Pipeline::builder().config(config).build();

    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .map(|s| s.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            // Drain so the pipeline never waits on a full channel
            for _ in receiver.iter() {}
            return;
        };

        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(phase.to_string());
                }
                Event::Pipeline(PipelineEvent::Progress { percent }) => {
                    pb.set_position(percent.round() as u64);
                }
                Event::Hash(HashEvent::Progress(p)) if verbose => {
                    pb.set_message(format!(
                        "Hashing {} ({} left)",
                        p.current_path.file_name().unwrap_or_default().to_string_lossy(),
                        p.remaining
                    ));
                }
                Event::Hash(HashEvent::Error { path, message }) if verbose => {
                    pb.println(format!("{} {}: {}", style("!").yellow(), path.display(), message));
                }
                Event::Pipeline(PipelineEvent::Finished { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let result = result?;
    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, verbose),
        OutputFormat::Json => print_json_results(&result)?,
        OutputFormat::Minimal => print_minimal_results(&result),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, result: &PipelineResult, verbose: bool) {
    let summary = &result.summary;

    term.write_line("").ok();
    let headline = match result.outcome {
        PipelineOutcome::Interrupted => format!("{} Scan Interrupted", style("■").yellow().bold()),
        _ => format!("{} Scan Complete", style("✓").green().bold()),
    };
    term.write_line(&headline).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images found in {:.1}s",
        style(summary.images_discovered).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} hashed, {} from cache",
        style(summary.images_hashed).cyan(),
        style(summary.images_cached).dim()
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicate groups, {} images",
        style(summary.groups_found).cyan(),
        style(summary.duplicates_found).cyan()
    ))
    .ok();

    if summary.had_errors {
        term.write_line(&format!(
            "  {} images could not be read",
            style(summary.error_count).yellow()
        ))
        .ok();
        if verbose {
            for message in &result.errors {
                term.write_line(&format!("    {}", style(message).dim())).ok();
            }
        }
    }

    term.write_line("").ok();

    if result.groups.is_empty() {
        term.write_line("  No duplicates found!").ok();
        return;
    }

    term.write_line(&format!("{}", style("Duplicate Groups:").bold().underlined()))
        .ok();
    term.write_line("").ok();

    for (i, group) in result.groups.iter().enumerate() {
        term.write_line(&format!(
            "  {} ({} images)",
            style(format!("Group {}:", i + 1)).bold(),
            group.len()
        ))
        .ok();

        for image in &group.images {
            let marker = if image.difference == 0 {
                style("★").green().to_string()
            } else {
                style("○").dim().to_string()
            };

            term.write_line(&format!(
                "    {} {} {}",
                marker,
                display_path(&image.path),
                style(describe(image)).dim()
            ))
            .ok();
        }

        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{}",
        style("No files were changed. Review carefully before deleting anything.").dim()
    ))
    .ok();
}

fn describe(image: &ImageFile) -> String {
    let mut parts = vec![format!("diff {}", image.difference)];
    if let Some(dimensions) = image.dimensions {
        parts.push(format!("{}x{}", dimensions.width, dimensions.height));
    }
    if let Some(size) = image.file_size {
        parts.push(format_bytes(size));
    }
    format!("({})", parts.join(", "))
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}

fn group_json(group: &ImageGroup) -> serde_json::Value {
    serde_json::json!({
        "id": group.id.to_string(),
        "images": group.images.iter().map(|image| {
            serde_json::json!({
                "path": image.path,
                "hash": image.hash.map(|h| h.to_hex()),
                "difference": image.difference,
                "dimensions": image.dimensions,
                "file_size": image.file_size,
                "has_thumbnail": image.thumbnail.is_some(),
            })
        }).collect::<Vec<_>>(),
    })
}

fn print_json_results(result: &PipelineResult) -> Result<()> {
    let output = serde_json::json!({
        "outcome": result.outcome,
        "summary": result.summary,
        "errors": result.errors,
        "groups": result.groups.iter().map(group_json).collect::<Vec<_>>(),
    });

    let text = serde_json::to_string_pretty(&output)
        .map_err(|e| DoppelgangerError::Config(format!("cannot render output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn print_minimal_results(result: &PipelineResult) {
    for group in &result.groups {
        for image in group.images.iter().skip(1) {
            println!("{}", image.path.display());
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
