//! mdpush - Import a Markdown file into a Google Doc, images included

use anyhow::{Context, Result};
use clap::Parser;
use mdpush_core::{CallContext, Config, DocumentTarget, Importer, MissingImagePolicy};
use mdpush_google::{GoogleClient, GoogleDocs, GoogleDrive};
use std::path::PathBuf;

/// Import a Markdown file into a Google Doc
#[derive(Parser, Debug)]
#[command(name = "mdpush")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to markdown file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Title for the new document (defaults to the file name)
    #[arg(long, conflicts_with = "document")]
    title: Option<String>,

    /// Append to an existing document instead of creating one
    #[arg(long, value_name = "ID")]
    document: Option<String>,

    /// Fail unless every image can be placed
    #[arg(long)]
    strict: bool,

    /// Keep staged image uploads after the import
    #[arg(long)]
    keep_uploads: bool,

    /// Log every edit operation
    #[arg(long)]
    trace_edits: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn target(&self) -> DocumentTarget {
        match &self.document {
            Some(id) => DocumentTarget::Existing { id: id.clone() },
            None => DocumentTarget::New {
                title: self.title.clone().unwrap_or_else(|| {
                    self.file
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "Untitled".to_string())
                }),
            },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    let mut options = config.import_options();
    if args.strict {
        options.missing_images = MissingImagePolicy::Fail;
    }
    options.keep_uploads |= args.keep_uploads;
    options.trace_edits |= args.trace_edits;

    let target = args.target();
    log::debug!("Import target: {:?}", target);

    let client = GoogleClient::from_config(&config.google)?;
    let docs = GoogleDocs::new(client.clone());
    let drive = GoogleDrive::new(client);

    let report = Importer::new(&docs, &drive, options)
        .import_file(&CallContext::background(), &args.file, &target)
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    println!("{}", report.document_id);
    if !report.skipped.is_empty() {
        eprintln!(
            "{} image(s) placed, {} skipped:",
            report.placed,
            report.skipped.len()
        );
        for skipped in &report.skipped {
            eprintln!("  [{}] {}: {}", skipped.index, skipped.reference, skipped.reason);
        }
    }
    for object_id in &report.retained_uploads {
        eprintln!("kept upload {}", object_id);
    }

    Ok(())
}
