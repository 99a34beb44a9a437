//! Blueprint Tool
//!
//! Inspect, convert, scan and bundle blueprint files from the command line.

use blueprint_forge::blueprints::BlueprintRoot;
use blueprint_forge::codec::transport::{self, BlueprintList};
use blueprint_forge::codec::{read_file, write_file, BlueprintFormat};
use blueprint_forge::core::error::Result;
use blueprint_forge::core::BlueprintConfig;
use blueprint_forge::storage::{sanitize_file_name, unique_location, ScanService};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// Blueprint Tool - work with blueprint files
#[derive(Parser, Debug)]
#[command(name = "blueprint-tool")]
#[command(about = "Inspect, convert and scan blueprint files")]
struct Args {
    /// Config file (TOML); defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of one blueprint file
    Inspect {
        file: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert between formats, chosen by file extension
    Convert { input: PathBuf, output: PathBuf },
    /// Load every blueprint under a directory
    Scan {
        dir: PathBuf,
        /// Also import legacy dialect files
        #[arg(long)]
        legacy: bool,
    },
    /// Bundle blueprint files into a transport blob
    Pack {
        output: PathBuf,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Extract a transport blob into native binary files
    Unpack { blob: PathBuf, dir: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("blueprint_forge=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => BlueprintConfig::load(path)?,
        None => BlueprintConfig::default(),
    };

    match args.command {
        Command::Inspect { file, json } => inspect(&file, json, &config),
        Command::Convert { input, output } => convert(&input, &output, &config),
        Command::Scan { dir, legacy } => scan(dir, legacy, config),
        Command::Pack { output, files } => pack(&output, &files, &config),
        Command::Unpack { blob, dir } => unpack(&blob, &dir),
    }
}

fn inspect(file: &Path, json: bool, config: &BlueprintConfig) -> Result<()> {
    let root = read_file(file, config)?;
    let valid = root.validate();
    let extent = root.extent().map(|e| e.size());

    if json {
        let summary = serde_json::json!({
            "name": root.name,
            "author": root.author,
            "description": root.description,
            "category": root.category,
            "objects": root.objects.len(),
            "named_ids": root.objects.iter().filter(|o| o.id.is_string()).count(),
            "with_state": root.objects.iter().filter(|o| o.state.is_some()).count(),
            "previews": root.previews.len(),
            "has_icon": root.icon.is_some(),
            "size": extent.map(|s| [s.x, s.y, s.z]),
            "valid": valid.is_ok(),
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
        return Ok(());
    }

    println!("{}", root.name);
    if let Some(author) = &root.author {
        println!("  author:      {}", author);
    }
    if let Some(category) = &root.category {
        println!("  category:    {}", category);
    }
    if let Some(description) = &root.description {
        println!("  description: {}", description);
    }
    println!("  objects:     {}", root.objects.len());
    println!("  previews:    {}", root.previews.len());
    if let Some(size) = extent {
        println!("  size:        {:.2} x {:.2} x {:.2}", size.x, size.y, size.z);
    }
    if let Err(e) = valid {
        println!("  INVALID:     {}", e);
    }
    Ok(())
}

fn convert(input: &Path, output: &Path, config: &BlueprintConfig) -> Result<()> {
    let root = read_file(input, config)?;
    root.validate()?;
    write_file(output, &root)?;
    tracing::info!(
        "Converted '{}' ({} objects) to {}",
        root.name,
        root.objects.len(),
        output.display()
    );
    Ok(())
}

fn scan(dir: PathBuf, legacy: bool, mut config: BlueprintConfig) -> Result<()> {
    config.scan_legacy_files |= legacy;
    let rt = Runtime::new()?;
    let mut service = ScanService::new(rt.handle().clone(), config);
    service.request(dir);

    let Some(report) = rt.block_on(service.next_report()) else {
        return Ok(());
    };
    for root in &report.blueprints {
        let location = root
            .storage_location
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!("{:<32} {:>6} objects  {}", root.name, root.objects.len(), location);
    }
    for failure in &report.failures {
        println!("SKIPPED {}: {}", failure.path.display(), failure.reason);
    }
    println!(
        "{} blueprints, {} skipped",
        report.blueprints.len(),
        report.failures.len()
    );
    Ok(())
}

fn pack(output: &Path, files: &[PathBuf], config: &BlueprintConfig) -> Result<()> {
    let roots = files
        .iter()
        .map(|file| -> Result<BlueprintRoot> {
            let root = read_file(file, config)?;
            root.validate()?;
            Ok(root)
        })
        .collect::<Result<Vec<_>>>()?;

    let blob = BlueprintList(roots).to_blob();
    std::fs::write(output, &blob)?;
    tracing::info!("Packed {} blueprints into {} bytes", files.len(), blob.len());
    Ok(())
}

fn unpack(blob: &Path, dir: &Path) -> Result<()> {
    let bytes = std::fs::read(blob)?;
    let roots = transport::unpack(&bytes)?;
    std::fs::create_dir_all(dir)?;

    for root in &roots {
        let path = unique_location(
            dir,
            &sanitize_file_name(&root.name),
            BlueprintFormat::Binary.extension(),
            Path::exists,
        );
        write_file(&path, root)?;
        println!("{}", path.display());
    }
    tracing::info!("Unpacked {} blueprints", roots.len());
    Ok(())
}
