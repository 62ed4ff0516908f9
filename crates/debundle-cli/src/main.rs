//! debundle - Extract embedded files from self-contained .NET executables
//!
//! This tool locates the bundle manifest inside a single-file published
//! .NET executable, parses it and extracts the embedded application files.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use debundle_core::{Bundle, BundleFileEntry, ProgressSink};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Exit status when no offset was supplied and automatic location failed
const EXIT_OFFSET_NOT_FOUND: u8 = 2;

/// Extract embedded files from self-contained .NET executables
#[derive(Parser, Debug)]
#[command(name = "debundle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output directory for extracted files
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Bundle offset override, decimal or 0x-prefixed hex (skips the signature scan)
    #[arg(long, value_parser = parse_offset, conflicts_with = "directory")]
    offset: Option<u64>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only list embedded files without extracting
    #[arg(long)]
    list_only: bool,

    /// Dry run - don't write files, just show what would be extracted
    #[arg(long)]
    dry_run: bool,

    /// Print a short blake3 hash of each extracted payload
    #[arg(long)]
    hash: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single bundled executable
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of executables to process
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Parse an offset in decimal or `0x` hexadecimal notation
fn parse_offset(value: &str) -> std::result::Result<u64, String> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hexadecimal offset: {e}"))
    } else {
        value
            .parse::<u64>()
            .map_err(|e| format!("invalid offset: {e}"))
    }
}

/// Prints one line per extracted file
struct ConsoleSink {
    hash: bool,
    written: usize,
}

impl ConsoleSink {
    fn new(hash: bool) -> Self {
        Self { hash, written: 0 }
    }
}

impl ProgressSink for ConsoleSink {
    fn started(&mut self, total: usize) {
        info!("extracting {} embedded files", total);
    }

    fn entry_extracted(&mut self, entry: &BundleFileEntry, payload: &[u8]) {
        self.written += 1;
        if self.hash {
            let digest = blake3::hash(payload);
            println!(
                "Extracted {} ({} bytes, blake3 {})",
                entry.relative_path,
                payload.len(),
                &digest.to_hex()[..8]
            );
        } else {
            println!("Extracted {} ({} bytes)", entry.relative_path, payload.len());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Some(ref file) = cli.input.file {
        process_single_file(cli, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(cli, directory)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Map a run failure to the process exit status
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<debundle_core::Error>() {
        Some(debundle_core::Error::MarkerNotFound) => EXIT_OFFSET_NOT_FOUND,
        _ => 1,
    }
}

/// Process a single bundled executable
fn process_single_file(cli: &Cli, file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let bundle = match cli.offset {
        Some(offset) => {
            debug!("using supplied bundle offset {:#x}", offset);
            Bundle::from_file_at(file, offset)
                .with_context(|| format!("Failed to parse bundle: {}", file.display()))?
        }
        None => Bundle::from_file(file)
            .with_context(|| format!("Failed to parse bundle: {}", file.display()))?,
    };

    let header = bundle.header();
    println!("Bundle ID: {}", header.bundle_id);
    println!(
        "Version: {}.{}",
        header.major_version, header.minor_version
    );
    println!("Embedded files count: {}", header.embedded_files_count);

    if cli.list_only {
        list_entries(&bundle);
        return Ok(());
    }

    if cli.dry_run {
        for entry in bundle.entries() {
            println!(
                "Would extract: {}",
                cli.output.join(&entry.relative_path).display()
            );
        }
        return Ok(());
    }

    let mut sink = ConsoleSink::new(cli.hash);
    bundle
        .extract_to(&cli.output, &mut sink)
        .with_context(|| format!("Failed to extract bundle: {}", file.display()))?;
    info!("wrote {} files to {}", sink.written, cli.output.display());

    Ok(())
}

fn list_entries(bundle: &Bundle) {
    for entry in bundle.entries() {
        println!(
            "{:>12}  {:<20}  {}",
            entry.size, entry.file_type, entry.relative_path
        );
    }
}

/// Process a directory of executables recursively
fn process_directory(cli: &Cli, directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut bundles_found = 0;
    let mut binaries_seen = 0;

    // Walk the directory
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Skip directories
        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        // Try to determine if this is a binary executable at all
        if !is_likely_binary(path) {
            trace!("Skipping non-binary: {}", path.display());
            continue;
        }
        binaries_seen += 1;

        debug!("Probing binary: {}", path.display());
        match process_bundled_binary(cli, path) {
            Ok(true) => bundles_found += 1,
            Ok(false) => {}
            Err(e) => {
                // Log error but continue with other files
                warn!("Error processing {}: {}", path.display(), e);
            }
        }
    }

    info!(
        "Probed {} binaries, extracted {} bundles",
        binaries_seen, bundles_found
    );

    Ok(())
}

/// Probe one binary for a bundle; returns whether one was extracted
fn process_bundled_binary(cli: &Cli, path: &Path) -> Result<bool> {
    let bundle = match Bundle::from_file(path) {
        Ok(bundle) => bundle,
        Err(e) if e.is_recoverable() => {
            trace!("Not a bundle: {} ({})", path.display(), e);
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bundle");
    let output = cli.output.join(stem);

    println!(
        "Found bundle in {} ({} files)",
        path.display(),
        bundle.entries().len()
    );

    if cli.list_only {
        list_entries(&bundle);
        return Ok(true);
    }

    if cli.dry_run {
        for entry in bundle.entries() {
            println!("Would extract: {}", output.join(&entry.relative_path).display());
        }
        return Ok(true);
    }

    let mut sink = ConsoleSink::new(cli.hash);
    bundle.extract_to(&output, &mut sink)?;
    Ok(true)
}

/// Heuristic to determine if a file is likely a binary executable
fn is_likely_binary(path: &Path) -> bool {
    // Check by extension - skip obvious non-binaries
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let skip_extensions = [
            "txt", "md", "json", "yaml", "yml", "xml", "html", "css", "js", "ts", "py", "rb",
            "go", "rs", "c", "h", "cpp", "hpp", "java", "cs", "toml", "ini", "cfg", "conf",
            "log", "csv", "svg", "png", "jpg", "jpeg", "gif", "pdf", "zip", "tar", "gz", "bz2",
            "xz", "7z", "rar", "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd", "pdb",
        ];
        if skip_extensions.contains(&ext.to_lowercase().as_str()) {
            return false;
        }
    }

    // Check file size - a bundle can't fit under 1KB, and very large files
    // (> 2GB) exceed what a 32-bit manifest offset can address anyway
    if let Ok(metadata) = fs::metadata(path) {
        let size = metadata.len();
        if size < 1024 || size > 2 * 1024 * 1024 * 1024 {
            return false;
        }
    }

    // Try to read magic bytes to identify executable formats; apphost stubs
    // exist for PE, ELF and Mach-O
    if let Ok(mut file) = fs::File::open(path) {
        use std::io::Read;
        let mut magic = [0u8; 4];
        if file.read_exact(&mut magic).is_ok() {
            // PE (Windows) - MZ header
            if magic[0..2] == [b'M', b'Z'] {
                return true;
            }
            // ELF (Linux)
            if magic[0..4] == [0x7F, b'E', b'L', b'F'] {
                return true;
            }
            // Mach-O (macOS)
            if magic == [0xCF, 0xFA, 0xED, 0xFE]
                || magic == [0xCE, 0xFA, 0xED, 0xFE]
                || magic == [0xFE, 0xED, 0xFA, 0xCF]
                || magic == [0xFE, 0xED, 0xFA, 0xCE]
            {
                return true;
            }
        }
    }

    // If we can't determine, try it anyway if it has no extension
    path.extension().is_none()
}
