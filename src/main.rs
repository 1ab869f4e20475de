//! Main entry point for the scsarc CLI application.
//!
//! Lists, prints and extracts entries of one SCS game archive.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use scsarc::glob::{glob_match, has_glob_chars};
use scsarc::{
    ArchiveHandle, ArchiveOptions, Cli, DecodePolicy, Entries, FileEntry, SignaturePolicy,
    hash_path,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    if cli.hash {
        println!("{:016x}", hash_path(&cli.file));
        return Ok(());
    }

    let mut options = ArchiveOptions::default();
    for pattern in &cli.trim_root {
        options = options.with_root_trim(pattern.as_str());
    }
    if cli.strict {
        options = options.with_signature_policy(SignaturePolicy::Strict);
    }
    if cli.passthrough {
        options = options.with_decode_policy(DecodePolicy::Passthrough);
    }

    let mut archive = ArchiveHandle::open_with(&cli.file, &options)
        .with_context(|| format!("cannot open {}", cli.file))?;
    let result = process_archive(&mut archive, &cli);
    archive.dispose();
    result
}

/// Process an archive based on CLI options.
///
/// - List mode (`-l` or `-v`): display archive contents
/// - Extract mode: extract files matching the specified filters
fn process_archive(archive: &mut ArchiveHandle, cli: &Cli) -> Result<()> {
    let entries = archive
        .parse_entries()
        .with_context(|| format!("cannot read the index of {}", cli.file))?
        .clone();

    if cli.list || cli.verbose {
        list_entries(&entries, cli.verbose);
        return Ok(());
    }

    let mut files_to_extract: Vec<&FileEntry> = entries
        .files
        .values()
        .filter(|file| is_selected(&file.path, cli))
        .collect();
    files_to_extract.sort_by(|a, b| a.path.cmp(&b.path));

    let multiple_files = cli.pipe && files_to_extract.len() > 1;
    for file in files_to_extract {
        extract_file(archive, file, cli, multiple_files)?;
    }

    Ok(())
}

/// Apply positional filters and `-x` exclusions to one path.
fn is_selected(path: &str, cli: &Cli) -> bool {
    if !cli.files.is_empty() {
        let matches = cli.files.iter().any(|f| {
            if has_glob_chars(f) {
                glob_match(f, path)
            } else {
                let basename = path.rsplit('/').next().unwrap_or(path);
                path == f || basename == f
            }
        });
        if !matches {
            return false;
        }
    }

    !cli
        .exclude
        .iter()
        .any(|x| path.contains(x.as_str()) || glob_match(x, path))
}

/// List entries in path order.
///
/// - Simple format (`-l`): one path per line, directories with a trailing `/`
/// - Verbose format (`-v`): size, compressed size, method and hash columns
fn list_entries(entries: &Entries, verbose: bool) {
    if verbose {
        println!(
            "{:>10}  {:>10}  {:>8}  {:>16}  Name",
            "Length", "Size", "Method", "Hash"
        );
        println!("{}", "-".repeat(72));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for path in entries.directories.paths() {
        if path.is_empty() {
            continue;
        }
        if let Some(dir) = entries.directory_by_path(path) {
            if verbose {
                println!(
                    "{:>10}  {:>10}  {:>8}  {:016x}  {}/",
                    "", "", "dir", dir.hash, path
                );
            } else {
                println!("{}/", path);
            }
        }
    }

    for path in entries.files.paths() {
        let Some(file) = entries.file_by_path(path) else {
            continue;
        };
        if verbose {
            println!(
                "{:>10}  {:>10}  {:>8}  {:016x}  {}",
                file.payload.uncompressed_size,
                file.payload.compressed_size,
                file.payload.method.to_string(),
                file.hash,
                path
            );
            total_uncompressed += file.payload.uncompressed_size;
            total_compressed += file.payload.compressed_size;
            file_count += 1;
        } else {
            println!("{}", path);
        }
    }

    if verbose {
        println!("{}", "-".repeat(72));
        println!(
            "{:>10}  {:>10}  {} files, {} read from archive",
            total_uncompressed,
            total_compressed,
            file_count,
            format_size(total_compressed)
        );
    }
}

/// Extract a single file from the archive.
///
/// - Pipe mode (`-p`): write to stdout instead of a file
/// - Custom output directory (`-d`)
/// - Overwrite control (`-n`, `-o`)
fn extract_file(
    archive: &ArchiveHandle,
    file: &FileEntry,
    cli: &Cli,
    show_filename: bool,
) -> Result<()> {
    if cli.pipe {
        let data = archive
            .read(file)
            .with_context(|| format!("cannot read {}", file.path))?;
        let mut stdout = std::io::stdout().lock();
        if show_filename {
            writeln!(stdout, "--- {} ---", file.path)?;
        }
        stdout.write_all(&data)?;
        return Ok(());
    }

    if file.path.split('/').any(|segment| segment == "..") {
        eprintln!("Skipping: {} (path escapes the output directory)", file.path);
        return Ok(());
    }

    let output_path = match cli.extract_dir {
        Some(ref dir) => PathBuf::from(dir).join(&file.path),
        None => PathBuf::from(&file.path),
    };

    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", file.path);
            }
            return Ok(());
        }

        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", file.path);
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", file.path);
    }

    let data = archive
        .read(file)
        .with_context(|| format!("cannot read {}", file.path))?;
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&output_path, data)
        .with_context(|| format!("cannot write {}", output_path.display()))?;

    Ok(())
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
