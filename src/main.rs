//! Main entry point for the stowzip CLI application.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use stowzip::bundle::{self, Manifest};
use stowzip::cli::{Cli, Command};
use stowzip::server::{self, ServerState};
use stowzip::zip::{DosDateTime, sanitize_entry_path};
use stowzip::{ArchiveBuilder, LocalFileReader, ZipExtractor, source};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match &cli.command {
        Command::Create {
            output,
            mtime,
            paths,
        } => {
            let entries = source::collect_entries(paths.as_slice()).await?;
            let mut builder = ArchiveBuilder::new();
            if let Some(mtime) = mtime {
                builder = builder.modified(DosDateTime::from_datetime(mtime));
            }
            let zip = builder.build(&entries)?;
            write_archive(output, &zip).await?;
            if !cli.is_quiet() {
                println!("{}: {} files, {} bytes", output.display(), entries.len(), zip.len());
            }
        }
        Command::Bundle { manifest, output } => {
            let manifest = Manifest::load(manifest).await?;
            let generated_at = Utc::now();
            let entries = bundle::build_entries(&manifest, &generated_at)?;
            let zip = ArchiveBuilder::new().build(&entries)?;
            let output = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(bundle::archive_file_name(&generated_at)));
            write_archive(&output, &zip).await?;
            if !cli.is_quiet() {
                println!("{}: {} files, {} bytes", output.display(), entries.len(), zip.len());
            }
        }
        Command::List { archive, verbose } => list_files(&open(archive)?, *verbose).await?,
        Command::Test { archive } => test_archive(&open(archive)?, &cli).await?,
        Command::Extract {
            archive,
            extract_dir,
            overwrite,
            pipe,
        } => {
            let extractor = open(archive)?;
            if *pipe {
                pipe_all(&extractor).await?;
            } else {
                extract_all(&extractor, extract_dir, *overwrite, &cli).await?;
            }
        }
        Command::Serve { manifest, addr } => {
            let state = Arc::new(ServerState {
                manifest_path: manifest.clone(),
            });
            let listener = tokio::net::TcpListener::bind(*addr)
                .await
                .with_context(|| format!("cannot listen on {}", addr))?;
            tracing::info!(%addr, manifest = %manifest.display(), "serving /download-zip");
            axum::serve(listener, server::create_router(state))
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
        }
    }

    Ok(())
}

fn open(archive: &Path) -> Result<ZipExtractor<LocalFileReader>> {
    Ok(ZipExtractor::new(Arc::new(LocalFileReader::new(archive)?)))
}

async fn write_archive(output: &Path, zip: &[u8]) -> Result<()> {
    tokio::fs::write(output, zip)
        .await
        .with_context(|| format!("cannot write {}", output.display()))
}

/// `-l` style listing, or a table with length, timestamp and CRC with `-v`.
async fn list_files(extractor: &ZipExtractor<LocalFileReader>, verbose: bool) -> Result<()> {
    let entries = extractor.list_files().await?;

    if !verbose {
        for entry in &entries {
            println!("{}", entry.file_name);
        }
        return Ok(());
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>8}  Name",
        "Length", "Date", "Time", "CRC-32"
    );
    println!("{}", "-".repeat(60));

    let mut total = 0u64;
    let mut file_count = 0usize;
    for entry in &entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        println!(
            "{:>10}  {:04}-{:02}-{:02}  {:02}:{:02}  {:08x}  {}",
            entry.uncompressed_size, year, month, day, hour, minute, entry.crc32, entry.file_name
        );
        if !entry.is_directory {
            total += entry.uncompressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(60));
    println!("{:>10}  {:>29}  {} files", total, "", file_count);
    Ok(())
}

async fn test_archive(extractor: &ZipExtractor<LocalFileReader>, cli: &Cli) -> Result<()> {
    let entries = extractor.list_files().await?;
    let mut failures = 0usize;

    for entry in entries.iter().filter(|e| !e.is_directory) {
        match extractor.test_entry(entry).await {
            Ok(()) => {
                if !cli.is_quiet() {
                    println!("    testing: {:<40} OK", entry.file_name);
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("    testing: {:<40} {:#}", entry.file_name, e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} entries failed", failures, entries.len());
    }
    if !cli.is_very_quiet() {
        println!("No errors detected in {} entries.", entries.len());
    }
    Ok(())
}

async fn extract_all(
    extractor: &ZipExtractor<LocalFileReader>,
    dest: &Path,
    overwrite: bool,
    cli: &Cli,
) -> Result<()> {
    for entry in extractor.list_files().await? {
        let target = dest.join(sanitize_entry_path(&entry.file_name)?);
        if !entry.is_directory && !overwrite && tokio::fs::try_exists(&target).await? {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", entry.file_name);
            }
            continue;
        }

        if !cli.is_quiet() {
            println!("  extracting: {}", entry.file_name);
        }
        extractor.extract_to_dir(&entry, dest).await?;
    }
    Ok(())
}

/// Write every file's contents to stdout. With more than one file, each is
/// preceded by a `--- name ---` marker line.
async fn pipe_all(extractor: &ZipExtractor<LocalFileReader>) -> Result<()> {
    let files: Vec<_> = extractor
        .list_files()
        .await?
        .into_iter()
        .filter(|e| !e.is_directory)
        .collect();
    let show_filename = files.len() > 1;

    let mut stdout = tokio::io::stdout();
    for entry in &files {
        if show_filename {
            stdout
                .write_all(format!("--- {} ---\n", entry.file_name).as_bytes())
                .await?;
            stdout.flush().await?;
        }
        extractor.extract_to_stdout(entry).await?;
    }
    Ok(())
}
