//! Main entry point for the ffu2img CLI application.
//!
//! This binary provides a command-line interface for replaying FFU
//! firmware containers into raw disk image files.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use ffu2img::ffu::FfuMeta;
use ffu2img::{Cli, FfuFlasher, LocalFileReader, LocalImageWriter, ReadAt};

/// Application entry point.
///
/// Parses command-line arguments, reads the container's metadata, and
/// dispatches to the listing, size-query or flash handler.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let reader = Arc::new(LocalFileReader::new(Path::new(&cli.ffu))?);
    let flasher = FfuFlasher::new(reader);

    let meta = flasher
        .read_meta()
        .await
        .with_context(|| format!("failed to parse {}", cli.ffu))?;

    // List mode: display container contents and exit
    if cli.list {
        return list_contents(&flasher, &meta).await;
    }

    let size = flasher
        .estimate_device_size(&meta)
        .await
        .context("failed to size the target device from the final partition table")?;

    // Size query mode: print the raw byte count for scripting
    if cli.size_only {
        println!("{size}");
        return Ok(());
    }

    flash(&flasher, &meta, size, &cli).await
}

/// Replay the container's payload into the output image.
///
/// The image file is created at the estimated device size before any
/// chunk is written, so end-addressed payload locations resolve against
/// the final length.
///
/// # Arguments
///
/// * `flasher` - The replay driver for the opened container
/// * `meta` - Parsed container metadata
/// * `size` - Estimated device size in bytes
/// * `cli` - Parsed command-line arguments
async fn flash<R: ReadAt>(
    flasher: &FfuFlasher<R>,
    meta: &FfuMeta,
    size: u64,
    cli: &Cli,
) -> Result<()> {
    let Some(ref image_path) = cli.image else {
        bail!("no output image given (use -l to list, -s to print the size)");
    };

    if Path::new(image_path).exists() && !cli.overwrite {
        bail!("{image_path} exists (use -o to overwrite)");
    }

    if !cli.is_quiet() {
        eprintln!("target device size: {}", format_size(size));
    }

    let image = LocalImageWriter::create(Path::new(image_path), size)?;
    flasher.copy_blocks(meta, &image).await?;

    if !cli.is_quiet() {
        let chunks: usize = meta.stores.iter().map(|s| s.entries.len()).sum();
        let payload: u64 = meta
            .stores
            .iter()
            .flat_map(|s| {
                s.entries
                    .iter()
                    .map(|e| e.block_count as u64 * s.header.block_size as u64)
            })
            .sum();
        eprintln!(
            "wrote {} chunks ({}) to {}",
            chunks,
            format_size(payload),
            image_path
        );
    }

    Ok(())
}

/// List the container's stores and the partitions of the final table.
///
/// Prints a summary line per store followed by a table of the used
/// partition slots from the store's final GPT.
async fn list_contents<R: ReadAt>(flasher: &FfuFlasher<R>, meta: &FfuMeta) -> Result<()> {
    println!("container: {}", format_size(flasher.container_size()));
    println!(
        "chunk size: {}, payload at {:#x}",
        format_size(meta.security.chunk_size()),
        meta.data_offset
    );

    for store in &meta.stores {
        let header = &store.header;
        println!(
            "\nstore: {} (v{}.{}, full flash v{}.{})",
            header.platform_id_str(),
            header.major_version,
            header.minor_version,
            header.full_flash_major_version,
            header.full_flash_minor_version
        );
        println!(
            "  block size {}, {} write descriptors, {} validate descriptors",
            format_size(header.block_size as u64),
            header.write_descriptor_count,
            header.validate_descriptor_count
        );
    }

    let gpt = flasher.final_gpt(meta).await?;
    println!(
        "\ndisk {} ({} sectors)",
        gpt.header.disk_guid,
        gpt.header.backup_lba + 1
    );
    println!(
        "{:>12}  {:>12}  {:>10}  Name",
        "First LBA", "Last LBA", "Size"
    );
    println!("{}", "-".repeat(60));

    for partition in gpt.entries.iter().flatten() {
        let sectors = partition.last_lba.saturating_sub(partition.first_lba) + 1;
        println!(
            "{:>12}  {:>12}  {:>10}  {}",
            partition.first_lba,
            partition.last_lba,
            format_size(sectors * ffu2img::gpt::SECTOR_SIZE),
            partition.name
        );
    }

    Ok(())
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
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
