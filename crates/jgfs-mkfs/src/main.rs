//! `mkfs.jgfs` - formats a device or regular file as an empty JGFS
//! filesystem. Argument parsing and process wiring live here; the
//! construction algorithm itself is `jgfs_core::Filesystem::new`.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

/// Format a device or file as a JGFS filesystem.
#[derive(Debug, Parser)]
#[command(name = "mkfs.jgfs", version, about)]
struct Args {
    /// Device or regular file to format.
    device: PathBuf,

    /// Total sectors the new filesystem should span. Defaults to the
    /// device's current size.
    #[arg(long = "total-sectors")]
    total_sectors: Option<u32>,

    /// Sectors reserved before the FAT area (sector 0 is the opaque boot
    /// area, sector 1 is the header).
    #[arg(long = "reserved-sectors", default_value_t = 8)]
    reserved_sectors: u16,

    /// Sectors per cluster.
    #[arg(long = "sectors-per-cluster", default_value_t = 2)]
    sectors_per_cluster: u16,

    /// Format even if `device` is a regular file that already exists and
    /// is non-empty. The original `mkfs.jgfs` has no such guard; this flag
    /// exists so an accidental re-format of a populated image requires
    /// explicit intent.
    #[arg(long, short)]
    force: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    let metadata = std::fs::metadata(&args.device)
        .with_context(|| format!("cannot stat {}", args.device.display()))?;

    if metadata.is_file() && metadata.len() > 0 && !args.force {
        bail!(
            "{} already exists and is non-empty; pass --force to overwrite",
            args.device.display()
        );
    }

    let dev_sectors = (metadata.len() / jgfs_core::SECT_SIZE as u64) as u32;
    let total_sectors = args.total_sectors.unwrap_or(dev_sectors);

    if total_sectors == 0 {
        bail!(
            "{} has no usable sectors; pass --total-sectors explicitly",
            args.device.display()
        );
    }

    log::info!(
        "formatting {} ({total_sectors} sectors, {} reserved, {} per cluster)",
        args.device.display(),
        args.reserved_sectors,
        args.sectors_per_cluster,
    );

    let fs = jgfs_core::Filesystem::new(
        &args.device,
        total_sectors,
        args.reserved_sectors,
        args.sectors_per_cluster,
    )
    .with_context(|| format!("failed to format {}", args.device.display()))?;

    let stat = fs.statfs();
    fs.sync();
    println!(
        "{}: {} clusters of {} bytes, {} free",
        args.device.display(),
        stat.total_blocks,
        stat.block_size,
        stat.free_blocks,
    );

    Ok(())
}

/// Opens `path` for truncation-free writing, creating it if absent, sized
/// to hold `sectors` sectors. Used by tests that need a backing file
/// rather than a real block device; the binary itself only ever formats
/// paths the caller already sized (a real device, or a file they `dd`'d).
#[cfg(test)]
fn ensure_sized(path: &std::path::Path, sectors: u32) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;
    file.set_len(sectors as u64 * jgfs_core::SECT_SIZE as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn run_formats_a_fresh_file() {
        let file = NamedTempFile::new().unwrap();
        ensure_sized(file.path(), 2880).unwrap();

        let args = Args {
            device: file.path().to_path_buf(),
            total_sectors: Some(2880),
            reserved_sectors: 8,
            sectors_per_cluster: 2,
            force: true,
        };
        run(args).unwrap();

        let fs = jgfs_core::Filesystem::init(file.path()).unwrap();
        assert_eq!(fs.geometry().s_total, 2880);
    }

    #[test]
    fn run_refuses_nonempty_file_without_force() {
        let file = NamedTempFile::new().unwrap();
        ensure_sized(file.path(), 2880).unwrap();
        std::fs::write(file.path(), b"not empty").unwrap();

        let args = Args {
            device: file.path().to_path_buf(),
            total_sectors: Some(2880),
            reserved_sectors: 8,
            sectors_per_cluster: 2,
            force: false,
        };
        assert!(run(args).is_err());
    }
}
