//! Device mapping (§4.1).
//!
//! Opens the backing file/block device for read/write, discovers its size,
//! and maps the whole thing into memory as one shared, writable region.
//! Every other module works against the byte slice this hands out; there
//! is no buffering layer above it.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use memmap2::MmapMut;

use crate::error::JgfsError;
use crate::SECT_SIZE;

/// An opened, memory-mapped backing device.
///
/// Dropping a `Device` flushes it first, mirroring the `atexit` shutdown
/// hook the original implementation registers at `jgfs_init` (§4.1): no
/// matter how a `Device` goes out of scope, dirty pages get a chance to
/// reach the backing store.
pub struct Device {
    file: File,
    mmap: MmapMut,
    dev_sectors: u64,
}

impl Device {
    /// Opens `path` for read/write and maps it in its entirety.
    ///
    /// Fails if the path cannot be opened, or if the device has fewer than
    /// two sectors (there must be room for the boot sector and the header).
    /// Warns, but does not fail, if the device length is not a multiple of
    /// [`SECT_SIZE`] - the trailing partial sector is simply unreachable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JgfsError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();

        if len < 2 * SECT_SIZE as u64 {
            return Err(JgfsError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "device has only {len} bytes, need at least {}",
                    2 * SECT_SIZE
                ),
            )));
        }
        if len % SECT_SIZE as u64 != 0 {
            log::warn!(
                "device length {len} is not a multiple of {SECT_SIZE}; trailing bytes are unreachable"
            );
        }

        // SAFETY: the file is exclusively owned by this `Device` for as
        // long as the mapping lives; nothing else in this process holds a
        // handle to it, and the single-writer model (§5) means no other
        // process is expected to mutate it concurrently.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            file,
            mmap,
            dev_sectors: len / SECT_SIZE as u64,
        })
    }

    /// Total number of whole sectors covered by the mapping.
    pub fn dev_sectors(&self) -> u64 {
        self.dev_sectors
    }

    /// The mapped region as an immutable byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// The mapped region as a mutable byte slice.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    /// Flushes dirty pages to the backing device.
    ///
    /// `msync`/`fsync` failures are warnings, not errors (§7) - there is no
    /// recovery available at this layer, and the original implementation
    /// treats them the same way (`jgfs_msync`/`jgfs_fsync` only `warn`).
    pub fn sync(&self) {
        if let Err(e) = self.mmap.flush() {
            log::warn!("msync failed: {e}");
        }
        if let Err(e) = self.file.sync_all() {
            log::warn!("fsync failed: {e}");
        }
    }

    /// Syncs, then releases the mapping and file handle.
    ///
    /// Consuming `self` makes repeated closes impossible to express, which
    /// is how this crate satisfies the "idempotent" requirement in §4.1:
    /// there is no second call to be idempotent against.
    pub fn close(self) {
        self.sync();
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.sync();
    }
}
