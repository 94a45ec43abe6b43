//! The mounted filesystem handle (§5, §6).
//!
//! [`Filesystem`] owns the mapped [`Device`] and the derived [`Geometry`],
//! and is the single point every other module hangs its `impl Filesystem`
//! block off of. Two entry points build one: [`Filesystem::new`] formats a
//! fresh image, [`Filesystem::init`] mounts an existing one.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::addressing;
use crate::device::Device;
use crate::error::JgfsError;
use crate::header::{self, Geometry};
use crate::raw::RawHeader;
use crate::{fat_entry, EntryKind, FAT_ROOT, HDR_SECT, JGFS_NAME_LIMIT};

/// A mounted JGFS filesystem: a mapped device plus its derived geometry.
pub struct Filesystem {
    device: Device,
    geometry: Geometry,
}

/// Summary statistics returned by [`Filesystem::statfs`], modeled on POSIX
/// `statvfs` the way the FUSE shim this crate is meant to sit under would
/// want them (§9's supplemented `statfs`).
#[derive(Debug, Clone, Copy)]
pub struct StatFs {
    pub block_size: u32,
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub total_inodes: u64,
    pub free_inodes: u64,
    pub name_max: u32,
}

fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

impl Filesystem {
    /// Formats a fresh filesystem on `path` (`jgfs_new`, §4.2).
    ///
    /// Writes the header, clears the FAT, marks cluster 0 `FAT_EOF` as the
    /// root directory's sole cluster, and zeroes that cluster so it starts
    /// out empty. `path`'s existing contents past the new image are left
    /// untouched; the caller is responsible for sizing the backing file or
    /// device to at least `s_total` sectors beforehand.
    pub fn new(
        path: impl AsRef<Path>,
        s_total: u32,
        s_rsvd: u16,
        s_per_c: u16,
    ) -> Result<Self, JgfsError> {
        if s_per_c == 0 {
            return Err(JgfsError::InvalidArgument);
        }

        let mut device = Device::open(path)?;
        if device.dev_sectors() < s_total as u64 {
            return Err(JgfsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "device has {} sectors, requested s_total={s_total}",
                    device.dev_sectors()
                ),
            )));
        }

        let geometry = Geometry::compute(s_total, s_rsvd, s_per_c);
        if geometry.fs_clusters == 0 {
            return Err(JgfsError::InvalidArgument);
        }

        let raw_header = header::build(&geometry, now_unix());
        let hdr_off = addressing::sect_offset(device.dev_sectors(), HDR_SECT);
        let hdr_bytes: &[u8] = bytemuck::bytes_of(&raw_header);
        device.as_bytes_mut()[hdr_off..hdr_off + hdr_bytes.len()].copy_from_slice(hdr_bytes);

        let fat_start = addressing::sect_offset(device.dev_sectors(), geometry.s_rsvd as u32);
        let fat_len = geometry.s_fat as usize * crate::SECT_SIZE;
        device.as_bytes_mut()[fat_start..fat_start + fat_len].fill(0);

        let mut fs = Self { device, geometry };
        fs.fat_write(FAT_ROOT, fat_entry::EOF);
        fs.dir_init(FAT_ROOT);

        Ok(fs)
    }

    /// Mounts an existing filesystem image (`jgfs_init`, §4.1-§4.2). Reads
    /// and validates the header; any mismatch is fatal (§7), since a bad
    /// header means the device isn't a JGFS filesystem at all.
    pub fn init(path: impl AsRef<Path>) -> Result<Self, JgfsError> {
        let device = Device::open(path)?;
        let hdr_off = addressing::sect_offset(device.dev_sectors(), HDR_SECT);
        let raw_header: &RawHeader =
            bytemuck::from_bytes(&device.as_bytes()[hdr_off..hdr_off + std::mem::size_of::<RawHeader>()]);
        let geometry = header::validate(raw_header, device.dev_sectors());

        Ok(Self { device, geometry })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub(crate) fn device(&self) -> &Device {
        &self.device
    }

    pub(crate) fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    /// Byte offset of `root_dir_ent` inside the header sector; the root
    /// directory's entry lives there rather than in any directory cluster
    /// (§9: the root has no parent entry of its own).
    pub(crate) fn header_root_entry_offset(&self) -> usize {
        let hdr_off = addressing::sect_offset(self.device.dev_sectors(), HDR_SECT);
        hdr_off + std::mem::offset_of!(RawHeader, root_dir_ent)
    }

    /// Bytes in one cluster.
    pub fn clust_size(&self) -> u32 {
        self.geometry.cluster_size()
    }

    /// Current time as the `u32` Unix-seconds value JGFS stores for
    /// `mtime`. Exposed so operations (create/rename/write) all stamp with
    /// a single consistent clock read.
    pub fn now(&self) -> u32 {
        now_unix()
    }

    /// Flushes dirty pages to the backing device without closing it.
    pub fn sync(&self) {
        self.device.sync();
    }

    /// Flushes and releases the mapping, consuming the handle.
    pub fn done(self) {
        self.device.close();
    }

    /// Aggregate space/inode usage, in the shape a `statfs(2)`-style call
    /// wants (§9's supplemented `statfs`). JGFS has no separate inode
    /// table, so "inodes" here means directory-entry slots: one per
    /// cluster, the same quantity that bounds file/directory count.
    pub fn statfs(&self) -> StatFs {
        let free = self.fat_count(fat_entry::FREE) as u64;
        let total = self.geometry.fs_clusters as u64;
        StatFs {
            block_size: self.clust_size(),
            total_blocks: total,
            free_blocks: free,
            total_inodes: total,
            free_inodes: free,
            name_max: JGFS_NAME_LIMIT as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::EntryName;
    use crate::SECT_SIZE;
    use tempfile::NamedTempFile;

    fn backing_file(sectors: u32) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        file.as_file()
            .set_len(sectors as u64 * SECT_SIZE as u64)
            .unwrap();
        file
    }

    #[test]
    fn new_then_init_roundtrips_geometry() {
        let file = backing_file(2880);
        {
            let fs = Filesystem::new(file.path(), 2880, 8, 2).unwrap();
            assert_eq!(fs.geometry().fs_clusters, fs.statfs().total_blocks as u16);
            fs.done();
        }
        let fs = Filesystem::init(file.path()).unwrap();
        assert_eq!(fs.geometry().s_total, 2880);
        assert_eq!(fs.geometry().s_rsvd, 8);
        assert_eq!(fs.geometry().s_per_c, 2);
    }

    #[test]
    fn fresh_filesystem_has_empty_root_and_full_free_space() {
        let file = backing_file(2880);
        let fs = Filesystem::new(file.path(), 2880, 8, 2).unwrap();
        assert_eq!(fs.dir_count(FAT_ROOT), 0);
        let stat = fs.statfs();
        assert_eq!(stat.free_blocks, stat.total_blocks - 1);
    }

    #[test]
    fn new_rejects_undersized_device() {
        let file = backing_file(64);
        assert!(matches!(
            Filesystem::new(file.path(), 2880, 8, 2),
            Err(JgfsError::Io(_))
        ));
    }

    #[test]
    fn root_entry_is_readable_through_header() {
        let file = backing_file(2880);
        let fs = Filesystem::new(file.path(), 2880, 8, 2).unwrap();
        let root = fs.read_entry(crate::directory::EntryHandle::Root);
        assert_eq!(root.kind, EntryKind::Directory);
        assert_eq!(root.begin, FAT_ROOT);
        let _ = EntryName::new("unused");
    }
}
