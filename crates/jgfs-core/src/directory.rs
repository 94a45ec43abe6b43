//! Directory primitives (§4.5).
//!
//! A directory cluster is a packed array of 32-byte entries filling the
//! whole cluster; with the spec's worked geometry (`s_per_c = 2`) that's 32
//! entries per directory. These primitives enumerate, look up, insert, and
//! clear entries inside one such cluster. They never cross a cluster
//! boundary - JGFS directories are exactly one cluster (§9).

use crate::addressing;
use crate::error::fatal;
use crate::fs::Filesystem;
use crate::raw::RawDirEntry;
use crate::{EntryKind, JgfsError, JGFS_NAME_LIMIT, NAME_FIELD_LEN};

/// A zero-padded, validated directory entry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryName {
    raw: [u8; NAME_FIELD_LEN],
}

impl EntryName {
    /// Builds a name from a `&str`, validating length and character set
    /// (§3 invariant 7: `[A-Za-z0-9_.]{1,19}`).
    pub fn new(s: &str) -> Result<Self, JgfsError> {
        if s.is_empty() {
            fatal!("jgfs: empty name passed to internal creation");
        }
        if s.len() > JGFS_NAME_LIMIT {
            return Err(JgfsError::NameTooLong);
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
        {
            return Err(JgfsError::InvalidArgument);
        }

        let mut raw = [0u8; NAME_FIELD_LEN];
        raw[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self { raw })
    }

    pub(crate) fn from_raw(raw: [u8; NAME_FIELD_LEN]) -> Self {
        Self { raw }
    }

    /// The name with its zero padding trimmed off.
    pub fn as_str(&self) -> &str {
        let len = self.raw.iter().position(|&b| b == 0).unwrap_or(self.raw.len());
        // SAFETY: construction only ever admits ASCII alphanumerics, `_`,
        // and `.`, so this is always valid UTF-8.
        std::str::from_utf8(&self.raw[..len]).expect("jgfs name is always ASCII")
    }

    pub(crate) fn raw(&self) -> [u8; NAME_FIELD_LEN] {
        self.raw
    }

    /// `true` for the all-zero name that marks a directory slot free.
    pub fn is_free(&self) -> bool {
        self.raw[0] == 0
    }
}

/// The "cooked" in-memory form of a directory entry (§3).
#[derive(Debug, Clone, Copy)]
pub struct DirEntry {
    pub name: EntryName,
    pub kind: EntryKind,
    pub attr: u8,
    pub mtime: u32,
    pub size: u32,
    /// First cluster, or `fat_entry::OOB` for an empty/unallocated entry.
    pub begin: u16,
}

impl DirEntry {
    fn from_raw(raw: &RawDirEntry) -> Self {
        let kind = EntryKind::from_raw(raw.kind)
            .unwrap_or_else(|| fatal!("jgfs: unknown directory-entry type {:#04x}", raw.kind));
        Self {
            name: EntryName::from_raw(raw.name),
            kind,
            attr: raw.attr,
            mtime: u32::from_le_bytes(raw.mtime),
            size: u32::from_le_bytes(raw.size),
            begin: u16::from_le_bytes(raw.begin),
        }
    }

    fn to_raw(self) -> RawDirEntry {
        RawDirEntry {
            name: self.name.raw(),
            kind: self.kind as u8,
            attr: self.attr,
            mtime: self.mtime.to_le_bytes(),
            size: self.size.to_le_bytes(),
            begin: self.begin.to_le_bytes(),
        }
    }
}

/// Names or locates a directory entry slot: either the root, whose entry
/// lives inside the header, or a slot inside some directory cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryHandle {
    Root,
    Child { cluster: u16, slot: u16 },
}

const RAW_ENTRY_SIZE: usize = std::mem::size_of::<RawDirEntry>();

impl Filesystem {
    /// Number of 32-byte entry slots a directory cluster holds.
    pub fn entries_per_cluster(&self) -> u16 {
        (self.geometry().cluster_size() as usize / RAW_ENTRY_SIZE) as u16
    }

    fn entry_offset(&self, handle: EntryHandle) -> usize {
        match handle {
            EntryHandle::Root => {
                self.header_root_entry_offset()
            }
            EntryHandle::Child { cluster, slot } => {
                let base = addressing::clust_offset(self.geometry(), self.device().dev_sectors(), cluster);
                base + slot as usize * RAW_ENTRY_SIZE
            }
        }
    }

    /// Reads the entry at `handle`.
    pub fn read_entry(&self, handle: EntryHandle) -> DirEntry {
        let off = self.entry_offset(handle);
        let bytes = self.device().as_bytes();
        let raw: &RawDirEntry = bytemuck::from_bytes(&bytes[off..off + RAW_ENTRY_SIZE]);
        DirEntry::from_raw(raw)
    }

    /// Writes `entry` to `handle`.
    pub fn write_entry(&mut self, handle: EntryHandle, entry: DirEntry) {
        let off = self.entry_offset(handle);
        let bytes = self.device_mut().as_bytes_mut();
        let raw: &mut RawDirEntry = bytemuck::from_bytes_mut(&mut bytes[off..off + RAW_ENTRY_SIZE]);
        *raw = entry.to_raw();
    }

    /// Zeroes the 32-byte slot at `handle` - the way entries are destroyed
    /// (§3 "Directory entries are ... destroyed by zeroing the 32-byte
    /// slot"). Zeroing clears `name[0]`, marking the slot free.
    pub(crate) fn clear_entry(&mut self, handle: EntryHandle) {
        let off = self.entry_offset(handle);
        let bytes = self.device_mut().as_bytes_mut();
        bytes[off..off + RAW_ENTRY_SIZE].fill(0);
    }

    /// Zeroes every slot in `cluster`, turning it into an empty directory.
    pub(crate) fn dir_init(&mut self, cluster: u16) {
        let off = addressing::clust_offset(self.geometry(), self.device().dev_sectors(), cluster);
        let len = self.geometry().cluster_size() as usize;
        self.device_mut().as_bytes_mut()[off..off + len].fill(0);
    }

    /// Iterates the in-use slots of directory cluster `cluster`.
    pub fn dir_entries(&self, cluster: u16) -> impl Iterator<Item = (u16, DirEntry)> + '_ {
        (0..self.entries_per_cluster()).filter_map(move |slot| {
            let handle = EntryHandle::Child { cluster, slot };
            let entry = self.read_entry(handle);
            (!entry.name.is_free()).then_some((slot, entry))
        })
    }

    /// Calls `f(slot, entry)` for each in-use slot in `cluster`, stopping
    /// early and returning `f`'s result the first time it is non-zero
    /// (§4.5); mirrors the shim-facing `dir_foreach(cluster, fn, ctx)`
    /// contract in §6 so a filler callback (`readdir`) can be wired up
    /// directly against it.
    pub fn dir_foreach<F>(&self, cluster: u16, mut f: F) -> i32
    where
        F: FnMut(u16, &DirEntry) -> i32,
    {
        for (slot, entry) in self.dir_entries(cluster) {
            let rtn = f(slot, &entry);
            if rtn != 0 {
                return rtn;
            }
        }
        0
    }

    /// Number of in-use slots in `cluster`.
    pub fn dir_count(&self, cluster: u16) -> u16 {
        self.dir_entries(cluster).count() as u16
    }

    /// Looks up `name` inside `cluster`. The first exact match wins; the
    /// comparison spans the full [`NAME_FIELD_LEN`]-byte field (including
    /// the implicit terminator), so a stored 19-character name can never
    /// be mistaken for a prefix match of a longer one (§9's Open Question).
    pub fn lookup_child(&self, cluster: u16, name: &EntryName) -> Option<(u16, DirEntry)> {
        self.dir_entries(cluster)
            .find(|(_, entry)| entry.name.raw() == name.raw())
    }

    /// Inserts a new entry named `name` into `cluster`. Fails with
    /// [`JgfsError::Exists`] if the name is already taken, or
    /// [`JgfsError::NoSpace`] if every slot is occupied.
    pub fn create_ent(
        &mut self,
        cluster: u16,
        name: EntryName,
        kind: EntryKind,
        mtime: u32,
        size: u32,
        begin: u16,
    ) -> Result<(u16, DirEntry), JgfsError> {
        if self.lookup_child(cluster, &name).is_some() {
            return Err(JgfsError::Exists);
        }

        let free_slot = (0..self.entries_per_cluster()).find(|&slot| {
            self.read_entry(EntryHandle::Child { cluster, slot })
                .name
                .is_free()
        });

        let Some(slot) = free_slot else {
            return Err(JgfsError::NoSpace);
        };

        let entry = DirEntry {
            name,
            kind,
            attr: 0,
            mtime,
            size,
            begin,
        };
        self.write_entry(EntryHandle::Child { cluster, slot }, entry);
        Ok((slot, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SECT_SIZE;
    use tempfile::NamedTempFile;

    fn make_fs(total_sectors: u32, s_rsvd: u16, s_per_c: u16) -> Filesystem {
        let file = NamedTempFile::new().unwrap();
        file.as_file()
            .set_len(total_sectors as u64 * SECT_SIZE as u64)
            .unwrap();
        Filesystem::new(file.path(), total_sectors, s_rsvd, s_per_c).unwrap()
    }

    #[test]
    fn name_rejects_too_long_and_bad_chars() {
        assert!(EntryName::new(&"x".repeat(19)).is_ok());
        assert!(matches!(
            EntryName::new(&"x".repeat(20)),
            Err(JgfsError::NameTooLong)
        ));
        assert!(matches!(
            EntryName::new("bad name"),
            Err(JgfsError::InvalidArgument)
        ));
    }

    #[test]
    fn create_ent_rejects_duplicates_and_fills_cluster() {
        let mut fs = make_fs(64, 4, 1);
        let root = crate::FAT_ROOT;
        fs.dir_init(root);

        fs.create_ent(
            root,
            EntryName::new("a").unwrap(),
            EntryKind::Regular,
            0,
            0,
            0xFFFF,
        )
        .unwrap();

        assert!(matches!(
            fs.create_ent(root, EntryName::new("a").unwrap(), EntryKind::Regular, 0, 0, 0xFFFF),
            Err(JgfsError::Exists)
        ));

        let per_cluster = fs.entries_per_cluster();
        for i in 1..per_cluster {
            let name = EntryName::new(&format!("f{i}")).unwrap();
            fs.create_ent(root, name, EntryKind::Regular, 0, 0, 0xFFFF)
                .unwrap();
        }
        assert!(matches!(
            fs.create_ent(
                root,
                EntryName::new("overflow").unwrap(),
                EntryKind::Regular,
                0,
                0,
                0xFFFF
            ),
            Err(JgfsError::NoSpace)
        ));
        assert_eq!(fs.dir_count(root), per_cluster);
    }
}
