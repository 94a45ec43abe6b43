//! High-level operations (§4.8): `create_file`, `create_dir`,
//! `create_symlink`, `move_ent`, `delete_ent`, plus the directory-entry
//! wrappers around grow/shrink and the `utimens` equivalent. These are the
//! operations an external shim calls directly (§6); everything below them
//! (directory primitives, the resolver, FAT chain mutation) is plumbing.

use crate::directory::{DirEntry, EntryHandle, EntryName};
use crate::fat_entry;
use crate::fs::Filesystem;
use crate::{EntryKind, JgfsError};

fn chain_clusters_for(kind: EntryKind, size: u32, cluster_size: u32) -> u32 {
    match kind {
        // A symlink chain is exactly one cluster regardless of the target
        // length, which must fit in `cluster_size - 1` bytes (§3 invariant
        // 4, §4.8).
        EntryKind::Symlink => 1,
        _ => size.div_ceil(cluster_size),
    }
}

impl Filesystem {
    /// `create_file(parent, name)` (§4.8): builds a zero-length regular
    /// file entry with `begin = FAT_OOB`, i.e. unallocated.
    pub fn create_file(
        &mut self,
        parent: u16,
        name: &str,
    ) -> Result<(EntryHandle, DirEntry), JgfsError> {
        let name = EntryName::new(name)?;
        let now = self.now();
        let (slot, entry) =
            self.create_ent(parent, name, EntryKind::Regular, now, 0, fat_entry::OOB)?;
        Ok((EntryHandle::Child { cluster: parent, slot }, entry))
    }

    /// `create_dir(parent, name)` (§4.8): verifies a free cluster exists
    /// *before* inserting the directory entry, so construction can never
    /// leave an entry pointing at `FAT_OOB` (§5's partial-failure note).
    pub fn create_dir(
        &mut self,
        parent: u16,
        name: &str,
    ) -> Result<(EntryHandle, DirEntry), JgfsError> {
        let name = EntryName::new(name)?;
        let clust = self.fat_find(fat_entry::FREE).ok_or(JgfsError::NoSpace)?;
        let now = self.now();
        let size = self.clust_size();

        let created = self.create_ent(parent, name, EntryKind::Directory, now, size, clust);
        let (slot, mut entry) = match created {
            Ok(v) => v,
            Err(e) => return Err(e),
        };

        self.fat_write(clust, fat_entry::EOF);
        self.dir_init(clust);
        entry.begin = clust;

        Ok((EntryHandle::Child { cluster: parent, slot }, entry))
    }

    /// `create_symlink(parent, name, target)` (§4.8): `target` is written
    /// NUL-padded into the single cluster allocated for it; must fit in
    /// `cluster_size - 1` bytes to leave room for the implicit terminator.
    pub fn create_symlink(
        &mut self,
        parent: u16,
        name: &str,
        target: &str,
    ) -> Result<(EntryHandle, DirEntry), JgfsError> {
        let name = EntryName::new(name)?;
        let cluster_size = self.clust_size() as usize;
        if target.is_empty() || target.len() > cluster_size - 1 {
            return Err(JgfsError::InvalidArgument);
        }

        let clust = self.fat_find(fat_entry::FREE).ok_or(JgfsError::NoSpace)?;
        let now = self.now();

        let (slot, mut entry) = self.create_ent(
            parent,
            name,
            EntryKind::Symlink,
            now,
            target.len() as u32,
            clust,
        )?;

        self.fat_write(clust, fat_entry::EOF);
        self.dir_init(clust);
        self.write_symlink_target(clust, target);
        entry.begin = clust;

        Ok((EntryHandle::Child { cluster: parent, slot }, entry))
    }

    fn write_symlink_target(&mut self, clust: u16, target: &str) {
        let off = crate::addressing::clust_offset(self.geometry(), self.device().dev_sectors(), clust);
        let len = self.clust_size() as usize;
        let bytes = self.device_mut().as_bytes_mut();
        bytes[off..off + len].fill(0);
        bytes[off..off + target.len()].copy_from_slice(target.as_bytes());
    }

    /// Reads back a symlink's target (the mirror of `write_symlink_target`,
    /// used by the out-of-scope shim's `readlink`; exposed here since the
    /// core already owns the cluster it lives in).
    pub fn read_symlink_target(&self, entry: &DirEntry) -> Result<String, JgfsError> {
        if entry.kind != EntryKind::Symlink {
            return Err(JgfsError::InvalidArgument);
        }
        let off = crate::addressing::clust_offset(self.geometry(), self.device().dev_sectors(), entry.begin);
        let bytes = self.device().as_bytes();
        let len = entry.size as usize;
        let target = &bytes[off..off + len];
        Ok(String::from_utf8_lossy(target).into_owned())
    }

    /// `ops::set_mtime` (`utimens`, supplemented from `original_source`):
    /// assigns `mtime` with no other side effect, mirroring `jg_utimens`
    /// exactly.
    pub fn set_mtime(&mut self, handle: EntryHandle, mtime: u32) {
        let mut entry = self.read_entry(handle);
        entry.mtime = mtime;
        self.write_entry(handle, entry);
    }

    /// `reduce(ent, new_size)` / `enlarge(ent, new_size)` (§4.7, §6),
    /// dispatched on the direction of the change and wired to the
    /// directory entry rather than a bare chain. Updates `size` (and
    /// `begin`, for `reduce` to zero and `enlarge` from zero) in place.
    ///
    /// A partial `enlarge` (the FAT runs out of free clusters partway
    /// through) still commits: `size`/`begin` are written to reflect
    /// whatever the chain actually grew to, not what was asked for, before
    /// `NoSpace` is returned (§4.7 step 2, §5). Leaving the commit out
    /// would strand the clusters `enlarge` already linked - the entry would
    /// still claim `size = old_size` while those clusters sit allocated and
    /// unreachable from any entry, breaking the chain/cluster bijection.
    pub fn resize_entry(&mut self, handle: EntryHandle, new_size: u32) -> Result<(), JgfsError> {
        let mut entry = self.read_entry(handle);
        if new_size == entry.size {
            return Ok(());
        }

        let cl = self.clust_size();
        if new_size < entry.size {
            let new_clusters = chain_clusters_for(entry.kind, new_size, cl);
            entry.begin = self.reduce(entry.begin, new_clusters);
            entry.size = new_size;
            self.write_entry(handle, entry);
            Ok(())
        } else {
            let old_size = entry.size;
            let new_clusters = chain_clusters_for(entry.kind, new_size, cl);
            let outcome = self.enlarge(entry.begin, new_clusters);
            entry.begin = outcome.begin;
            entry.size = match outcome.error {
                Some(_) => outcome.clusters * cl,
                None => new_size,
            };
            self.zero_span(entry.begin, old_size, entry.size);
            self.write_entry(handle, entry);
            match outcome.error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    /// `delete_ent(ent, dealloc)` (§4.8). If `dealloc`, frees the entry's
    /// clusters first (directories must be empty; other kinds are reduced
    /// to zero length). The 32-byte slot is always zeroed afterward,
    /// whether or not `dealloc` was requested.
    pub fn delete_ent(&mut self, handle: EntryHandle, dealloc: bool) -> Result<(), JgfsError> {
        let entry = self.read_entry(handle);

        if dealloc {
            match entry.kind {
                EntryKind::Directory => {
                    if self.dir_count(entry.begin) != 0 {
                        return Err(JgfsError::NotEmpty);
                    }
                    self.free_chain(entry.begin);
                }
                _ if entry.size > 0 => {
                    self.reduce(entry.begin, 0);
                }
                _ => {}
            }
        }

        self.clear_entry(handle);
        Ok(())
    }

    /// `move_ent(ent, new_parent)` (§4.8): resolves destination-overwrite
    /// semantics before transplanting `ent`, then zeroes the source slot.
    /// `new_name` lets an in-place rename change the name component in the
    /// same call rather than requiring a separate rewrite-then-move (§4.8's
    /// "an in-place rename... first rewrites `name` then performs the
    /// (possibly self-targeted) move").
    pub fn move_ent(
        &mut self,
        handle: EntryHandle,
        new_parent: u16,
        new_name: &str,
    ) -> Result<EntryHandle, JgfsError> {
        let mut entry = self.read_entry(handle);
        let name = EntryName::new(new_name)?;
        entry.name = name;

        let existing = self.lookup_child(new_parent, &name);
        if let Some((slot, _)) = existing {
            let existing_handle = EntryHandle::Child { cluster: new_parent, slot };
            if existing_handle == handle {
                // Renaming an entry onto its own slot (e.g. a no-op rename
                // to the same name): there is nothing at the destination
                // other than `ent` itself, so just write the name back.
                self.write_entry(handle, entry);
                return Ok(handle);
            }
        }

        let dest = match (entry.kind, existing) {
            (_, None) => {
                let (slot, _) = self.create_ent(
                    new_parent,
                    name,
                    entry.kind,
                    entry.mtime,
                    entry.size,
                    entry.begin,
                )?;
                EntryHandle::Child { cluster: new_parent, slot }
            }
            (EntryKind::Directory, Some((slot, existing_entry))) => {
                if existing_entry.kind != EntryKind::Directory {
                    return Err(JgfsError::Exists);
                }
                let dest_handle = EntryHandle::Child { cluster: new_parent, slot };
                if self.dir_count(existing_entry.begin) != 0 {
                    return Err(JgfsError::NotEmpty);
                }
                self.free_chain(existing_entry.begin);
                self.write_entry(dest_handle, entry);
                dest_handle
            }
            (_, Some((slot, existing_entry))) => {
                if existing_entry.kind == EntryKind::Directory {
                    return Err(JgfsError::IsADirectory);
                }
                let dest_handle = EntryHandle::Child { cluster: new_parent, slot };
                if existing_entry.size > 0 {
                    self.reduce(existing_entry.begin, 0);
                }
                self.write_entry(dest_handle, entry);
                dest_handle
            }
        };

        if dest != handle {
            self.clear_entry(handle);
        }
        Ok(dest)
    }
}
