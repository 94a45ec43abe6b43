//! FAT - the allocation table (§4.3).
//!
//! Provides a single primitive, a bounds-checked read/write of
//! `fat[addr]`, plus the two linear scans everything else is built out of:
//! finding a cluster holding a given value, and counting them.

use crate::addressing;
use crate::error::fatal;
use crate::fat_entry;
use crate::fs::Filesystem;
use crate::FAT_ENTRIES_PER_SECTOR;

impl Filesystem {
    fn fat_entry_offset(&self, addr: u16) -> usize {
        let fat_sect = addr as u32 / FAT_ENTRIES_PER_SECTOR;
        let fat_idx = addr as u32 % FAT_ENTRIES_PER_SECTOR;

        if fat_sect >= self.geometry().s_fat as u32 {
            fatal!("jgfs_fat_read: tried to access past s_fat (fat {addr:#06x})");
        }
        if addr >= self.geometry().fs_clusters {
            fatal!("jgfs_fat_read: tried to access past fs_clusters (fat {addr:#06x})");
        }

        let sect_num = self.geometry().s_rsvd as u32 + fat_sect;
        addressing::sect_offset(self.device().dev_sectors(), sect_num) + fat_idx as usize * 2
    }

    /// Reads `fat[addr]`. Bounds-checked against `s_fat × 256` (§4.3).
    pub fn fat_read(&self, addr: u16) -> u16 {
        let off = self.fat_entry_offset(addr);
        let bytes = self.device().as_bytes();
        u16::from_le_bytes([bytes[off], bytes[off + 1]])
    }

    /// Writes `fat[addr] = val`. Bounds-checked against `s_fat × 256` (§4.3).
    pub fn fat_write(&mut self, addr: u16, val: u16) {
        let off = self.fat_entry_offset(addr);
        let bytes = self.device_mut().as_bytes_mut();
        bytes[off..off + 2].copy_from_slice(&val.to_le_bytes());
    }

    /// Returns the lowest cluster index `i < fs_clusters` with
    /// `fat[i] == target`. Free-cluster allocation calls this with
    /// `target = fat_entry::FREE`.
    pub fn fat_find(&self, target: u16) -> Option<u16> {
        (0..self.geometry().fs_clusters).find(|&i| self.fat_read(i) == target)
    }

    /// Linear count of clusters whose FAT entry equals `target`; used by
    /// `statfs` with `target = fat_entry::FREE`.
    pub fn fat_count(&self, target: u16) -> u16 {
        (0..self.geometry().fs_clusters)
            .filter(|&i| self.fat_read(i) == target)
            .count() as u16
    }

    /// Iterates the cluster chain starting at `begin`, stopping at
    /// `FAT_EOF`. Bounded to at most `fs_clusters` steps so that a
    /// corrupted chain (one that never reaches `FAT_EOF`) can't spin
    /// forever; overrunning the bound logs the same "premature EOF"-style
    /// warning the spec calls for when a chain misbehaves (§4.7 step 2).
    pub fn walk_chain(&self, begin: u16) -> ChainIter<'_> {
        ChainIter {
            fs: self,
            next: Some(begin),
            steps: 0,
            max_steps: self.geometry().fs_clusters,
        }
    }
}

/// Iterator over a cluster chain, yielded by [`Filesystem::walk_chain`].
pub struct ChainIter<'a> {
    fs: &'a Filesystem,
    next: Option<u16>,
    steps: u16,
    max_steps: u16,
}

impl Iterator for ChainIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let current = self.next?;
        if self.steps >= self.max_steps {
            log::warn!(
                "chain walk exceeded fs_clusters ({}) steps starting at {current:#06x}; treating as corrupt",
                self.max_steps
            );
            self.next = None;
            return None;
        }
        self.steps += 1;

        let value = self.fs.fat_read(current);
        self.next = match value {
            fat_entry::EOF => None,
            fat_entry::FREE | fat_entry::RSVD | fat_entry::BAD | fat_entry::OOB => {
                log::warn!(
                    "premature non-chain FAT value {value:#06x} encountered while walking from {current:#06x}"
                );
                None
            }
            next => Some(next),
        };

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use crate::fs::Filesystem;
    use crate::{fat_entry, SECT_SIZE};
    use tempfile::NamedTempFile;

    fn make_fs(total_sectors: u32, s_rsvd: u16, s_per_c: u16) -> Filesystem {
        let file = NamedTempFile::new().unwrap();
        file.as_file()
            .set_len(total_sectors as u64 * SECT_SIZE as u64)
            .unwrap();
        Filesystem::new(file.path(), total_sectors, s_rsvd, s_per_c).unwrap()
    }

    #[test]
    fn fat_find_skips_root_and_returns_first_free() {
        let fs = make_fs(64, 4, 1);
        // cluster 0 (root) is FAT_EOF, not free, so the first free cluster
        // is cluster 1.
        assert_eq!(fs.fat_read(0), fat_entry::EOF);
        assert_eq!(fs.fat_find(fat_entry::FREE), Some(1));
    }

    #[test]
    fn fat_count_matches_total_minus_root() {
        let fs = make_fs(64, 4, 1);
        let free = fs.fat_count(fat_entry::FREE);
        assert_eq!(free as u32, fs.geometry().fs_clusters as u32 - 1);
    }

    #[test]
    #[should_panic(expected = "fs_clusters")]
    fn fat_read_past_fs_clusters_is_fatal() {
        let fs = make_fs(64, 4, 1);
        // s_fat (1 sector = 256 entries) is far larger than fs_clusters (59)
        // for this geometry, so index 59 sits inside the FAT sector but past
        // the declared cluster count - it must still be caught.
        assert!(fs.geometry().fs_clusters < 256);
        fs.fat_read(fs.geometry().fs_clusters);
    }

    #[test]
    fn walk_chain_follows_links_to_eof() {
        let mut fs = make_fs(64, 4, 1);
        fs.fat_write(1, 2);
        fs.fat_write(2, fat_entry::EOF);
        let chain: Vec<u16> = fs.walk_chain(1).collect();
        assert_eq!(chain, vec![1, 2]);
    }
}
