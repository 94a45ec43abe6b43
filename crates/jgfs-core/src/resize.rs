//! File grow/shrink (§4.7).
//!
//! `reduce` and `enlarge` change how many clusters a chain occupies without
//! touching the directory entry that owns it; callers update `size`/`begin`
//! themselves once the chain has the right shape. Growing a hole-y file
//! zeroes the newly attached clusters so reads past the old end-of-file see
//! zero bytes rather than whatever garbage the cluster last held.

use crate::fat_entry;
use crate::fs::Filesystem;
use crate::JgfsError;

/// Result of [`Filesystem::enlarge`]: how far the chain actually grew, and
/// whether it stopped short of `new_clusters` for lack of a free cluster.
pub(crate) struct EnlargeOutcome {
    /// The chain's (possibly newly-allocated) head cluster.
    pub begin: u16,
    /// Clusters in the chain after this call - may be less than requested.
    pub clusters: u32,
    /// Set if allocation ran out of free clusters partway through.
    pub error: Option<JgfsError>,
}

impl Filesystem {
    /// Truncates the chain starting at `begin` down to `new_clusters`
    /// clusters, freeing the rest. `new_clusters == 0` frees the whole
    /// chain and returns `fat_entry::OOB` (§4.7 step 1: "a file truncated to
    /// zero length has no clusters at all").
    ///
    /// Returns the (possibly unchanged) `begin` cluster the caller should
    /// store back into the directory entry.
    pub(crate) fn reduce(&mut self, begin: u16, new_clusters: u32) -> u16 {
        if new_clusters == 0 {
            self.free_chain(begin);
            return fat_entry::OOB;
        }

        let mut chain = self.walk_chain(begin);
        let kept: Vec<u16> = (&mut chain).take(new_clusters as usize).collect();
        let last_kept = *kept.last().expect("new_clusters > 0");

        let first_freed = chain.next();
        self.fat_write(last_kept, fat_entry::EOF);
        if let Some(first_freed) = first_freed {
            self.free_chain(first_freed);
        }

        begin
    }

    /// Extends the chain starting at `begin` (or allocates a fresh one if
    /// `begin == fat_entry::OOB`) out to `new_clusters` clusters, zeroing
    /// every newly attached cluster.
    ///
    /// If the FAT runs out of free clusters partway through, allocation
    /// stops rather than rolling back: `EnlargeOutcome::clusters` reports
    /// however many clusters the chain actually reached, and
    /// `EnlargeOutcome::error` carries the [`crate::JgfsError::NoSpace`]
    /// that cut it short. The caller (`ops::resize_entry`) is responsible
    /// for capping `size` to what was actually grown and still reporting
    /// the error, per §4.7 step 2 and §5's partial-failure model - clusters
    /// already linked must not be left unreachable.
    pub(crate) fn enlarge(&mut self, begin: u16, new_clusters: u32) -> EnlargeOutcome {
        let (mut chain_begin, mut clusters, mut tail) = if begin == fat_entry::OOB {
            (fat_entry::OOB, 0u32, None)
        } else {
            let chain: Vec<u16> = self.walk_chain(begin).collect();
            let len = chain.len() as u32;
            (begin, len, chain.last().copied())
        };

        while clusters < new_clusters {
            let next = match self.alloc_cluster() {
                Ok(next) => next,
                Err(error) => {
                    return EnlargeOutcome {
                        begin: chain_begin,
                        clusters,
                        error: Some(error),
                    }
                }
            };
            self.fat_write(next, fat_entry::EOF);
            self.zero_cluster(next);
            match tail {
                Some(t) => self.fat_write(t, next),
                None => chain_begin = next,
            }
            tail = Some(next);
            clusters += 1;
        }

        EnlargeOutcome {
            begin: chain_begin,
            clusters,
            error: None,
        }
    }

    fn alloc_cluster(&self) -> Result<u16, crate::JgfsError> {
        self.fat_find(fat_entry::FREE).ok_or(crate::JgfsError::NoSpace)
    }

    fn zero_cluster(&mut self, clust: u16) {
        let off = crate::addressing::clust_offset(self.geometry(), self.device().dev_sectors(), clust);
        let len = self.clust_size() as usize;
        self.device_mut().as_bytes_mut()[off..off + len].fill(0);
    }

    /// Marks every cluster in the chain starting at `head` as
    /// [`fat_entry::FREE`] (§4.7's "freeing" step, also used directly by
    /// `delete_ent`).
    pub(crate) fn free_chain(&mut self, head: u16) {
        let chain: Vec<u16> = self.walk_chain(head).collect();
        for clust in chain {
            self.fat_write(clust, fat_entry::FREE);
        }
    }

    /// Zeroes the byte range `[old_size, new_size)` of the chain starting at
    /// `begin`, skipping to the cluster containing `old_size` and crossing
    /// cluster boundaries as needed (§4.7 step 3, the "zero-span"
    /// procedure). A no-op if `old_size >= new_size`.
    ///
    /// This is what makes growing a file whose last cluster already has
    /// slack past `old_size` safe, in addition to `enlarge` zeroing whole
    /// clusters it newly attaches: the two together cover both "grew within
    /// an already-allocated cluster" and "grew into freshly allocated
    /// clusters".
    pub(crate) fn zero_span(&mut self, begin: u16, old_size: u32, new_size: u32) {
        if old_size >= new_size {
            return;
        }
        let cl = self.clust_size();
        let start_idx = old_size / cl;
        let chain: Vec<u16> = self.walk_chain(begin).collect();

        for (idx, &clust) in chain.iter().enumerate() {
            let idx = idx as u32;
            if idx < start_idx {
                continue;
            }
            let cluster_base = idx * cl;
            if cluster_base >= new_size {
                break;
            }
            let zero_from = old_size.max(cluster_base);
            let zero_to = new_size.min(cluster_base + cl);

            let off = crate::addressing::clust_offset(self.geometry(), self.device().dev_sectors(), clust)
                + (zero_from - cluster_base) as usize;
            let len = (zero_to - zero_from) as usize;
            self.device_mut().as_bytes_mut()[off..off + len].fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SECT_SIZE;
    use tempfile::NamedTempFile;

    fn make_fs() -> Filesystem {
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(2880 * SECT_SIZE as u64).unwrap();
        Filesystem::new(file.path(), 2880, 8, 2).unwrap()
    }

    #[test]
    fn enlarge_from_empty_then_reduce_to_zero() {
        let mut fs = make_fs();
        let outcome = fs.enlarge(fat_entry::OOB, 3);
        assert!(outcome.error.is_none());
        assert_eq!(fs.walk_chain(outcome.begin).count(), 3);

        let begin = fs.reduce(outcome.begin, 1);
        assert_eq!(fs.walk_chain(begin).count(), 1);

        let begin = fs.reduce(begin, 0);
        assert_eq!(begin, fat_entry::OOB);
    }

    #[test]
    fn enlarge_zeroes_new_clusters() {
        let mut fs = make_fs();
        let outcome = fs.enlarge(fat_entry::OOB, 1);
        assert!(outcome.error.is_none());
        let off = crate::addressing::clust_offset(fs.geometry(), fs.device().dev_sectors(), outcome.begin);
        let len = fs.clust_size() as usize;
        assert!(fs.device().as_bytes()[off..off + len].iter().all(|&b| b == 0));
    }

    #[test]
    fn enlarge_then_reduce_then_enlarge_reuses_freed_space() {
        let mut fs = make_fs();
        let free_before = fs.fat_count(fat_entry::FREE);

        let outcome = fs.enlarge(fat_entry::OOB, 4);
        assert!(outcome.error.is_none());
        let begin = fs.reduce(outcome.begin, 0);
        assert_eq!(begin, fat_entry::OOB);
        assert_eq!(fs.fat_count(fat_entry::FREE), free_before);

        let outcome = fs.enlarge(fat_entry::OOB, 4);
        assert!(outcome.error.is_none());
        assert_eq!(fs.walk_chain(outcome.begin).count(), 4);
    }

    #[test]
    fn enlarge_stops_on_no_space_without_leaking_clusters() {
        let mut fs = make_fs();
        let total_free = fs.fat_count(fat_entry::FREE);

        let outcome = fs.enlarge(fat_entry::OOB, total_free as u32 + 1);
        assert!(matches!(outcome.error, Some(JgfsError::NoSpace)));
        assert_eq!(outcome.clusters, total_free as u32);
        assert_eq!(fs.walk_chain(outcome.begin).count(), total_free as usize);
        assert_eq!(fs.fat_count(fat_entry::FREE), 0);

        // Every allocated cluster is reachable from `outcome.begin`, so
        // freeing the chain recovers exactly what was handed out - nothing
        // was leaked outside the chain.
        fs.reduce(outcome.begin, 0);
        assert_eq!(fs.fat_count(fat_entry::FREE), total_free);
    }
}
