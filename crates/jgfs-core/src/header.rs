//! Header & geometry (§4.2).
//!
//! Locates, validates, and constructs the on-disk header, and derives the
//! cluster geometry every other component needs: how many FAT sectors
//! there are, how many clusters the data area holds, and where the FAT and
//! data areas begin.

use crate::error::fatal;
use crate::raw::RawHeader;
use crate::{EntryKind, FAT_ENTRIES_PER_SECTOR, FAT_ROOT, HDR_SECT, MAGIC, SECT_SIZE, VER_MAJOR, VER_MINOR};

/// Derived geometry for a mounted filesystem. Everything here is computed
/// once, at `init`/`new` time, from the four fields the on-disk header
/// actually stores (`s_total`, `s_rsvd`, `s_fat`, `s_per_c`).
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub s_total: u32,
    pub s_rsvd: u16,
    pub s_fat: u16,
    pub s_per_c: u16,
    /// `⌊(s_total − s_rsvd − s_fat) / s_per_c⌋` (§4.2).
    pub fs_clusters: u16,
}

impl Geometry {
    /// Bytes in one cluster (`s_per_c × 512`). Resolves the Open Question
    /// in §9 about whether this equals `SECT_SIZE × s_per_c` or
    /// `jgfs_clust_size()` - they're the same definition, so this is the
    /// one place it's computed.
    pub fn cluster_size(&self) -> u32 {
        SECT_SIZE as u32 * self.s_per_c as u32
    }

    /// Sector offset where the FAT area ends and the data area begins.
    pub fn data_area_sector(&self) -> u32 {
        self.s_rsvd as u32 + self.s_fat as u32
    }

    fn fs_clusters_for(s_total: u32, s_rsvd: u16, s_fat: u16, s_per_c: u16) -> u16 {
        let used = s_rsvd as u32 + s_fat as u32;
        (s_total.saturating_sub(used) / s_per_c as u32) as u16
    }

    /// The fixed-point FAT-size computation from §4.2:
    ///
    /// ```text
    /// s_fat = 1
    /// repeat:
    ///     s_fat = ceil((s_total - (s_rsvd + s_fat)) / (256 * s_per_c))
    /// until s_fat stops changing
    /// ```
    ///
    /// Early drafts of the original implementation omit the `× s_per_c`
    /// factor in the denominator (§9's Open Question); this is the
    /// corrected recurrence §9 specifies as the one to follow.
    pub fn fat_size_for(s_total: u32, s_rsvd: u16, s_per_c: u16) -> u16 {
        let denom = FAT_ENTRIES_PER_SECTOR * s_per_c as u32;
        let mut s_fat: u32 = 1;
        loop {
            let next = ceil_div(s_total.saturating_sub(s_rsvd as u32 + s_fat), denom);
            if next == s_fat {
                return s_fat as u16;
            }
            s_fat = next;
        }
    }

    /// Computes the full geometry for a filesystem about to be created
    /// with the given parameters.
    pub fn compute(s_total: u32, s_rsvd: u16, s_per_c: u16) -> Self {
        let s_fat = Self::fat_size_for(s_total, s_rsvd, s_per_c);
        let fs_clusters = Self::fs_clusters_for(s_total, s_rsvd, s_fat, s_per_c);
        Self {
            s_total,
            s_rsvd,
            s_fat,
            s_per_c,
            fs_clusters,
        }
    }
}

fn ceil_div(n: u32, d: u32) -> u32 {
    if d == 0 {
        fatal!("jgfs: ceil_div by zero (s_per_c must be nonzero)");
    }
    n.div_ceil(d)
}

/// Reads sector 1 of `bytes` as a header, validating magic, version, device
/// bounds, and FAT sizing (§4.2). All failures here are fatal (§7): a
/// mismatched magic or version, or a device smaller than `s_total`, means
/// the caller handed us something that isn't this filesystem at all.
pub(crate) fn validate(raw: &RawHeader, dev_sectors: u64) -> Geometry {
    if raw.magic != MAGIC {
        fatal!("jgfs header not found (bad magic {:?})", raw.magic);
    }
    if raw.ver_major != VER_MAJOR || raw.ver_minor != VER_MINOR {
        fatal!(
            "incompatible filesystem (version {:#04x}{:#04x})",
            raw.ver_major,
            raw.ver_minor
        );
    }

    let s_total = u32::from_le_bytes(raw.s_total);
    let s_rsvd = u16::from_le_bytes(raw.s_rsvd);
    let s_fat = u16::from_le_bytes(raw.s_fat);
    let s_per_c = u16::from_le_bytes(raw.s_per_c);

    if dev_sectors < s_total as u64 {
        fatal!(
            "filesystem exceeds device bounds (s_total={s_total}, device has {dev_sectors} sectors)"
        );
    }

    let fs_clusters = Geometry::fs_clusters_for(s_total, s_rsvd, s_fat, s_per_c);
    if (s_fat as u32) < ceil_div(fs_clusters as u32, FAT_ENTRIES_PER_SECTOR) {
        fatal!("fat is too small ({s_fat} sectors for {fs_clusters} clusters)");
    }

    Geometry {
        s_total,
        s_rsvd,
        s_fat,
        s_per_c,
        fs_clusters,
    }
}

/// Builds the in-memory image of a fresh header for `jgfs_new` (§4.2).
///
/// The root directory entry is initialized here (`type = directory`,
/// `size = cluster_size`, `begin = FAT_ROOT`); the root cluster's contents
/// and the FAT are initialized separately by
/// [`crate::fs::Filesystem::new`], since they live outside the header
/// sector.
pub(crate) fn build(geometry: &Geometry, now: u32) -> RawHeader {
    RawHeader {
        magic: MAGIC,
        ver_major: VER_MAJOR,
        ver_minor: VER_MINOR,
        s_total: geometry.s_total.to_le_bytes(),
        s_rsvd: geometry.s_rsvd.to_le_bytes(),
        s_fat: geometry.s_fat.to_le_bytes(),
        s_per_c: geometry.s_per_c.to_le_bytes(),
        root_dir_ent: crate::raw::RawDirEntry {
            name: [0; crate::NAME_FIELD_LEN],
            kind: EntryKind::Directory as u8,
            attr: 0,
            mtime: now.to_le_bytes(),
            size: geometry.cluster_size().to_le_bytes(),
            begin: FAT_ROOT.to_le_bytes(),
        },
        _reserved: [0; 464],
    }
}
