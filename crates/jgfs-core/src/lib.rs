//! JGFS - a small FAT-style filesystem core.
//!
//! This crate implements the on-disk allocation and directory engine
//! described for JGFS: the binary header layout, the single-level cluster
//! allocation table (the "FAT"), the cluster-chain data model for regular
//! files, directories, and symbolic links, and the mutation algorithms that
//! preserve chain and directory invariants across create/delete/rename/
//! resize operations.
//!
//! The mount shim that maps POSIX filesystem upcalls onto the operations
//! here, and the argument parsing for the filesystem-construction utility,
//! are not part of this crate - see the `jgfs-mkfs` binary for the latter.
//!
//! ## Cargo features
//!
//! There are none: this crate targets the one environment the spec
//! describes, a `std` user-space daemon memory-mapping a real block
//! device, so there is no `no_std`/`alloc` split to gate behind features.
//!
//! ## On-disk layout
//!
//! See [`raw`] for the packed byte layouts and [`header`] / [`fat`] /
//! [`directory`] for the structures built on top of them.

mod addressing;
pub mod device;
pub mod directory;
mod error;
pub mod fat;
pub mod fs;
pub mod header;
pub mod ops;
pub mod raw;
pub mod resize;
mod resolve;

pub use device::Device;
pub use error::JgfsError;
pub use fs::{Filesystem, StatFs};

/// Bytes per sector. JGFS only supports 512-byte sectors (§1 Non-goals).
pub const SECT_SIZE: usize = 512;

/// Sector index of the header (sector 0 is the opaque boot area).
pub const HDR_SECT: u32 = 1;

/// On-disk magic value identifying a JGFS filesystem.
pub const MAGIC: [u8; 4] = *b"JGFS";

/// Current major version. Two earlier, incompatible drafts exist; this is
/// the working pair this crate implements.
pub const VER_MAJOR: u8 = 2;
/// Current minor version.
pub const VER_MINOR: u8 = 1;

/// Maximum visible length of a directory entry name, not counting the
/// implicit NUL terminator/padding (§3).
pub const JGFS_NAME_LIMIT: usize = 19;
/// Width in bytes of the `name` field of a directory entry, including
/// padding. `lookup_child` compares the full width (§9's Open Question,
/// resolved in favor of 20).
pub const NAME_FIELD_LEN: usize = 20;

/// Number of FAT entries per 512-byte FAT sector (2 bytes per entry).
pub const FAT_ENTRIES_PER_SECTOR: u32 = (SECT_SIZE / 2) as u32;

/// Cluster number of the root directory. The root's entry lives in the
/// header rather than in a parent directory (§3, glossary).
pub const FAT_ROOT: u16 = 0;

/// Allocation-table entry values (§3).
pub mod fat_entry {
    /// Free (in contexts other than cluster 0) / the root cluster itself.
    pub const FREE: u16 = 0x0000;
    /// First cluster number that can legally appear as a "next" pointer.
    pub const FIRST: u16 = 0x0001;
    /// Last cluster number that can legally appear as a "next" pointer.
    pub const LAST: u16 = 0xFFFB;
    /// End-of-chain sentinel.
    pub const EOF: u16 = 0xFFFC;
    /// Reserved.
    pub const RSVD: u16 = 0xFFFD;
    /// Marks a cluster as damaged.
    pub const BAD: u16 = 0xFFFE;
    /// Past the data area / "not allocated" marker in directory entries.
    pub const OOB: u16 = 0xFFFF;
}

/// The type of a directory entry (§3: "exactly one bit set").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryKind {
    Regular = 1,
    Directory = 2,
    Symlink = 4,
}

impl EntryKind {
    pub(crate) fn from_raw(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Regular),
            2 => Some(Self::Directory),
            4 => Some(Self::Symlink),
            _ => None,
        }
    }
}
