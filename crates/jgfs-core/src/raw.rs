//! Packed, on-disk byte layouts (§3, §6: "All multi-byte fields are
//! little-endian. Packed, no implicit padding.").
//!
//! Following `hadris-fat`'s `structures::raw` convention, every multi-byte
//! field is stored as a `[u8; N]` array rather than a native integer type.
//! A native `u16`/`u32` field inside a `#[repr(C, packed)]` struct would be
//! unaligned at its offset, and taking a reference to it (which safe field
//! access does implicitly) is undefined behavior; byte arrays have an
//! alignment of 1 and sidestep the problem entirely. Callers go through the
//! `get`/`set` accessors in [`crate::header`] and [`crate::directory`],
//! which convert with `to_le_bytes`/`from_le_bytes` on the way in and out.

use bytemuck::{AnyBitPattern, NoUninit};

/// The on-disk header, occupying sector 1 in its entirety (§3).
#[repr(C, packed)]
#[derive(Clone, Copy, NoUninit, AnyBitPattern)]
pub struct RawHeader {
    /// Must equal `*b"JGFS"`.
    pub magic: [u8; 4],
    pub ver_major: u8,
    pub ver_minor: u8,
    /// Total sectors in the filesystem image.
    pub s_total: [u8; 4],
    /// Sectors in the reserved area.
    pub s_rsvd: [u8; 2],
    /// Sectors in the FAT area.
    pub s_fat: [u8; 2],
    /// Sectors per cluster.
    pub s_per_c: [u8; 2],
    /// The root directory's own entry; the root has no parent directory to
    /// hold it, so it is folded into the header (§3).
    pub root_dir_ent: RawDirEntry,
    pub _reserved: [u8; 464],
}

/// A single 32-byte directory entry slot (§3).
#[repr(C, packed)]
#[derive(Clone, Copy, NoUninit, AnyBitPattern)]
pub struct RawDirEntry {
    /// Zero-padded name; `name[0] == 0` marks the slot free (§3, §4.5).
    pub name: [u8; 20],
    /// One of [`crate::EntryKind`] as a raw byte.
    pub kind: u8,
    /// Reserved attribute bitmask, currently unused.
    pub attr: u8,
    /// Seconds since the UNIX epoch.
    pub mtime: [u8; 4],
    /// Size in bytes.
    pub size: [u8; 4],
    /// First cluster, or `0xFFFF` ("not allocated").
    pub begin: [u8; 2],
}
