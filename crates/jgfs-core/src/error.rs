//! Recoverable error surface for JGFS core operations.
//!
//! Every operation exposed to the external shim (§6 of the spec) returns
//! `0` on success or a negated POSIX-style error code. [`JgfsError`] is the
//! Rust-native form of that contract; [`JgfsError::errno`] does the final
//! negation at the boundary so the mapping lives in exactly one place.
//!
//! Invariant violations and corruption are *not* represented here - they
//! are fatal (see the `fatal!` macro in [`crate::fatal`]) and abort the
//! process with a diagnostic instead of returning a value.

/// Recoverable errors that can be returned by a JGFS core operation.
#[derive(Debug, thiserror::Error)]
pub enum JgfsError {
    /// A path component does not exist.
    #[error("no such file or directory")]
    NoEntry,
    /// A non-terminal path component is not a directory.
    #[error("not a directory")]
    NotADirectory,
    /// An operation that requires a non-directory target found a directory.
    #[error("is a directory")]
    IsADirectory,
    /// `create_ent` found an existing entry with the requested name.
    #[error("entry already exists")]
    Exists,
    /// `delete_ent`/`rmdir`/`move_ent` found a non-empty directory where an
    /// empty one (or none) was required.
    #[error("directory not empty")]
    NotEmpty,
    /// A name exceeds [`crate::JGFS_NAME_LIMIT`] characters.
    #[error("name too long")]
    NameTooLong,
    /// The FAT has no free cluster to satisfy an allocation.
    #[error("no space left on device")]
    NoSpace,
    /// A caller-supplied argument is structurally invalid (empty name,
    /// symlink target that doesn't fit in a cluster, and so on).
    #[error("invalid argument")]
    InvalidArgument,
    /// The requested operation is not implemented by this core.
    #[error("operation not supported")]
    Unimplemented,
    /// Device acquisition failed (open/seek/mmap). Only ever produced by
    /// [`crate::device::Device::open`]; per §4.1 these are fatal to the
    /// *caller* but are still surfaced as an ordinary `Result` rather than
    /// a panic, since they happen before any mapped state exists to
    /// corrupt.
    #[error("device unavailable: {0}")]
    Io(#[from] std::io::Error),
}

impl JgfsError {
    /// The negated POSIX error code this variant maps to, per §6 ("Each
    /// returns 0 on success or a negated POSIX-style error code").
    pub fn errno(&self) -> i32 {
        const ENOENT: i32 = 2;
        const EIO: i32 = 5;
        const EEXIST: i32 = 17;
        const ENOTDIR: i32 = 20;
        const EISDIR: i32 = 21;
        const EINVAL: i32 = 22;
        const ENOSPC: i32 = 28;
        const ENOTEMPTY: i32 = 39;
        const ENAMETOOLONG: i32 = 36;
        const ENOSYS: i32 = 38;

        let code = match self {
            JgfsError::NoEntry => ENOENT,
            JgfsError::NotADirectory => ENOTDIR,
            JgfsError::IsADirectory => EISDIR,
            JgfsError::Exists => EEXIST,
            JgfsError::NotEmpty => ENOTEMPTY,
            JgfsError::NameTooLong => ENAMETOOLONG,
            JgfsError::NoSpace => ENOSPC,
            JgfsError::InvalidArgument => EINVAL,
            JgfsError::Unimplemented => ENOSYS,
            JgfsError::Io(_) => EIO,
        };
        -code
    }
}

/// Log a fatal invariant violation and abort the process.
///
/// This is the Rust-side equivalent of the original implementation's
/// `errx(1, ...)` calls: every bounds check named as fatal in §7 (FAT and
/// cluster addresses past declared bounds, header magic/version mismatch,
/// a device smaller than `s_total`, an unknown directory-entry type, an
/// empty name passed to internal creation) goes through here so the
/// diagnostic always reaches the log sink before the panic unwinds.
macro_rules! fatal {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
        panic!($($arg)*);
    }};
}

pub(crate) use fatal;
