//! Path resolver (§4.6).
//!
//! Walks a `/`-delimited absolute path one component at a time, starting
//! from the root directory, and reports where resolution landed: the
//! directory cluster that would hold the final component, and that
//! component's entry if it already exists.

use crate::directory::{DirEntry, EntryHandle, EntryName};
use crate::{EntryKind, JgfsError, FAT_ROOT};

/// The result of resolving a path down to its final component.
pub struct Resolved {
    /// Cluster of the directory that contains (or would contain) the final
    /// component.
    pub parent_cluster: u16,
    /// The final component's slot and entry, if it exists.
    pub child: Option<(EntryHandle, DirEntry)>,
    /// The final path component's name, already validated.
    pub name: EntryName,
}

/// Splits `path` into validated components. Rejects the empty path and any
/// component that isn't a legal JGFS name (§3 invariant 7).
///
/// Empty components (from a trailing slash, a doubled slash, and so on) are
/// dropped rather than validated, mirroring the original resolver's
/// `strtok(path_dup, "/")` (`src/fuse/fs.c`), which treats consecutive
/// separators as one: `EntryName::new("")` is reserved for the internal
/// creation path, where an empty name really is a bug.
fn components(path: &str) -> Result<Vec<EntryName>, JgfsError> {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(EntryName::new)
        .collect()
}

impl crate::Filesystem {
    /// Resolves `path` relative to the root directory.
    ///
    /// Every non-final component must name an existing directory; a
    /// non-directory in a non-terminal position is [`JgfsError::NotADirectory`],
    /// a missing one is [`JgfsError::NoEntry`]. The root itself (`path ==
    /// "/"` or `""`) resolves to itself with no `name`/`child` distinction
    /// meaningful, which callers needing the root's own entry should special
    /// case via [`crate::directory::EntryHandle::Root`] instead of calling
    /// this with an empty path.
    pub fn resolve(&self, path: &str) -> Result<Resolved, JgfsError> {
        let parts = components(path)?;
        let Some((last, dirs)) = parts.split_last() else {
            return Err(JgfsError::InvalidArgument);
        };

        let mut cluster = FAT_ROOT;
        for part in dirs {
            let (_, entry) = self
                .lookup_child(cluster, part)
                .ok_or(JgfsError::NoEntry)?;
            if entry.kind != EntryKind::Directory {
                return Err(JgfsError::NotADirectory);
            }
            cluster = entry.begin;
        }

        let child = self
            .lookup_child(cluster, last)
            .map(|(slot, entry)| (EntryHandle::Child { cluster, slot }, entry));

        Ok(Resolved {
            parent_cluster: cluster,
            child,
            name: *last,
        })
    }

    /// Resolves `path` and requires that it name an existing entry,
    /// returning [`JgfsError::NoEntry`] otherwise.
    pub fn resolve_existing(&self, path: &str) -> Result<(EntryHandle, DirEntry), JgfsError> {
        self.resolve(path)?.child.ok_or(JgfsError::NoEntry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SECT_SIZE;
    use tempfile::NamedTempFile;

    fn make_fs() -> crate::Filesystem {
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(2880 * SECT_SIZE as u64).unwrap();
        crate::Filesystem::new(file.path(), 2880, 8, 2).unwrap()
    }

    #[test]
    fn resolve_missing_top_level_is_no_entry() {
        let fs = make_fs();
        assert!(matches!(fs.resolve("/missing"), Ok(Resolved { child: None, .. })));
        assert!(matches!(fs.resolve_existing("/missing"), Err(JgfsError::NoEntry)));
    }

    #[test]
    fn resolve_tolerates_trailing_and_doubled_slashes() {
        let mut fs = make_fs();
        let (_, sub) = fs
            .create_ent(
                FAT_ROOT,
                EntryName::new("d").unwrap(),
                EntryKind::Directory,
                0,
                fs.clust_size(),
                1,
            )
            .unwrap();
        fs.dir_init(sub.begin);
        fs.create_ent(
            sub.begin,
            EntryName::new("leaf").unwrap(),
            EntryKind::Regular,
            0,
            0,
            0xFFFF,
        )
        .unwrap();

        // A trailing slash on a directory path resolves to the directory
        // itself, the same as no trailing slash.
        assert!(fs.resolve_existing("/d/").is_ok());
        // A doubled slash between components collapses like a single one.
        assert_eq!(
            fs.resolve_existing("/d//leaf").unwrap().1.name.as_str(),
            "leaf"
        );
    }

    #[test]
    fn resolve_through_non_directory_fails() {
        let mut fs = make_fs();
        fs.create_ent(
            FAT_ROOT,
            EntryName::new("f").unwrap(),
            EntryKind::Regular,
            0,
            0,
            0xFFFF,
        )
        .unwrap();
        assert!(matches!(
            fs.resolve("/f/child"),
            Err(JgfsError::NotADirectory)
        ));
    }

    #[test]
    fn resolve_nested_directory_finds_child() {
        let mut fs = make_fs();
        let (_, sub) = fs
            .create_ent(
                FAT_ROOT,
                EntryName::new("sub").unwrap(),
                EntryKind::Directory,
                0,
                fs.clust_size(),
                1,
            )
            .unwrap();
        fs.dir_init(sub.begin);
        fs.create_ent(
            sub.begin,
            EntryName::new("leaf").unwrap(),
            EntryKind::Regular,
            0,
            0,
            0xFFFF,
        )
        .unwrap();

        let resolved = fs.resolve("/sub/leaf").unwrap();
        assert_eq!(resolved.parent_cluster, sub.begin);
        assert!(resolved.child.is_some());
    }
}
