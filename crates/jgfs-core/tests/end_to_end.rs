//! End-to-end scenarios driven against the worked geometry in §8
//! (`s_total=2880, s_rsvd=8, s_per_c=2`, `cluster_size=1024`).

use jgfs_core::{fat_entry, EntryKind, Filesystem, FAT_ROOT};
use tempfile::NamedTempFile;

fn fresh_fs() -> (NamedTempFile, Filesystem) {
    let file = NamedTempFile::new().unwrap();
    file.as_file().set_len(2880 * jgfs_core::SECT_SIZE as u64).unwrap();
    let fs = Filesystem::new(file.path(), 2880, 8, 2).unwrap();
    (file, fs)
}

#[test]
fn new_filesystem_has_only_the_root() {
    let (_file, fs) = fresh_fs();
    let root = fs.read_entry(jgfs_core::directory::EntryHandle::Root);
    assert_eq!(root.kind, EntryKind::Directory);
    assert_eq!(root.begin, FAT_ROOT);
    assert_eq!(root.size, fs.clust_size());
    assert_eq!(fs.dir_count(FAT_ROOT), 0);
}

#[test]
fn create_file_then_readdir_shows_it_with_zero_size() {
    let (_file, mut fs) = fresh_fs();
    fs.create_file(FAT_ROOT, "a").unwrap();

    let names: Vec<String> = fs
        .dir_entries(FAT_ROOT)
        .map(|(_, e)| e.name.as_str().to_string())
        .collect();
    assert_eq!(names, vec!["a"]);

    let (_, entry) = fs.resolve_existing("/a").unwrap();
    assert_eq!(entry.size, 0);
    assert_eq!(entry.begin, fat_entry::OOB);
    assert_eq!(fs.fat_count(fat_entry::FREE) as u32, fs.geometry().fs_clusters as u32 - 1);
}

#[test]
fn enlarge_allocates_expected_clusters_and_zeroes_them() {
    let (_file, mut fs) = fresh_fs();
    fs.create_file(FAT_ROOT, "a").unwrap();
    let (handle, _) = fs.resolve_existing("/a").unwrap();

    fs.resize_entry(handle, 1500).unwrap();
    let entry = fs.read_entry(handle);
    assert_eq!(entry.size, 1500);

    let chain: Vec<u16> = fs.walk_chain(entry.begin).collect();
    assert_eq!(chain.len(), 2);
    assert_eq!(fs.fat_read(chain[0]), chain[1]);
    assert_eq!(fs.fat_read(chain[1]), fat_entry::EOF);
    assert_eq!(fs.fat_read(FAT_ROOT), fat_entry::EOF);
}

#[test]
fn create_symlink_reads_back_target_nul_padded() {
    let (_file, mut fs) = fresh_fs();
    fs.create_symlink(FAT_ROOT, "s", "a").unwrap();
    let (_, entry) = fs.resolve_existing("/s").unwrap();
    assert_eq!(entry.size, 1);
    assert_eq!(fs.walk_chain(entry.begin).count(), 1);
    assert_eq!(fs.read_symlink_target(&entry).unwrap(), "a");
}

#[test]
fn mkdir_rename_into_it_then_rmdir_nonempty_fails() {
    let (_file, mut fs) = fresh_fs();
    fs.create_file(FAT_ROOT, "a").unwrap();
    fs.create_dir(FAT_ROOT, "d").unwrap();

    let (a_handle, _) = fs.resolve_existing("/a").unwrap();
    let (_, d_entry) = fs.resolve_existing("/d").unwrap();
    fs.move_ent(a_handle, d_entry.begin, "a").unwrap();

    assert!(fs.resolve_existing("/a").is_err());
    let d_names: Vec<String> = fs
        .dir_entries(d_entry.begin)
        .map(|(_, e)| e.name.as_str().to_string())
        .collect();
    assert_eq!(d_names, vec!["a"]);
    let root_names: Vec<String> = fs
        .dir_entries(FAT_ROOT)
        .map(|(_, e)| e.name.as_str().to_string())
        .collect();
    assert_eq!(root_names, vec!["d"]);

    let (d_handle, _) = fs.resolve_existing("/d").unwrap();
    assert!(matches!(
        fs.delete_ent(d_handle, true),
        Err(jgfs_core::JgfsError::NotEmpty)
    ));
}

#[test]
fn unlink_then_rmdir_frees_all_clusters() {
    let (_file, mut fs) = fresh_fs();
    let free_before = fs.fat_count(fat_entry::FREE);

    fs.create_dir(FAT_ROOT, "d").unwrap();
    let (d_handle, d_entry) = fs.resolve_existing("/d").unwrap();
    fs.create_file(d_entry.begin, "a").unwrap();
    let (a_handle, a_entry) = fs.resolve_existing("/d/a").unwrap();
    fs.resize_entry(a_handle, 1500).unwrap();

    fs.delete_ent(a_handle, true).unwrap();
    fs.delete_ent(d_handle, true).unwrap();

    assert_eq!(fs.fat_count(fat_entry::FREE), free_before);
    let _ = a_entry;
}
