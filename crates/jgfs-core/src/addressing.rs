//! Cluster addressing (§4.4).
//!
//! Translates sector and cluster numbers into byte offsets within the
//! mapped device, bounds-checked against both the device size and the
//! declared cluster count. Both translations are constant-time; there is
//! no indirection beyond arithmetic.

use crate::error::fatal;
use crate::header::Geometry;
use crate::{fat_entry, SECT_SIZE};

/// Byte offset of sector `sect_num` within the mapping.
///
/// Fatal if `sect_num` falls past the end of the device (§7: "reads/writes
/// to ... cluster addresses past declared bounds").
pub(crate) fn sect_offset(dev_sectors: u64, sect_num: u32) -> usize {
    if sect_num as u64 >= dev_sectors {
        fatal!("jgfs_get_sect: tried to access past end of device (sect {sect_num})");
    }
    sect_num as usize * SECT_SIZE
}

/// Byte offset of cluster `clust_num` within the mapping.
///
/// Fatal if `clust_num` is past [`fat_entry::LAST`] or past the declared
/// number of data clusters.
pub(crate) fn clust_offset(geometry: &Geometry, dev_sectors: u64, clust_num: u16) -> usize {
    if clust_num > fat_entry::LAST {
        fatal!("jgfs_get_clust: tried to access past FAT_LAST (clust {clust_num:#06x})");
    }
    if clust_num >= geometry.fs_clusters {
        fatal!("jgfs_get_clust: tried to access nonexistent cluster (clust {clust_num:#06x})");
    }

    let sect_num = geometry.data_area_sector() + clust_num as u32 * geometry.s_per_c as u32;
    sect_offset(dev_sectors, sect_num)
}
