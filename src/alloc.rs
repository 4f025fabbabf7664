//! Locates and reserves a free inode or data-block number using the
//! bitmaps. First-fit, lowest index wins (spec §4.2 pins this down for
//! deterministic tests). Grounded on `mkfs/src/ext2.rs`'s `fill_bitmap`,
//! which also treats the bitmap as a plain block-sized buffer rather than a
//! cached structure — bitmap blocks are never cached here either (spec §5).

use crate::bitmap;
use crate::block::{Block, BlockDevice, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::superblock::Superblock;
use log::{debug, warn};

/// `alloc_inode`: scans `[0, max_inum)` for the first clear bit, sets it,
/// and returns the index.
pub fn alloc_inode(dev: &mut dyn BlockDevice, sb: &Superblock) -> Result<u32> {
    let mut buf: Block = [0; BLOCK_SIZE];
    dev.read_block(sb.i_bitmap_blk as u64, &mut buf)?;

    let Some(i) = bitmap::find_first_zero(&buf, sb.max_inum as usize) else {
        warn!("inode bitmap exhausted ({} inodes)", sb.max_inum);
        return Err(Error::NoSpace);
    };
    bitmap::set(&mut buf, i);
    dev.write_block(sb.i_bitmap_blk as u64, &buf)?;
    debug!("allocated inode {i}");
    Ok(i as u32)
}

/// `alloc_dblock`: same, using the data bitmap and `max_dnum`. Returns an
/// index relative to `d_start_blk`.
pub fn alloc_dblock(dev: &mut dyn BlockDevice, sb: &Superblock) -> Result<u32> {
    let mut buf: Block = [0; BLOCK_SIZE];
    dev.read_block(sb.d_bitmap_blk as u64, &mut buf)?;

    let Some(i) = bitmap::find_first_zero(&buf, sb.max_dnum as usize) else {
        warn!("data bitmap exhausted ({} blocks)", sb.max_dnum);
        return Err(Error::NoSpace);
    };
    bitmap::set(&mut buf, i);
    dev.write_block(sb.d_bitmap_blk as u64, &buf)?;
    debug!("allocated data block {i}");
    Ok(i as u32)
}

/// Clears inode bit `ino`. Callers (the inode store's `unlink`/`rmdir` path)
/// own the responsibility of also invalidating the inode record itself.
pub fn free_inode(dev: &mut dyn BlockDevice, sb: &Superblock, ino: u32) -> Result<()> {
    let mut buf: Block = [0; BLOCK_SIZE];
    dev.read_block(sb.i_bitmap_blk as u64, &mut buf)?;
    bitmap::clear(&mut buf, ino as usize);
    dev.write_block(sb.i_bitmap_blk as u64, &buf)
}

/// Clears data-block bit `idx` (relative to `d_start_blk`).
pub fn free_dblock(dev: &mut dyn BlockDevice, sb: &Superblock, idx: u32) -> Result<()> {
    let mut buf: Block = [0; BLOCK_SIZE];
    dev.read_block(sb.d_bitmap_blk as u64, &mut buf)?;
    bitmap::clear(&mut buf, idx as usize);
    dev.write_block(sb.d_bitmap_blk as u64, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemBlockDevice;

    #[test]
    fn first_fit_and_exhaustion() {
        let sb = Superblock::new(4, 4);
        let mut dev = MemBlockDevice::new(sb.total_blocks());

        assert_eq!(alloc_inode(&mut dev, &sb).unwrap(), 0);
        assert_eq!(alloc_inode(&mut dev, &sb).unwrap(), 1);
        free_inode(&mut dev, &sb, 0).unwrap();
        // Freed slot wins over continuing to scan forward.
        assert_eq!(alloc_inode(&mut dev, &sb).unwrap(), 0);

        for _ in 0..3 {
            alloc_inode(&mut dev, &sb).unwrap();
        }
        assert!(matches!(alloc_inode(&mut dev, &sb), Err(Error::NoSpace)));
    }

    #[test]
    fn data_block_alloc_free() {
        let sb = Superblock::new(4, 2);
        let mut dev = MemBlockDevice::new(sb.total_blocks());

        assert_eq!(alloc_dblock(&mut dev, &sb).unwrap(), 0);
        assert_eq!(alloc_dblock(&mut dev, &sb).unwrap(), 1);
        assert!(matches!(alloc_dblock(&mut dev, &sb), Err(Error::NoSpace)));

        free_dblock(&mut dev, &sb, 1).unwrap();
        assert_eq!(alloc_dblock(&mut dev, &sb).unwrap(), 1);
    }
}
