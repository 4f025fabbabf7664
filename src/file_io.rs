//! Block-granular reads and writes against a file inode's direct pointers.
//! Grounded on `examples/original_source/code/tfs.c`'s `tfs_read`/`tfs_write`,
//! which walk the same fixed direct-pointer array one block at a time.

use crate::alloc;
use crate::block::{Block, BlockDevice, BLOCK_SIZE};
use crate::error::Result;
use crate::inode::{self, Inode, DIRECT_PTRS, UNUSED_PTR};
use crate::superblock::Superblock;

/// Largest offset a file can reach: direct pointers only, no indirect
/// blocks.
pub const MAX_FILE_SIZE: u64 = (DIRECT_PTRS * BLOCK_SIZE) as u64;

/// Reads up to `buf.len()` bytes starting at `offset`, short-reading at
/// end-of-file the way a real `read(2)` does. A hole (an unused direct
/// pointer within the file's recorded size) reads as zeroes.
pub fn read(
    dev: &mut dyn BlockDevice,
    sb: &Superblock,
    inode: &Inode,
    offset: u64,
    buf: &mut [u8],
) -> Result<usize> {
    if offset >= inode.size || buf.is_empty() {
        return Ok(0);
    }
    let end = (offset + buf.len() as u64).min(inode.size);

    let mut total = 0usize;
    let mut pos = offset;
    while pos < end {
        let block_idx = (pos / BLOCK_SIZE as u64) as usize;
        let block_off = (pos % BLOCK_SIZE as u64) as usize;
        let chunk = ((end - pos) as usize).min(BLOCK_SIZE - block_off);

        match inode.direct_ptr.get(block_idx) {
            Some(&UNUSED_PTR) | None => buf[total..total + chunk].fill(0),
            Some(&ptr) => {
                let mut block: Block = [0; BLOCK_SIZE];
                dev.read_block(sb.d_start_blk as u64 + ptr as u64, &mut block)?;
                buf[total..total + chunk].copy_from_slice(&block[block_off..block_off + chunk]);
            }
        }

        total += chunk;
        pos += chunk as u64;
    }
    Ok(total)
}

/// Writes `data` starting at `offset`, allocating data blocks on demand and
/// growing `inode.size`. Short-writes once the file would exceed
/// [`MAX_FILE_SIZE`], then persists the inode.
pub fn write(
    dev: &mut dyn BlockDevice,
    sb: &Superblock,
    inode: &mut Inode,
    offset: u64,
    data: &[u8],
) -> Result<usize> {
    if offset >= MAX_FILE_SIZE || data.is_empty() {
        return Ok(0);
    }
    let len = data.len().min((MAX_FILE_SIZE - offset) as usize);
    let end = offset + len as u64;

    let mut total = 0usize;
    let mut pos = offset;
    while pos < end {
        let block_idx = (pos / BLOCK_SIZE as u64) as usize;
        let block_off = (pos % BLOCK_SIZE as u64) as usize;
        let chunk = ((end - pos) as usize).min(BLOCK_SIZE - block_off);

        if inode.direct_ptr[block_idx] == UNUSED_PTR {
            let new_blk = alloc::alloc_dblock(dev, sb)?;
            inode.direct_ptr[block_idx] = new_blk as i32;
        }
        let blk = sb.d_start_blk as u64 + inode.direct_ptr[block_idx] as u64;

        let mut block: Block = [0; BLOCK_SIZE];
        if block_off != 0 || chunk != BLOCK_SIZE {
            dev.read_block(blk, &mut block)?;
        }
        block[block_off..block_off + chunk].copy_from_slice(&data[total..total + chunk]);
        dev.write_block(blk, &block)?;

        total += chunk;
        pos += chunk as u64;
    }

    if end > inode.size {
        inode.size = end;
    }
    inode::write(dev, sb, inode)?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemBlockDevice;
    use crate::inode::FileType;

    fn setup() -> (MemBlockDevice, Superblock, Inode) {
        let sb = Superblock::new(16, 32);
        let dev = MemBlockDevice::new(sb.total_blocks());
        let inode = Inode::new(0, FileType::Regular, 0o644, 1);
        (dev, sb, inode)
    }

    #[test]
    fn write_then_read_round_trips() {
        let (mut dev, sb, mut inode) = setup();
        let payload = b"hello, tiny file system";
        let n = write(&mut dev, &sb, &mut inode, 0, payload).unwrap();
        assert_eq!(n, payload.len());
        assert_eq!(inode.size, payload.len() as u64);

        let mut out = vec![0u8; payload.len()];
        let read_n = read(&mut dev, &sb, &inode, 0, &mut out).unwrap();
        assert_eq!(read_n, payload.len());
        assert_eq!(&out, payload);
    }

    #[test]
    fn write_spanning_two_blocks() {
        let (mut dev, sb, mut inode) = setup();
        let payload = vec![7u8; BLOCK_SIZE + 10];
        write(&mut dev, &sb, &mut inode, 0, &payload).unwrap();
        assert_eq!(inode.size, payload.len() as u64);
        assert_ne!(inode.direct_ptr[0], UNUSED_PTR);
        assert_ne!(inode.direct_ptr[1], UNUSED_PTR);

        let mut out = vec![0u8; payload.len()];
        read(&mut dev, &sb, &inode, 0, &mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn read_past_eof_is_short() {
        let (mut dev, sb, mut inode) = setup();
        write(&mut dev, &sb, &mut inode, 0, b"abc").unwrap();

        let mut out = [0u8; 16];
        let n = read(&mut dev, &sb, &inode, 1, &mut out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&out[..2], b"bc");

        assert_eq!(read(&mut dev, &sb, &inode, 3, &mut out).unwrap(), 0);
    }

    #[test]
    fn write_beyond_direct_pointer_limit_is_short() {
        let (mut dev, sb, mut inode) = setup();
        let payload = vec![1u8; MAX_FILE_SIZE as usize + 100];
        let n = write(&mut dev, &sb, &mut inode, 0, &payload).unwrap();
        assert_eq!(n, MAX_FILE_SIZE as usize);
        assert_eq!(inode.size, MAX_FILE_SIZE);

        assert_eq!(write(&mut dev, &sb, &mut inode, MAX_FILE_SIZE, b"x").unwrap(), 0);
    }

    #[test]
    fn overwrite_preserves_surrounding_bytes() {
        let (mut dev, sb, mut inode) = setup();
        write(&mut dev, &sb, &mut inode, 0, b"0123456789").unwrap();
        write(&mut dev, &sb, &mut inode, 2, b"XY").unwrap();

        let mut out = [0u8; 10];
        read(&mut dev, &sb, &inode, 0, &mut out).unwrap();
        assert_eq!(&out, b"01XY456789");
    }
}
