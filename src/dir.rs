//! The directory engine: `find`/`add`/`remove` directory entries inside a
//! directory inode's data pages, growing the directory by allocating
//! further pages as needed. Grounded on `examples/original_source/code/tfs.c`'s
//! `dir_find`/`dir_add`/`dir_remove` for the operation shapes, and on
//! `mkfs/src/ext2.rs`'s fixed-size, `#[repr(C, packed)]` on-disk records for
//! the entry layout.

use crate::alloc;
use crate::block::{Block, BlockDevice, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::inode::{self, Inode, UNUSED_PTR};
use crate::superblock::Superblock;
use std::mem::size_of;

/// Longest name a directory entry can hold, excluding the NUL terminator.
pub const NAME_MAX: usize = 249;

const NAME_FIELD_LEN: usize = NAME_MAX + 1;

#[repr(C, packed)]
struct RawDirEntry {
    valid: u8,
    ino: u32,
    len: u8,
    name: [u8; NAME_FIELD_LEN],
}

const DIRENT_SIZE: usize = size_of::<RawDirEntry>();
const _: () = assert!(DIRENT_SIZE == 1 + 4 + 1 + NAME_FIELD_LEN);

/// Number of directory entries that fit in one page.
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIRENT_SIZE;

/// A resolved directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u32,
    pub name: String,
}

impl RawDirEntry {
    fn empty() -> Self {
        Self {
            valid: 0,
            ino: 0,
            len: 0,
            name: [0; NAME_FIELD_LEN],
        }
    }

    fn decode(buf: &[u8]) -> Self {
        let mut raw = RawDirEntry::empty();
        let slice =
            unsafe { std::slice::from_raw_parts_mut(&mut raw as *mut _ as *mut u8, DIRENT_SIZE) };
        slice.copy_from_slice(buf);
        raw
    }

    fn encode(&self, buf: &mut [u8]) {
        let slice =
            unsafe { std::slice::from_raw_parts(self as *const _ as *const u8, DIRENT_SIZE) };
        buf.copy_from_slice(slice);
    }

    fn name_str(&self) -> &str {
        let len = self.len as usize;
        std::str::from_utf8(&self.name[..len]).unwrap_or("")
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Invalid);
    }
    if name.len() > NAME_MAX {
        return Err(Error::NameTooLong);
    }
    Ok(())
}

fn entry_slot(buf: &[u8], slot: usize) -> &[u8] {
    &buf[slot * DIRENT_SIZE..(slot + 1) * DIRENT_SIZE]
}

fn entry_slot_mut(buf: &mut [u8], slot: usize) -> &mut [u8] {
    &mut buf[slot * DIRENT_SIZE..(slot + 1) * DIRENT_SIZE]
}

/// Iterates over the directory's allocated pages, in `direct_ptr` order.
fn pages(dir_inode: &Inode) -> impl Iterator<Item = i32> + '_ {
    dir_inode.direct_ptr.iter().copied().filter(|&p| p != UNUSED_PTR)
}

/// `dir_find`: scans every allocated page for a valid entry with a matching
/// name.
pub fn find(
    dev: &mut dyn BlockDevice,
    sb: &Superblock,
    dir_inode: &Inode,
    name: &str,
) -> Result<Option<DirEntry>> {
    validate_name(name)?;

    for ptr in pages(dir_inode) {
        let mut buf: Block = [0; BLOCK_SIZE];
        dev.read_block(sb.d_start_blk as u64 + ptr as u64, &mut buf)?;

        for slot in 0..ENTRIES_PER_BLOCK {
            let raw = RawDirEntry::decode(entry_slot(&buf, slot));
            if raw.valid != 0 && raw.name_str() == name {
                return Ok(Some(DirEntry {
                    ino: raw.ino,
                    name: raw.name_str().to_owned(),
                }));
            }
        }
    }
    Ok(None)
}

/// `dir_add`: inserts `name -> f_ino`, growing the directory by one page if
/// every allocated page is full. Returns [`Error::Exists`] on a duplicate
/// name.
pub fn add(
    dev: &mut dyn BlockDevice,
    sb: &Superblock,
    dir_inode: &mut Inode,
    f_ino: u32,
    name: &str,
) -> Result<()> {
    validate_name(name)?;

    // Step 1: reject duplicates.
    if find(dev, sb, dir_inode, name)?.is_some() {
        return Err(Error::Exists);
    }

    // Step 2: look for a free slot in an already-allocated page.
    for ptr in pages(dir_inode) {
        let blk = sb.d_start_blk as u64 + ptr as u64;
        let mut buf: Block = [0; BLOCK_SIZE];
        dev.read_block(blk, &mut buf)?;

        for slot in 0..ENTRIES_PER_BLOCK {
            let raw = RawDirEntry::decode(entry_slot(&buf, slot));
            if raw.valid == 0 {
                write_entry(&mut buf, slot, f_ino, name);
                dev.write_block(blk, &buf)?;
                return Ok(());
            }
        }
    }

    // Step 3: grow the directory by one page.
    let Some(free_slot) = dir_inode.direct_ptr.iter().position(|&p| p == UNUSED_PTR) else {
        return Err(Error::NoSpace);
    };
    let new_blk = alloc::alloc_dblock(dev, sb)?;
    dir_inode.direct_ptr[free_slot] = new_blk as i32;
    dir_inode.size += BLOCK_SIZE as u64;
    inode::write(dev, sb, dir_inode)?;

    let mut buf: Block = [0; BLOCK_SIZE];
    write_entry(&mut buf, 0, f_ino, name);
    dev.write_block(sb.d_start_blk as u64 + new_blk as u64, &buf)?;
    Ok(())
}

fn write_entry(buf: &mut Block, slot: usize, ino: u32, name: &str) {
    let mut raw = RawDirEntry::empty();
    raw.valid = 1;
    raw.ino = ino;
    raw.len = name.len() as u8;
    raw.name[..name.len()].copy_from_slice(name.as_bytes());
    raw.encode(entry_slot_mut(buf, slot));
}

/// `dir_remove`: marks the matching entry invalid. Does not compact; empty
/// pages are retained until the directory itself is removed.
pub fn remove(
    dev: &mut dyn BlockDevice,
    sb: &Superblock,
    dir_inode: &Inode,
    name: &str,
) -> Result<()> {
    validate_name(name)?;

    for ptr in pages(dir_inode) {
        let blk = sb.d_start_blk as u64 + ptr as u64;
        let mut buf: Block = [0; BLOCK_SIZE];
        dev.read_block(blk, &mut buf)?;

        for slot in 0..ENTRIES_PER_BLOCK {
            let mut raw = RawDirEntry::decode(entry_slot(&buf, slot));
            if raw.valid != 0 && raw.name_str() == name {
                raw.valid = 0;
                raw.encode(entry_slot_mut(&mut buf, slot));
                dev.write_block(blk, &buf)?;
                return Ok(());
            }
        }
    }
    Err(Error::NotFound)
}

/// Lists every valid entry across every allocated page, in page then slot
/// order (insertion order, since `add` never reorders existing entries).
pub fn list(dev: &mut dyn BlockDevice, sb: &Superblock, dir_inode: &Inode) -> Result<Vec<DirEntry>> {
    let mut out = Vec::new();
    for ptr in pages(dir_inode) {
        let mut buf: Block = [0; BLOCK_SIZE];
        dev.read_block(sb.d_start_blk as u64 + ptr as u64, &mut buf)?;

        for slot in 0..ENTRIES_PER_BLOCK {
            let raw = RawDirEntry::decode(entry_slot(&buf, slot));
            if raw.valid != 0 {
                out.push(DirEntry {
                    ino: raw.ino,
                    name: raw.name_str().to_owned(),
                });
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemBlockDevice;
    use crate::inode::FileType;

    fn setup() -> (MemBlockDevice, Superblock, Inode) {
        let sb = Superblock::new(64, 64);
        let dev = MemBlockDevice::new(sb.total_blocks());
        let dir = Inode::new(0, FileType::Directory, 0o755, 2);
        (dev, sb, dir)
    }

    #[test]
    fn add_find_remove_round_trip() {
        let (mut dev, sb, mut dir) = setup();
        add(&mut dev, &sb, &mut dir, 1, "a").unwrap();
        add(&mut dev, &sb, &mut dir, 2, "b").unwrap();

        assert_eq!(find(&mut dev, &sb, &dir, "a").unwrap().unwrap().ino, 1);
        assert_eq!(find(&mut dev, &sb, &dir, "b").unwrap().unwrap().ino, 2);

        let names: Vec<_> = list(&mut dev, &sb, &dir).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a".to_owned(), "b".to_owned()]);

        remove(&mut dev, &sb, &dir, "a").unwrap();
        assert!(find(&mut dev, &sb, &dir, "a").unwrap().is_none());
        assert!(matches!(remove(&mut dev, &sb, &dir, "a"), Err(Error::NotFound)));
    }

    #[test]
    fn duplicate_name_rejected() {
        let (mut dev, sb, mut dir) = setup();
        add(&mut dev, &sb, &mut dir, 1, "a").unwrap();
        assert!(matches!(add(&mut dev, &sb, &mut dir, 2, "a"), Err(Error::Exists)));
    }

    #[test]
    fn invalid_names_rejected() {
        let (mut dev, sb, mut dir) = setup();
        assert!(matches!(add(&mut dev, &sb, &mut dir, 1, ""), Err(Error::Invalid)));
        let long = "x".repeat(NAME_MAX + 1);
        assert!(matches!(add(&mut dev, &sb, &mut dir, 1, &long), Err(Error::NameTooLong)));
    }

    #[test]
    fn filling_a_page_allocates_a_new_one() {
        let (mut dev, sb, mut dir) = setup();
        for i in 0..ENTRIES_PER_BLOCK {
            add(&mut dev, &sb, &mut dir, i as u32, &format!("f{i}")).unwrap();
        }
        assert_eq!(dir.size, BLOCK_SIZE as u64);

        add(&mut dev, &sb, &mut dir, 999, "overflow").unwrap();
        assert_eq!(dir.size, 2 * BLOCK_SIZE as u64);
        assert_eq!(find(&mut dev, &sb, &dir, "overflow").unwrap().unwrap().ino, 999);
    }

    #[test]
    fn removed_slots_are_reused_before_growing() {
        let (mut dev, sb, mut dir) = setup();
        add(&mut dev, &sb, &mut dir, 1, "a").unwrap();
        remove(&mut dev, &sb, &dir, "a").unwrap();
        add(&mut dev, &sb, &mut dir, 2, "b").unwrap();
        assert_eq!(dir.size, BLOCK_SIZE as u64);
    }
}
