//! Inode records and the inode store: `readi`/`writei` translate between an
//! inode number and a `(block, offset)` inside the inode table, the way
//! `INode::get_disk_offset` does in `mkfs/src/ext2.rs` — generalized from
//! ext2's block-group-relative addressing down to the spec's single flat
//! inode table.

use crate::block::{Block, BlockDevice, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::superblock::Superblock;
use std::mem::size_of;
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of direct block pointers an inode holds. Files use only these —
/// no indirect blocks, per spec's non-goals.
pub const DIRECT_PTRS: usize = 16;

/// Sentinel value for an unused `direct_ptr` slot.
pub const UNUSED_PTR: i32 = -1;

/// Fixed on-disk size of one inode record. Chosen so `BLOCK_SIZE / INODE_SIZE`
/// is exact (4096 / 128 = 32 inodes per block).
pub const INODE_SIZE: usize = 128;

/// A file's type, as recorded in its inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Directory,
    Regular,
}

impl FileType {
    fn from_raw(v: u8) -> Result<Self> {
        match v {
            0 => Ok(FileType::Regular),
            1 => Ok(FileType::Directory),
            _ => Err(Error::Corrupt("invalid inode file type")),
        }
    }

    fn to_raw(self) -> u8 {
        match self {
            FileType::Regular => 0,
            FileType::Directory => 1,
        }
    }
}

/// The `stat`-like metadata block carried inside every inode, used by
/// `getattr`.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl Stat {
    /// A `Stat` stamped with the current time and default ownership.
    pub fn now(mode: u32) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        Self {
            mode,
            uid: 0,
            gid: 0,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }
}

/// An inode record.
#[derive(Debug, Clone)]
pub struct Inode {
    pub ino: u32,
    pub valid: bool,
    pub file_type: FileType,
    pub link: u16,
    pub size: u64,
    pub direct_ptr: [i32; DIRECT_PTRS],
    pub stat: Stat,
}

impl Inode {
    /// Builds a fresh, empty inode of the given type with no data blocks.
    pub fn new(ino: u32, file_type: FileType, mode: u32, link: u16) -> Self {
        Self {
            ino,
            valid: true,
            file_type,
            link,
            size: 0,
            direct_ptr: [UNUSED_PTR; DIRECT_PTRS],
            stat: Stat::now(mode),
        }
    }
}

#[repr(C, packed)]
struct RawInode {
    ino: u32,
    valid: u8,
    file_type: u8,
    link: u16,
    size: u64,
    direct_ptr: [i32; DIRECT_PTRS],
    mode: u32,
    uid: u32,
    gid: u32,
    atime: i64,
    mtime: i64,
    ctime: i64,
    _pad: [u8; 12],
}

const _: () = assert!(size_of::<RawInode>() == INODE_SIZE);

impl RawInode {
    fn from_inode(inode: &Inode) -> Self {
        Self {
            ino: inode.ino,
            valid: inode.valid as u8,
            file_type: inode.file_type.to_raw(),
            link: inode.link,
            size: inode.size,
            direct_ptr: inode.direct_ptr,
            mode: inode.stat.mode,
            uid: inode.stat.uid,
            gid: inode.stat.gid,
            atime: inode.stat.atime,
            mtime: inode.stat.mtime,
            ctime: inode.stat.ctime,
            _pad: [0; 12],
        }
    }

    fn to_inode(&self) -> Result<Inode> {
        Ok(Inode {
            ino: self.ino,
            valid: self.valid != 0,
            file_type: FileType::from_raw(self.file_type)?,
            link: self.link,
            size: self.size,
            direct_ptr: self.direct_ptr,
            stat: Stat {
                mode: self.mode,
                uid: self.uid,
                gid: self.gid,
                atime: self.atime,
                mtime: self.mtime,
                ctime: self.ctime,
            },
        })
    }
}

fn locate(sb: &Superblock, ino: u32) -> (u64, usize) {
    let inodes_per_block = (BLOCK_SIZE / INODE_SIZE) as u32;
    let blk = sb.i_start_blk as u64 + (ino / inodes_per_block) as u64;
    let off = (ino % inodes_per_block) as usize * INODE_SIZE;
    (blk, off)
}

/// `readi`: reads the inode record at `ino`.
pub fn read(dev: &mut dyn BlockDevice, sb: &Superblock, ino: u32) -> Result<Inode> {
    let (blk, off) = locate(sb, ino);
    let mut buf: Block = [0; BLOCK_SIZE];
    dev.read_block(blk, &mut buf)?;

    let mut raw: RawInode = unsafe { std::mem::zeroed() };
    let slice = unsafe {
        std::slice::from_raw_parts_mut(&mut raw as *mut _ as *mut u8, INODE_SIZE)
    };
    slice.copy_from_slice(&buf[off..off + INODE_SIZE]);

    raw.to_inode()
}

/// `writei`: read-modify-write of the inode record's slot. Does not touch
/// the inode bitmap; that is the allocator's and `unlink`/`rmdir`'s
/// responsibility.
pub fn write(dev: &mut dyn BlockDevice, sb: &Superblock, inode: &Inode) -> Result<()> {
    let (blk, off) = locate(sb, inode.ino);
    let mut buf: Block = [0; BLOCK_SIZE];
    dev.read_block(blk, &mut buf)?;

    let raw = RawInode::from_inode(inode);
    let slice = unsafe { std::slice::from_raw_parts(&raw as *const _ as *const u8, INODE_SIZE) };
    buf[off..off + INODE_SIZE].copy_from_slice(slice);

    dev.write_block(blk, &buf)
}
