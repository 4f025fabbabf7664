//! The facade: `Disk<D>` owns a block device plus its mounted superblock and
//! exposes the filesystem surface a gateway (FUSE or otherwise) would call
//! into. Grounded on `mkfs/src/ext2.rs`'s `Ext2Factory` for the
//! format-then-write-root-inode sequence, generalized from a one-shot
//! formatter into a type that also serves reads and writes afterward.

use crate::alloc;
use crate::block::{BlockDevice, FileBlockDevice};
use crate::dir::{self, DirEntry};
use crate::error::{Error, Result};
use crate::file_io;
use crate::inode::{self, FileType, Inode, DIRECT_PTRS};
use crate::path::{self, ROOT_INO};
use crate::superblock::{Superblock, DEFAULT_MAX_DNUM, DEFAULT_MAX_INUM};
use log::{debug, info, warn};
use std::path::Path;

/// Overrides for [`Disk::mkfs`]'s default layout, mirroring `Ext2Factory`'s
/// optional builder fields in `mkfs/src/ext2.rs`.
#[derive(Debug, Clone, Copy)]
pub struct MkfsOptions {
    pub max_inum: u32,
    pub max_dnum: u32,
}

impl Default for MkfsOptions {
    fn default() -> Self {
        Self {
            max_inum: DEFAULT_MAX_INUM,
            max_dnum: DEFAULT_MAX_DNUM,
        }
    }
}

/// A mounted filesystem over a block device `D`. Not `Sync`: a gateway that
/// needs shared access wraps this itself, the way the kernel side of the
/// teacher family wraps its own filesystem types in a lock one layer up.
pub struct Disk<D: BlockDevice> {
    dev: D,
    sb: Superblock,
}

impl Disk<FileBlockDevice> {
    /// Formats a fresh backing file at `path` and mounts it.
    pub fn mkfs(path: impl AsRef<Path>, opts: MkfsOptions) -> Result<Self> {
        let sb = Superblock::new(opts.max_inum, opts.max_dnum);
        let mut dev = FileBlockDevice::create(path.as_ref(), sb.total_blocks())?;
        format(&mut dev, &sb)?;
        info!(
            "formatted {} ({} inodes, {} data blocks)",
            path.as_ref().display(),
            sb.max_inum,
            sb.max_dnum
        );
        Ok(Self { dev, sb })
    }

    /// Mounts an already-formatted backing file at `path`.
    pub fn mount(path: impl AsRef<Path>) -> Result<Self> {
        let mut dev = FileBlockDevice::open(path.as_ref())?;
        let sb = Superblock::read(&mut dev)?;
        info!("mounted {}", path.as_ref().display());
        Ok(Self { dev, sb })
    }
}

impl<D: BlockDevice> Disk<D> {
    /// Mounts an already-formatted device, of any [`BlockDevice`]
    /// implementation (used by tests with [`crate::block::MemBlockDevice`]).
    pub fn mount_device(mut dev: D) -> Result<Self> {
        let sb = Superblock::read(&mut dev)?;
        Ok(Self { dev, sb })
    }

    /// Formats `dev` in place and mounts it, for callers that already own a
    /// device (tests, mainly — a real disk goes through [`Disk::mkfs`]).
    pub fn mkfs_device(mut dev: D, opts: MkfsOptions) -> Result<Self> {
        let sb = Superblock::new(opts.max_inum, opts.max_dnum);
        format(&mut dev, &sb)?;
        Ok(Self { dev, sb })
    }

    /// Drops the mount. The backing file is closed when `D` is dropped;
    /// nothing further needs flushing since every write here is synchronous.
    pub fn unmount(self) {
        debug!("unmounted");
    }

    /// `stat`: the inode record for `path`, with `mode` derived from the
    /// file's type rather than round-tripped from creation time.
    pub fn getattr(&mut self, path_str: &str) -> Result<Inode> {
        let (_, mut inode) = path::resolve(&mut self.dev, &self.sb, path_str)?;
        inode.stat.mode = type_mode(inode.file_type);
        Ok(inode)
    }

    /// Lists the entries of the directory at `path`.
    pub fn readdir(&mut self, path_str: &str) -> Result<Vec<DirEntry>> {
        let (_, inode) = path::resolve(&mut self.dev, &self.sb, path_str)?;
        if inode.file_type != FileType::Directory {
            return Err(Error::Invalid);
        }
        dir::list(&mut self.dev, &self.sb, &inode)
    }

    /// Creates a regular file at `path` with `mode`.
    pub fn create(&mut self, path_str: &str, mode: u32) -> Result<Inode> {
        self.make_entry(path_str, mode, FileType::Regular, 1)
    }

    /// Creates a directory at `path` with `mode`.
    pub fn mkdir(&mut self, path_str: &str, mode: u32) -> Result<Inode> {
        let mut inode = self.make_entry(path_str, mode, FileType::Directory, 2)?;
        inode.direct_ptr[0] = alloc::alloc_dblock(&mut self.dev, &self.sb)? as i32;
        inode.size = crate::block::BLOCK_SIZE as u64;
        inode::write(&mut self.dev, &self.sb, &inode)?;
        Ok(inode)
    }

    fn make_entry(
        &mut self,
        path_str: &str,
        mode: u32,
        file_type: FileType,
        link: u16,
    ) -> Result<Inode> {
        let (parent_path, name) = path::split_path(path_str);
        let (_, mut parent) = path::resolve(&mut self.dev, &self.sb, &parent_path)?;
        if parent.file_type != FileType::Directory {
            return Err(Error::NotFound);
        }
        if dir::find(&mut self.dev, &self.sb, &parent, &name)?.is_some() {
            return Err(Error::Exists);
        }

        let ino = alloc::alloc_inode(&mut self.dev, &self.sb)?;
        let inode = Inode::new(ino, file_type, mode, link);
        inode::write(&mut self.dev, &self.sb, &inode)?;

        if let Err(e) = dir::add(&mut self.dev, &self.sb, &mut parent, ino, &name) {
            alloc::free_inode(&mut self.dev, &self.sb, ino)?;
            return Err(e);
        }
        debug!("created {path_str} (inode {ino})");
        Ok(inode)
    }

    /// Opens `path`, returning its inode for subsequent `read`/`write` calls.
    pub fn open(&mut self, path_str: &str) -> Result<Inode> {
        let (_, inode) = path::resolve(&mut self.dev, &self.sb, path_str)?;
        if inode.file_type != FileType::Regular {
            return Err(Error::Invalid);
        }
        Ok(inode)
    }

    /// Reads up to `buf.len()` bytes from `inode` at `offset`.
    pub fn read(&mut self, inode: &Inode, offset: u64, buf: &mut [u8]) -> Result<usize> {
        file_io::read(&mut self.dev, &self.sb, inode, offset, buf)
    }

    /// Writes `data` into `inode` at `offset`, persisting the updated inode.
    pub fn write(&mut self, inode: &mut Inode, offset: u64, data: &[u8]) -> Result<usize> {
        file_io::write(&mut self.dev, &self.sb, inode, offset, data)
    }

    /// Removes the regular file at `path`.
    pub fn unlink(&mut self, path_str: &str) -> Result<()> {
        let (parent_path, name) = path::split_path(path_str);
        let (_, parent) = path::resolve(&mut self.dev, &self.sb, &parent_path)?;
        let (ino, inode) = path::resolve(&mut self.dev, &self.sb, path_str)?;
        if inode.file_type != FileType::Regular {
            return Err(Error::Invalid);
        }

        dir::remove(&mut self.dev, &self.sb, &parent, &name)?;
        self.free_inode_and_blocks(ino, &inode)?;
        debug!("unlinked {path_str} (inode {ino})");
        Ok(())
    }

    /// Removes the empty directory at `path`. Returns [`Error::NotEmpty`] if
    /// it still has live entries.
    pub fn rmdir(&mut self, path_str: &str) -> Result<()> {
        if path_str == "/" {
            return Err(Error::Invalid);
        }
        let (parent_path, name) = path::split_path(path_str);
        let (_, parent) = path::resolve(&mut self.dev, &self.sb, &parent_path)?;
        let (ino, inode) = path::resolve(&mut self.dev, &self.sb, path_str)?;
        if inode.file_type != FileType::Directory {
            return Err(Error::Invalid);
        }
        if !dir::list(&mut self.dev, &self.sb, &inode)?.is_empty() {
            return Err(Error::NotEmpty);
        }

        dir::remove(&mut self.dev, &self.sb, &parent, &name)?;
        self.free_inode_and_blocks(ino, &inode)?;
        debug!("removed directory {path_str} (inode {ino})");
        Ok(())
    }

    fn free_inode_and_blocks(&mut self, ino: u32, inode: &Inode) -> Result<()> {
        for &ptr in inode.direct_ptr.iter() {
            if ptr != crate::inode::UNUSED_PTR {
                alloc::free_dblock(&mut self.dev, &self.sb, ptr as u32)?;
            }
        }

        let mut freed = inode.clone();
        freed.valid = false;
        freed.direct_ptr = [crate::inode::UNUSED_PTR; DIRECT_PTRS];
        inode::write(&mut self.dev, &self.sb, &freed)?;

        alloc::free_inode(&mut self.dev, &self.sb, ino)
    }
}

/// The `stat`-like mode `getattr` reports: type bits plus a fixed
/// permission mask, per type. Not the mode passed to `create`/`mkdir` — the
/// filesystem does not track per-file permissions beyond this.
fn type_mode(file_type: FileType) -> u32 {
    match file_type {
        FileType::Directory => libc::S_IFDIR as u32 | 0o755,
        FileType::Regular => libc::S_IFREG as u32 | 0o777,
    }
}

/// Writes the superblock and bootstraps the root directory: inode 0, one
/// data page, `.`/`..` omitted (the directory engine has no notion of them;
/// `path::resolve` always starts from inode 0 directly).
fn format(dev: &mut dyn BlockDevice, sb: &Superblock) -> Result<()> {
    sb.write(dev)?;

    let root_blk = alloc::alloc_dblock(dev, sb)?;
    debug_assert_eq!(root_blk, 0, "root directory must claim the first data block");

    let root_ino = alloc::alloc_inode(dev, sb)?;
    debug_assert_eq!(root_ino, ROOT_INO, "root inode must be inode 0");

    let mut root = Inode::new(root_ino, FileType::Directory, 0o755, 2);
    root.direct_ptr[0] = root_blk as i32;
    root.size = crate::block::BLOCK_SIZE as u64;
    inode::write(dev, sb, &root)?;

    if sb.max_inum == 0 || sb.max_dnum == 0 {
        warn!("formatting with zero capacity ({} inodes, {} blocks)", sb.max_inum, sb.max_dnum);
    }
    Ok(())
}

const _: () = assert!(DIRECT_PTRS >= 1, "root directory needs at least one direct pointer");
