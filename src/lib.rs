//! Core of a tiny, single-disk, inode-based file system: on-disk layout,
//! block I/O, inode and directory subsystems, path resolution and the
//! allocation bitmaps. No FUSE glue and no CLI live here — see the crate's
//! `Disk` facade for the surface a gateway would wire up to `fuser`
//! callbacks.

pub mod alloc;
pub mod bitmap;
pub mod block;
pub mod dir;
pub mod error;
pub mod file_io;
pub mod fs;
pub mod inode;
pub mod path;
pub mod superblock;

pub use block::{BlockDevice, FileBlockDevice, BLOCK_SIZE};
pub use error::{Error, Result};
pub use fs::{Disk, MkfsOptions};
pub use inode::{FileType, Inode, Stat};
