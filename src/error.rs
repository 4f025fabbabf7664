//! The error taxonomy shared by every layer of the core.
//!
//! Each component returns its own variant; the facade in [`crate::fs`] is the
//! only place that needs [`Error::to_errno`], mapping a failure to the
//! negative `errno` convention an upper layer (a FUSE gateway, say) expects.

use std::io;

/// An error produced by the core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Path resolution failed.
    #[error("no such file or directory")]
    NotFound,
    /// `dir_add` encountered a live entry with the same name.
    #[error("file exists")]
    Exists,
    /// The inode or data bitmap has no free slot.
    #[error("no space left on device")]
    NoSpace,
    /// An entry name exceeds the directory entry's fixed name field.
    #[error("name too long")]
    NameTooLong,
    /// An entry name is empty, or another argument is malformed.
    #[error("invalid argument")]
    Invalid,
    /// `rmdir` was called on a directory with live entries.
    #[error("directory not empty")]
    NotEmpty,
    /// The backing file failed to read or write.
    #[error("I/O error: {0}")]
    IOError(#[from] io::Error),
    /// The superblock's magic number or another on-disk invariant did not
    /// check out at mount time. Fatal: the mount must be aborted.
    #[error("corrupt filesystem: {0}")]
    Corrupt(&'static str),
}

impl Error {
    /// Maps the error to a negative libc-style errno, as an upper layer
    /// would return it from a syscall-shaped callback.
    pub fn to_errno(&self) -> i32 {
        let e = match self {
            Error::NotFound => libc::ENOENT,
            Error::Exists => libc::EEXIST,
            Error::NoSpace => libc::ENOSPC,
            Error::NameTooLong => libc::ENAMETOOLONG,
            Error::Invalid => libc::EINVAL,
            Error::NotEmpty => libc::ENOTEMPTY,
            Error::IOError(_) => libc::EIO,
            Error::Corrupt(_) => libc::EIO,
        };
        -e
    }
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;
