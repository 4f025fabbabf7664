//! Path resolution: walks a `/`-separated path from the root inode,
//! following directory entries one component at a time. Grounded on
//! `examples/original_source/code/tfs.c`'s `get_node_by_path`, recursive in
//! the original and flattened to a loop here.

use crate::block::BlockDevice;
use crate::dir;
use crate::error::{Error, Result};
use crate::inode::{self, FileType, Inode};
use crate::superblock::Superblock;

/// The root directory always lives at inode 0, created by `mkfs`.
pub const ROOT_INO: u32 = 0;

/// Splits `path` into its parent directory and final component.
///
/// `"/a"` -> `("/", "a")`, `"/a/b"` -> `("/a", "b")`, `"/"` -> `("/", "/")`.
pub fn split_path(path: &str) -> (String, String) {
    if path == "/" {
        return ("/".to_owned(), "/".to_owned());
    }
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => ("/".to_owned(), trimmed[1..].to_owned()),
        Some(idx) => (trimmed[..idx].to_owned(), trimmed[idx + 1..].to_owned()),
        None => ("/".to_owned(), trimmed.to_owned()),
    }
}

/// Resolves `path` to an inode number and its record, starting at the root.
/// A path that walks through a regular file (i.e. has components left after
/// reaching a non-directory) resolves to [`Error::NotFound`], matching a
/// real path walk.
pub fn resolve(dev: &mut dyn BlockDevice, sb: &Superblock, path: &str) -> Result<(u32, Inode)> {
    let root = inode::read(dev, sb, ROOT_INO)?;
    if path == "/" {
        return Ok((ROOT_INO, root));
    }

    let mut cur_ino = ROOT_INO;
    let mut cur = root;
    for component in path.split('/').filter(|s| !s.is_empty()) {
        if cur.file_type != FileType::Directory {
            return Err(Error::NotFound);
        }
        let entry = dir::find(dev, sb, &cur, component)?.ok_or(Error::NotFound)?;
        cur_ino = entry.ino;
        cur = inode::read(dev, sb, cur_ino)?;
    }
    Ok((cur_ino, cur))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemBlockDevice;

    #[test]
    fn split_path_rules() {
        assert_eq!(split_path("/"), ("/".to_owned(), "/".to_owned()));
        assert_eq!(split_path("/a"), ("/".to_owned(), "a".to_owned()));
        assert_eq!(split_path("/a/b"), ("/a".to_owned(), "b".to_owned()));
        assert_eq!(split_path("/a/b/c"), ("/a/b".to_owned(), "c".to_owned()));
    }

    #[test]
    fn resolve_walks_nested_directories() {
        let sb = Superblock::new(16, 16);
        let mut dev = MemBlockDevice::new(sb.total_blocks());

        let mut root = Inode::new(ROOT_INO, FileType::Directory, 0o755, 2);
        inode::write(&mut dev, &sb, &root).unwrap();

        let mut sub = Inode::new(1, FileType::Directory, 0o755, 2);
        inode::write(&mut dev, &sb, &sub).unwrap();
        dir::add(&mut dev, &sb, &mut root, 1, "sub").unwrap();

        let file = Inode::new(2, FileType::Regular, 0o644, 1);
        inode::write(&mut dev, &sb, &file).unwrap();
        dir::add(&mut dev, &sb, &mut sub, 2, "leaf.txt").unwrap();

        let (ino, resolved) = resolve(&mut dev, &sb, "/sub/leaf.txt").unwrap();
        assert_eq!(ino, 2);
        assert_eq!(resolved.file_type, FileType::Regular);
    }

    #[test]
    fn walking_through_a_regular_file_is_not_found() {
        let sb = Superblock::new(16, 16);
        let mut dev = MemBlockDevice::new(sb.total_blocks());

        let mut root = Inode::new(ROOT_INO, FileType::Directory, 0o755, 2);
        inode::write(&mut dev, &sb, &root).unwrap();
        let file = Inode::new(1, FileType::Regular, 0o644, 1);
        inode::write(&mut dev, &sb, &file).unwrap();
        dir::add(&mut dev, &sb, &mut root, 1, "a").unwrap();

        assert!(matches!(resolve(&mut dev, &sb, "/a/b"), Err(Error::NotFound)));
    }

    #[test]
    fn missing_component_is_not_found() {
        let sb = Superblock::new(16, 16);
        let mut dev = MemBlockDevice::new(sb.total_blocks());
        let root = Inode::new(ROOT_INO, FileType::Directory, 0o755, 2);
        inode::write(&mut dev, &sb, &root).unwrap();

        assert!(matches!(resolve(&mut dev, &sb, "/missing"), Err(Error::NotFound)));
    }
}
