use alloc::{boxed::Box, string::String, sync::Weak};

use strata_errno::Errno;

use crate::{
    backend::{DirEntry, DirState, EntryKind, VfsBackend},
    registry::{Prefix, Registry},
    VFS_MAX_COUNT,
};

/// The backend behind the empty prefix. Its only job is root directory
/// iteration: every registered non-empty path prefix shows up as one
/// directory entry, in slot order.
pub(crate) struct RootBackend {
    // Weak because the registry owns this backend through slot 0.
    registry: Weak<Registry>,
}

struct RootDir {
    d_off: usize,
}

impl RootBackend {
    pub(crate) fn new(registry: Weak<Registry>) -> Self {
        Self { registry }
    }
}

impl VfsBackend for RootBackend {
    fn opendir(&self, path: &str) -> Result<DirState, Errno> {
        if path == "/" {
            Ok(Box::new(RootDir { d_off: 0 }))
        } else {
            Err(Errno::ENOENT)
        }
    }

    fn closedir(&self, dir: DirState) -> Result<(), Errno> {
        drop(dir);
        Ok(())
    }

    fn readdir(&self, dir: &mut DirState) -> Result<Option<DirEntry>, Errno> {
        let dir = dir.downcast_mut::<RootDir>().ok_or(Errno::EBADF)?;
        let Some(registry) = self.registry.upgrade() else {
            return Ok(None);
        };

        while dir.d_off < VFS_MAX_COUNT {
            let index = dir.d_off;
            dir.d_off += 1;

            let Some(entry) = registry.get(index) else {
                continue;
            };
            let Prefix::Path(prefix) = &entry.prefix else {
                continue;
            };
            if prefix.is_empty() {
                // The root itself.
                continue;
            }
            let name = prefix.strip_prefix('/').unwrap_or(prefix);
            return Ok(Some(DirEntry {
                name: String::from(name),
                kind: EntryKind::Directory,
            }));
        }
        Ok(None)
    }

    fn telldir(&self, dir: &mut DirState) -> Result<i64, Errno> {
        let dir = dir.downcast_mut::<RootDir>().ok_or(Errno::EBADF)?;
        Ok(dir.d_off as i64)
    }

    fn seekdir(&self, dir: &mut DirState, loc: i64) {
        if let Some(dir) = dir.downcast_mut::<RootDir>() {
            if (0..VFS_MAX_COUNT as i64).contains(&loc) {
                dir.d_off = loc as usize;
            }
        }
    }
}
