//! A virtual-filesystem multiplexer: standard file and directory calls are
//! routed to pluggable backends by longest path prefix, and a process-wide
//! descriptor table maps global descriptors onto backend-local ones.

#![no_std]

extern crate alloc;

pub mod backend;
mod fd_table;
mod registry;
mod root;

use alloc::{boxed::Box, format, string::String, sync::Arc};

use log::debug;
use spin::{Mutex, Once};
use strata_errno::Errno;

use crate::{
    backend::{DirEntry, DirState, LocalFd, Stat, VfsBackend, Whence},
    fd_table::FdTable,
    registry::{Prefix, Registry, VfsEntry},
};

/// Size of the process-wide descriptor table.
pub const MAX_FDS: usize = 16;
/// Number of backend slots in the registry.
pub const VFS_MAX_COUNT: usize = 4;
/// Longest accepted registration prefix, in bytes.
pub const PATH_MAX_PREFIX: usize = 32;

/// Registration notifications, invoked outside all internal locks. An
/// fd-range registration emits no event; unregistering one reports the
/// empty string.
pub trait RegistryObserver: Send + Sync {
    fn backend_registered(&self, base_path: &str) {
        let _ = base_path;
    }

    fn backend_unregistered(&self, base_path: &str) {
        let _ = base_path;
    }
}

/// An open directory handle. Carries the index of the backend that opened
/// it, so iteration calls reach the right backend without re-resolving a
/// path.
pub struct Dir {
    vfs_index: usize,
    state: DirState,
}

impl core::fmt::Debug for Dir {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dir")
            .field("vfs_index", &self.vfs_index)
            .finish_non_exhaustive()
    }
}

impl Dir {
    /// The registry slot of the backend this handle was opened at.
    pub fn backend_index(&self) -> usize {
        self.vfs_index
    }
}

/// The multiplexer: backend registry, descriptor table and the dispatch
/// surface over both. Descriptor and path calls never hold an internal
/// lock across a backend invocation.
pub struct Vfs {
    registry: Arc<Registry>,
    fd_table: Mutex<FdTable>,
    observer: Option<Box<dyn RegistryObserver>>,
}

impl core::fmt::Debug for Vfs {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Vfs").finish_non_exhaustive()
    }
}

impl Vfs {
    /// A fresh multiplexer with the root directory backend registered at
    /// the empty prefix (slot 0).
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_observer(observer: Box<dyn RegistryObserver>) -> Self {
        Self::build(Some(observer))
    }

    fn build(observer: Option<Box<dyn RegistryObserver>>) -> Self {
        Self {
            registry: Registry::with_root(),
            fd_table: Mutex::new(FdTable::new()),
            observer,
        }
    }

    /// Registers a backend under `base_path` and returns its stable index.
    /// The prefix must be empty or `[2, PATH_MAX_PREFIX]` bytes starting
    /// with `/` and not ending with `/`; `ENOMEM` when all slots are taken.
    pub fn register(&self, base_path: &str, ops: Box<dyn VfsBackend>) -> Result<usize, Errno> {
        let prefix = Prefix::parse(base_path)?;
        let index = self.registry.insert(prefix, ops)?;
        debug!("registered backend {base_path:?} at index {index}");
        if let Some(observer) = &self.observer {
            observer.backend_registered(base_path);
        }
        Ok(index)
    }

    /// Registers a backend that is reachable only through descriptors
    /// `[min_fd, max_fd]`, all reserved as permanent with the local
    /// descriptor equal to the global one. Used for standard streams.
    pub fn register_fd_range(
        &self,
        ops: Box<dyn VfsBackend>,
        min_fd: usize,
        max_fd: usize,
    ) -> Result<usize, Errno> {
        if min_fd > max_fd || max_fd >= MAX_FDS {
            return Err(Errno::EINVAL);
        }
        let index = self.registry.insert(Prefix::Ignored, ops)?;
        let reserved = self.fd_table.lock().reserve_range(index, min_fd, max_fd);
        if let Err(e) = reserved {
            self.registry.take(index);
            return Err(e);
        }
        debug!("reserved descriptors {min_fd}..={max_fd} for backend index {index}");
        Ok(index)
    }

    /// Detaches the backend at `index`. Descriptors still pointing at the
    /// slot fail with `EBADF` from then on.
    pub fn unregister(&self, index: usize) -> Result<(), Errno> {
        let entry = self.registry.take(index).ok_or(Errno::EINVAL)?;
        debug!("unregistered backend index {index}");
        if let Some(observer) = &self.observer {
            observer.backend_unregistered(entry.prefix.as_str());
        }
        Ok(())
    }

    fn resolve_path(&self, path: &str) -> Result<Arc<VfsEntry>, Errno> {
        self.registry.resolve(path).ok_or(Errno::ENOENT)
    }

    fn resolve_fd(&self, fd: usize) -> Result<(Arc<VfsEntry>, LocalFd), Errno> {
        let slot = self.fd_table.lock().get(fd).ok_or(Errno::EBADF)?;
        let entry = self.registry.get(slot.vfs_index).ok_or(Errno::EBADF)?;
        Ok((entry, slot.local_fd))
    }

    fn resolve_dir(&self, dir: &Dir) -> Result<Arc<VfsEntry>, Errno> {
        self.registry.get(dir.vfs_index).ok_or(Errno::EBADF)
    }

    /// Opens `path` on the backend it resolves to and binds the returned
    /// backend-local descriptor to the lowest free global descriptor. When
    /// the table is full the local descriptor is closed again (best
    /// effort) and the call fails with `ENFILE`.
    pub fn open(&self, path: &str, flags: u32, mode: u32) -> Result<usize, Errno> {
        let entry = self.resolve_path(path)?;
        let local_fd = entry.ops.open(entry.translate(path), flags, mode)?;

        if let Some(fd) = self.fd_table.lock().allocate(entry.index, local_fd) {
            return Ok(fd);
        }
        let _ = entry.ops.close(local_fd);
        Err(Errno::ENFILE)
    }

    /// Closes a descriptor. The row is freed only after the backend's
    /// close succeeds, and never for permanent rows.
    pub fn close(&self, fd: usize) -> Result<(), Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.close(local_fd)?;
        self.fd_table.lock().release(fd);
        Ok(())
    }

    pub fn read(&self, fd: usize, buf: &mut [u8]) -> Result<usize, Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.read(local_fd, buf)
    }

    pub fn write(&self, fd: usize, buf: &[u8]) -> Result<usize, Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.write(local_fd, buf)
    }

    pub fn pread(&self, fd: usize, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.pread(local_fd, buf, offset)
    }

    pub fn pwrite(&self, fd: usize, buf: &[u8], offset: i64) -> Result<usize, Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.pwrite(local_fd, buf, offset)
    }

    pub fn lseek(&self, fd: usize, offset: i64, whence: Whence) -> Result<i64, Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.lseek(local_fd, offset, whence)
    }

    pub fn fcntl(&self, fd: usize, cmd: i32, arg: i32) -> Result<i32, Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.fcntl(local_fd, cmd, arg)
    }

    pub fn fstat(&self, fd: usize) -> Result<Stat, Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.fstat(local_fd)
    }

    pub fn stat(&self, path: &str) -> Result<Stat, Errno> {
        let entry = self.resolve_path(path)?;
        entry.ops.stat(entry.translate(path))
    }

    pub fn fsync(&self, fd: usize) -> Result<(), Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.fsync(local_fd)
    }

    pub fn ioctl(&self, fd: usize, cmd: i32, arg: usize) -> Result<i32, Errno> {
        let (entry, local_fd) = self.resolve_fd(fd)?;
        entry.ops.ioctl(local_fd, cmd, arg)
    }

    /// Opens a directory and stamps the handle with the backend's index.
    pub fn opendir(&self, path: &str) -> Result<Dir, Errno> {
        let entry = self.resolve_path(path)?;
        let state = entry.ops.opendir(entry.translate(path))?;
        Ok(Dir {
            vfs_index: entry.index,
            state,
        })
    }

    pub fn closedir(&self, dir: Dir) -> Result<(), Errno> {
        let entry = self.resolve_dir(&dir)?;
        entry.ops.closedir(dir.state)
    }

    pub fn readdir(&self, dir: &mut Dir) -> Result<Option<DirEntry>, Errno> {
        let entry = self.resolve_dir(dir)?;
        entry.ops.readdir(&mut dir.state)
    }

    /// Reentrant readdir shape: fills the caller's entry and reports
    /// whether one was produced.
    pub fn readdir_r(&self, dir: &mut Dir, out: &mut DirEntry) -> Result<bool, Errno> {
        match self.readdir(dir)? {
            Some(entry) => {
                *out = entry;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn telldir(&self, dir: &mut Dir) -> Result<i64, Errno> {
        let entry = self.resolve_dir(dir)?;
        entry.ops.telldir(&mut dir.state)
    }

    /// Restores a position previously returned by [`Vfs::telldir`]. A
    /// handle whose backend is gone is left untouched.
    pub fn seekdir(&self, dir: &mut Dir, loc: i64) {
        if let Ok(entry) = self.resolve_dir(dir) {
            entry.ops.seekdir(&mut dir.state, loc);
        }
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Once<Vfs> = Once::new();

/// Installs the process-wide instance backing the hosted C library. Fails
/// with `EBUSY` once an instance is installed.
pub fn install(vfs: Vfs) -> Result<&'static Vfs, Errno> {
    let mut installed = false;
    let slot = GLOBAL.call_once(|| {
        installed = true;
        vfs
    });
    if installed {
        Ok(slot)
    } else {
        Err(Errno::EBUSY)
    }
}

/// The installed process-wide instance, if any.
pub fn global() -> Option<&'static Vfs> {
    GLOBAL.get()
}

/// Joins two path fragments with exactly one separator; a bare `"/"` base
/// contributes only the separator.
pub fn concat_path(base: &str, name: &str) -> String {
    let base = if base == "/" { "" } else { base };
    format!("{base}/{name}")
}
