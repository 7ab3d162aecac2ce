use alloc::{boxed::Box, string::String};
use core::any::Any;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strata_errno::Errno;

// Open flags, newlib values.
pub const O_RDONLY: u32 = 0;
pub const O_WRONLY: u32 = 1;
pub const O_RDWR: u32 = 2;
pub const O_APPEND: u32 = 0x0008;
pub const O_CREAT: u32 = 0x0200;
pub const O_TRUNC: u32 = 0x0400;
pub const O_EXCL: u32 = 0x0800;

// fcntl commands.
pub const F_GETFL: i32 = 3;
pub const F_SETFL: i32 = 4;

// File-kind bits in `Stat::mode`.
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;

/// Descriptor namespace private to one backend, distinct from the global
/// descriptors handed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFd(pub i32);

/// Seek origin, matching the C whence values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    pub size: u64,
    pub mode: u32,
    pub inode: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryKind {
    #[default]
    File,
    Directory,
}

/// One directory entry, returned owned by `readdir`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Backend-owned directory iteration state. Opaque to the dispatch layer;
/// each backend downcasts the handles it created.
pub type DirState = Box<dyn Any + Send>;

/// The backend operation set. Paths arrive with the registration prefix
/// already stripped (an exact-prefix path arrives as `"/"`). Un-overridden
/// operations report [`Errno::ENOSYS`], the equivalent of an absent vtable
/// slot; errors surface verbatim to the caller.
pub trait VfsBackend: Send + Sync {
    /// Opens `path` and hands back the backend-local descriptor for it.
    fn open(&self, path: &str, flags: u32, mode: u32) -> Result<LocalFd, Errno> {
        let _ = (path, flags, mode);
        Err(Errno::ENOSYS)
    }

    fn close(&self, fd: LocalFd) -> Result<(), Errno> {
        let _ = fd;
        Err(Errno::ENOSYS)
    }

    fn read(&self, fd: LocalFd, buf: &mut [u8]) -> Result<usize, Errno> {
        let _ = (fd, buf);
        Err(Errno::ENOSYS)
    }

    fn write(&self, fd: LocalFd, buf: &[u8]) -> Result<usize, Errno> {
        let _ = (fd, buf);
        Err(Errno::ENOSYS)
    }

    fn pread(&self, fd: LocalFd, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
        let _ = (fd, buf, offset);
        Err(Errno::ENOSYS)
    }

    fn pwrite(&self, fd: LocalFd, buf: &[u8], offset: i64) -> Result<usize, Errno> {
        let _ = (fd, buf, offset);
        Err(Errno::ENOSYS)
    }

    fn lseek(&self, fd: LocalFd, offset: i64, whence: Whence) -> Result<i64, Errno> {
        let _ = (fd, offset, whence);
        Err(Errno::ENOSYS)
    }

    fn fcntl(&self, fd: LocalFd, cmd: i32, arg: i32) -> Result<i32, Errno> {
        let _ = (fd, cmd, arg);
        Err(Errno::ENOSYS)
    }

    fn fstat(&self, fd: LocalFd) -> Result<Stat, Errno> {
        let _ = fd;
        Err(Errno::ENOSYS)
    }

    fn stat(&self, path: &str) -> Result<Stat, Errno> {
        let _ = path;
        Err(Errno::ENOSYS)
    }

    fn fsync(&self, fd: LocalFd) -> Result<(), Errno> {
        let _ = fd;
        Err(Errno::ENOSYS)
    }

    /// Driver-specific control. `arg` is the platform-opaque argument word
    /// of the hosted `ioctl` call; backends with a typed command set
    /// translate here.
    fn ioctl(&self, fd: LocalFd, cmd: i32, arg: usize) -> Result<i32, Errno> {
        let _ = (fd, cmd, arg);
        Err(Errno::ENOSYS)
    }

    fn opendir(&self, path: &str) -> Result<DirState, Errno> {
        let _ = path;
        Err(Errno::ENOSYS)
    }

    fn closedir(&self, dir: DirState) -> Result<(), Errno> {
        let _ = dir;
        Err(Errno::ENOSYS)
    }

    /// Next entry, or `None` at the end of the directory.
    fn readdir(&self, dir: &mut DirState) -> Result<Option<DirEntry>, Errno> {
        let _ = dir;
        Err(Errno::ENOSYS)
    }

    fn telldir(&self, dir: &mut DirState) -> Result<i64, Errno> {
        let _ = dir;
        Err(Errno::ENOSYS)
    }

    fn seekdir(&self, dir: &mut DirState, loc: i64) {
        let _ = (dir, loc);
    }
}
