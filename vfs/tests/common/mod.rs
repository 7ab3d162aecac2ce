#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use strata_errno::Errno;
use strata_vfs::backend::{LocalFd, Stat, VfsBackend, Whence, S_IFREG};
use strata_vfs::RegistryObserver;

/// A scriptable backend that records every call it sees and answers with
/// canned values. Operations it does not implement fall through to the
/// trait defaults (`ENOSYS`).
pub struct TestFs {
    /// Local descriptor handed out by `open`.
    pub local_fd: i32,
    /// Error to fail `open` with, if any.
    pub open_error: Option<Errno>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl TestFs {
    pub fn new(local_fd: i32) -> Self {
        Self {
            local_fd,
            open_error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(errno: Errno) -> Self {
        Self {
            local_fd: 0,
            open_error: Some(errno),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl VfsBackend for TestFs {
    fn open(&self, path: &str, _flags: u32, _mode: u32) -> Result<LocalFd, Errno> {
        self.record(format!("open {path}"));
        match self.open_error {
            Some(errno) => Err(errno),
            None => Ok(LocalFd(self.local_fd)),
        }
    }

    fn close(&self, fd: LocalFd) -> Result<(), Errno> {
        self.record(format!("close {}", fd.0));
        Ok(())
    }

    fn read(&self, fd: LocalFd, buf: &mut [u8]) -> Result<usize, Errno> {
        self.record(format!("read {} len={}", fd.0, buf.len()));
        Ok(0)
    }

    fn write(&self, fd: LocalFd, buf: &[u8]) -> Result<usize, Errno> {
        self.record(format!("write {} len={}", fd.0, buf.len()));
        Ok(buf.len())
    }

    fn pread(&self, fd: LocalFd, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
        self.record(format!("pread {} len={} off={offset}", fd.0, buf.len()));
        Ok(0)
    }

    fn pwrite(&self, fd: LocalFd, buf: &[u8], offset: i64) -> Result<usize, Errno> {
        self.record(format!("pwrite {} len={} off={offset}", fd.0, buf.len()));
        Ok(buf.len())
    }

    fn lseek(&self, fd: LocalFd, offset: i64, _whence: Whence) -> Result<i64, Errno> {
        self.record(format!("lseek {} off={offset}", fd.0));
        Ok(offset)
    }

    fn fstat(&self, fd: LocalFd) -> Result<Stat, Errno> {
        self.record(format!("fstat {}", fd.0));
        Ok(Stat {
            size: 42,
            mode: S_IFREG,
            inode: 1,
        })
    }

    fn stat(&self, path: &str) -> Result<Stat, Errno> {
        self.record(format!("stat {path}"));
        Ok(Stat {
            size: 42,
            mode: S_IFREG,
            inode: 1,
        })
    }

    fn fsync(&self, fd: LocalFd) -> Result<(), Errno> {
        self.record(format!("fsync {}", fd.0));
        Ok(())
    }
}

/// Observer capturing registration notifications in order.
#[derive(Default)]
pub struct RecordObserver {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RegistryObserver for RecordObserver {
    fn backend_registered(&self, base_path: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("registered {base_path:?}"));
    }

    fn backend_unregistered(&self, base_path: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("unregistered {base_path:?}"));
    }
}
