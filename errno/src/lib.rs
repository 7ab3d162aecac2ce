#![no_std]

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Error codes shared by the VFS and block layers. Values follow newlib,
/// the hosted C library these layers back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Errno {
    #[error("Operation not permitted")]
    EPERM = 1,
    #[error("No such file or directory")]
    ENOENT = 2,
    #[error("I/O error")]
    EIO = 5,
    #[error("Bad file number")]
    EBADF = 9,
    #[error("Resource temporarily unavailable")]
    EAGAIN = 11,
    #[error("Not enough memory")]
    ENOMEM = 12,
    #[error("Permission denied")]
    EACCES = 13,
    #[error("Device or resource busy")]
    EBUSY = 16,
    #[error("File exists")]
    EEXIST = 17,
    #[error("Not a directory")]
    ENOTDIR = 20,
    #[error("Is a directory")]
    EISDIR = 21,
    #[error("Invalid argument")]
    EINVAL = 22,
    #[error("Too many open files in system")]
    ENFILE = 23,
    #[error("Too many open files")]
    EMFILE = 24,
    #[error("No space left on device")]
    ENOSPC = 28,
    #[error("Read-only file system")]
    EROFS = 30,
    #[error("Function not implemented")]
    ENOSYS = 88,
    #[error("Directory not empty")]
    ENOTEMPTY = 90,
    #[error("Operation already in progress")]
    EALREADY = 120,
}

impl Errno {
    /// The C return convention for this code: `-errno`.
    pub const fn to_neg(self) -> i32 {
        -(self as i32)
    }
}
