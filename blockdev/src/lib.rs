//! Reference-counted block devices with a parent/child topology. Partitions
//! of a registered disk are exposed as child devices that forward I/O to
//! their parent at a sector offset.

#![no_std]

extern crate alloc;

mod device;
mod partition;

pub use device::{
    add_child, register, unregister, BlockDevice, BlockDriver, BlockIoctl, DevRef, DeviceEvents,
    DeviceInfo, Direction, Geometry, NoEvents, Request,
};

/// Sector size assumed by the partition scanner, in bytes.
pub const SECTOR_SIZE: usize = 512;

// Request numbers for the untyped ioctl shape at the hosted-library
// boundary; translators map them onto [`BlockIoctl`].
pub const BLKGETSIZE: i32 = 0;
pub const BLKSSZGET: i32 = 1;
pub const BLKROGET: i32 = 2;
pub const BLKFLSBUF: i32 = 3;
pub const HDIO_GETGEO: i32 = 4;
