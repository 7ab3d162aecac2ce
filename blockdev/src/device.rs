use alloc::{boxed::Box, vec::Vec};

use spin::Mutex;
use strata_errno::Errno;
use strata_object::Shared;

use crate::partition;

/// Disk geometry reported by [`BlockIoctl::GetGeometry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub heads: u8,
    pub sectors: u8,
    pub cylinders: u16,
    pub start: u32,
}

/// The typed device command set. At the hosted-library boundary these map
/// onto the classic `BLKGETSIZE`/`BLKSSZGET`/`BLKROGET`/`BLKFLSBUF`/
/// `HDIO_GETGEO` request numbers.
pub enum BlockIoctl<'a> {
    /// Total device size in sectors.
    GetSize(&'a mut u32),
    /// Sector size in bytes.
    GetSectorSize(&'a mut u32),
    /// Read-only flag.
    GetReadOnly(&'a mut bool),
    /// Flush any driver-side buffers.
    Flush,
    GetGeometry(&'a mut Geometry),
}

/// Transfer direction of an asynchronous [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Asynchronous transfer descriptor. Part of the driver boundary; the
/// synchronous core (including the partition scanner) never submits one.
pub struct Request<'a> {
    pub start_sector: u32,
    pub count: u32,
    pub direction: Direction,
    pub buffer: &'a mut [u8],
    /// Invoked with the number of sectors transferred, or the failure code.
    pub on_complete: fn(Result<u32, Errno>),
}

/// Driver operations. Un-overridden methods report [`Errno::ENOSYS`], the
/// equivalent of an absent vtable slot. The driver's `Drop` is its destroy
/// hook and runs when the last reference to the device goes away.
pub trait BlockDriver: Send + Sync {
    /// Returns the number of sectors read.
    fn read_sector(
        &self,
        dev: &BlockDevice,
        data: &mut [u8],
        start_sector: u32,
        count: u32,
    ) -> Result<u32, Errno> {
        let _ = (dev, data, start_sector, count);
        Err(Errno::ENOSYS)
    }

    /// Returns the number of sectors written.
    fn write_sector(
        &self,
        dev: &BlockDevice,
        data: &[u8],
        start_sector: u32,
        count: u32,
    ) -> Result<u32, Errno> {
        let _ = (dev, data, start_sector, count);
        Err(Errno::ENOSYS)
    }

    fn ioctl(&self, dev: &BlockDevice, cmd: BlockIoctl<'_>) -> Result<(), Errno> {
        let _ = (dev, cmd);
        Err(Errno::ENOSYS)
    }

    /// Queue an asynchronous transfer. Declared for drivers that complete
    /// out of line; nothing in this crate calls it.
    fn submit(&self, dev: &BlockDevice, req: Request<'_>) -> Result<(), Errno> {
        let _ = (dev, req);
        Err(Errno::ENOSYS)
    }
}

/// A shared handle to a device node.
pub type DevRef = Shared<BlockDevice>;

#[derive(Default)]
struct Topology {
    parent: Option<DevRef>,
    children: Vec<DevRef>,
}

/// A device node: the driver plus its position in the device tree.
///
/// A child holds a strong reference to its parent and the parent holds a
/// strong reference to each child, so a registered tree keeps itself alive
/// until [`unregister`] walks it. References held outside the topology
/// (e.g. a filesystem backend wrapping a device) extend a device's life
/// independently of the tree.
pub struct BlockDevice {
    driver: Box<dyn BlockDriver>,
    topology: Mutex<Topology>,
}

impl BlockDevice {
    /// Wraps a driver in a fresh node with no parent and no children. The
    /// returned handle is the caller's initial reference, which
    /// [`register`] consumes.
    pub fn new(driver: impl BlockDriver + 'static) -> DevRef {
        Shared::new(Self {
            driver: Box::new(driver),
            topology: Mutex::new(Topology::default()),
        })
    }

    pub fn read_sector(
        &self,
        data: &mut [u8],
        start_sector: u32,
        count: u32,
    ) -> Result<u32, Errno> {
        self.driver.read_sector(self, data, start_sector, count)
    }

    pub fn write_sector(&self, data: &[u8], start_sector: u32, count: u32) -> Result<u32, Errno> {
        self.driver.write_sector(self, data, start_sector, count)
    }

    pub fn ioctl(&self, cmd: BlockIoctl<'_>) -> Result<(), Errno> {
        self.driver.ioctl(self, cmd)
    }

    pub fn parent(&self) -> Option<DevRef> {
        self.topology.lock().parent.clone()
    }

    pub fn has_children(&self) -> bool {
        !self.topology.lock().children.is_empty()
    }

    /// Snapshot of the current child list, newest first.
    pub fn children(&self) -> Vec<DevRef> {
        self.topology.lock().children.clone()
    }

    /// Convenience query combining the size ioctls.
    pub fn info(&self) -> Result<DeviceInfo, Errno> {
        let mut total_sectors = 0;
        let mut sector_size = 0;
        self.ioctl(BlockIoctl::GetSize(&mut total_sectors))?;
        self.ioctl(BlockIoctl::GetSectorSize(&mut sector_size))?;
        Ok(DeviceInfo {
            sector_size,
            total_sectors,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub sector_size: u32,
    pub total_sectors: u32,
}

/// Topology notifications, invoked with no internal lock held.
pub trait DeviceEvents: Sync {
    fn device_registered(&self, dev: &DevRef) {
        let _ = dev;
    }

    fn device_unregistered(&self, dev: &DevRef) {
        let _ = dev;
    }
}

/// Events sink that ignores everything.
pub struct NoEvents;

impl DeviceEvents for NoEvents {}

/// Links `child` under `parent`. Fails with [`Errno::EALREADY`] if the
/// child is already part of a tree.
pub fn add_child(parent: &DevRef, child: &DevRef) -> Result<(), Errno> {
    {
        let mut topology = child.topology.lock();
        if topology.parent.is_some() {
            return Err(Errno::EALREADY);
        }
        topology.parent = Some(parent.clone());
    }
    parent.topology.lock().children.insert(0, child.clone());
    Ok(())
}

/// Registers a device. Root devices (those without a parent) are scanned
/// for a partition table first, which may populate the child list. The
/// caller's initial reference is consumed: after this call the device is
/// owned by its topology and by whatever external holders kept a handle.
pub fn register(dev: DevRef, events: &dyn DeviceEvents) {
    if dev.parent().is_none() {
        partition::scan_partitions(&dev, events);
    }
    events.device_registered(&dev);
}

/// Tears a device tree down depth-first: each child is unregistered, its
/// parent back-reference severed, and the tree's reference to it dropped.
/// Devices whose only references were the topology's are destroyed during
/// the walk, exactly once each.
pub fn unregister(dev: &DevRef, events: &dyn DeviceEvents) {
    loop {
        let child = {
            let mut topology = dev.topology.lock();
            if topology.children.is_empty() {
                None
            } else {
                Some(topology.children.remove(0))
            }
        };
        let Some(child) = child else { break };
        unregister(&child, events);
        child.topology.lock().parent = None;
    }
    events.device_unregistered(dev);
}
