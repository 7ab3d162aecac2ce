#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use strata_blockdev::{
    BlockDevice, BlockDriver, BlockIoctl, DevRef, DeviceEvents, SECTOR_SIZE,
};
use strata_errno::Errno;

/// In-memory disk backing the scanner tests.
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
    read_only: bool,
}

impl RamDisk {
    pub fn new(sectors: usize) -> Self {
        Self {
            data: Mutex::new(vec![0; sectors * SECTOR_SIZE]),
            read_only: false,
        }
    }

    pub fn with_data(data: Vec<u8>) -> Self {
        assert_eq!(data.len() % SECTOR_SIZE, 0);
        Self {
            data: Mutex::new(data),
            read_only: false,
        }
    }

    pub fn fill_sector(&self, sector: usize, byte: u8) {
        let mut data = self.data.lock().unwrap();
        data[sector * SECTOR_SIZE..(sector + 1) * SECTOR_SIZE].fill(byte);
    }
}

impl BlockDriver for RamDisk {
    fn read_sector(
        &self,
        _dev: &BlockDevice,
        data: &mut [u8],
        start_sector: u32,
        count: u32,
    ) -> Result<u32, Errno> {
        let disk = self.data.lock().unwrap();
        let start = start_sector as usize * SECTOR_SIZE;
        let len = count as usize * SECTOR_SIZE;
        if start + len > disk.len() {
            return Err(Errno::EINVAL);
        }
        data[..len].copy_from_slice(&disk[start..start + len]);
        Ok(count)
    }

    fn write_sector(
        &self,
        _dev: &BlockDevice,
        data: &[u8],
        start_sector: u32,
        count: u32,
    ) -> Result<u32, Errno> {
        if self.read_only {
            return Err(Errno::EROFS);
        }
        let mut disk = self.data.lock().unwrap();
        let start = start_sector as usize * SECTOR_SIZE;
        let len = count as usize * SECTOR_SIZE;
        if start + len > disk.len() {
            return Err(Errno::EINVAL);
        }
        disk[start..start + len].copy_from_slice(&data[..len]);
        Ok(count)
    }

    fn ioctl(&self, _dev: &BlockDevice, cmd: BlockIoctl<'_>) -> Result<(), Errno> {
        match cmd {
            BlockIoctl::GetSize(out) => {
                *out = (self.data.lock().unwrap().len() / SECTOR_SIZE) as u32;
                Ok(())
            }
            BlockIoctl::GetSectorSize(out) => {
                *out = SECTOR_SIZE as u32;
                Ok(())
            }
            BlockIoctl::GetReadOnly(out) => {
                *out = self.read_only;
                Ok(())
            }
            BlockIoctl::Flush => Ok(()),
            BlockIoctl::GetGeometry(_) => Err(Errno::ENOSYS),
        }
    }
}

/// Driver whose only job is counting destructor runs.
pub struct CountingDriver {
    drops: Arc<AtomicUsize>,
}

impl CountingDriver {
    pub fn new(drops: &Arc<AtomicUsize>) -> Self {
        Self {
            drops: drops.clone(),
        }
    }
}

impl Drop for CountingDriver {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl BlockDriver for CountingDriver {}

/// Records topology notifications as `registered`/`unregistered` lines
/// tagged with the device's reported size.
#[derive(Default)]
pub struct RecordEvents {
    pub log: Mutex<Vec<String>>,
}

impl RecordEvents {
    fn size_of(dev: &DevRef) -> u32 {
        let mut size = 0;
        let _ = dev.ioctl(BlockIoctl::GetSize(&mut size));
        size
    }
}

impl DeviceEvents for RecordEvents {
    fn device_registered(&self, dev: &DevRef) {
        self.log
            .lock()
            .unwrap()
            .push(format!("registered size={}", Self::size_of(dev)));
    }

    fn device_unregistered(&self, dev: &DevRef) {
        self.log
            .lock()
            .unwrap()
            .push(format!("unregistered size={}", Self::size_of(dev)));
    }
}

/// Builds a bootable-looking sector 0 with the given `(type, start, count)`
/// partition entries.
pub fn mbr_sector(entries: &[(u8, u32, u32)]) -> [u8; SECTOR_SIZE] {
    assert!(entries.len() <= 4);
    let mut sector = [0u8; SECTOR_SIZE];
    for (index, (sys_ind, start, count)) in entries.iter().enumerate() {
        let entry = &mut sector[0x1be + index * 16..0x1be + (index + 1) * 16];
        entry[4] = *sys_ind;
        entry[8..12].copy_from_slice(&start.to_le_bytes());
        entry[12..16].copy_from_slice(&count.to_le_bytes());
    }
    sector[510] = 0x55;
    sector[511] = 0xaa;
    sector
}

/// A disk whose first sectors are `sector0` followed by zeroes.
pub fn disk_with_mbr(total_sectors: usize, entries: &[(u8, u32, u32)]) -> RamDisk {
    let mut data = vec![0; total_sectors * SECTOR_SIZE];
    data[..SECTOR_SIZE].copy_from_slice(&mbr_sector(entries));
    RamDisk::with_data(data)
}
