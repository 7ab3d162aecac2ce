use log::{debug, error, info};
use strata_errno::Errno;

use crate::{
    add_child, register, BlockDevice, BlockDriver, BlockIoctl, DevRef, DeviceEvents, SECTOR_SIZE,
};

// MS-DOS partition table layout within sector 0.
const TABLE_OFFSET: usize = 0x1be;
const ENTRY_LEN: usize = 16;
const ENTRY_COUNT: usize = 4;
const SIGNATURE_OFFSET: usize = 510;
const SIGNATURE: [u8; 2] = [0x55, 0xaa];

/// A slice of the parent device. Reads and writes are forwarded with the
/// start sector shifted by the partition's base offset; the size ioctl is
/// answered locally and everything else is forwarded.
struct PartitionDriver {
    start_sector: u32,
    num_sectors: u32,
}

impl BlockDriver for PartitionDriver {
    fn read_sector(
        &self,
        dev: &BlockDevice,
        data: &mut [u8],
        start_sector: u32,
        count: u32,
    ) -> Result<u32, Errno> {
        let parent = dev.parent().ok_or(Errno::ENOSYS)?;
        parent.read_sector(data, start_sector + self.start_sector, count)
    }

    fn write_sector(
        &self,
        dev: &BlockDevice,
        data: &[u8],
        start_sector: u32,
        count: u32,
    ) -> Result<u32, Errno> {
        let parent = dev.parent().ok_or(Errno::ENOSYS)?;
        parent.write_sector(data, start_sector + self.start_sector, count)
    }

    fn ioctl(&self, dev: &BlockDevice, cmd: BlockIoctl<'_>) -> Result<(), Errno> {
        match cmd {
            BlockIoctl::GetSize(out) => {
                *out = self.num_sectors;
                Ok(())
            }
            other => dev.parent().ok_or(Errno::ENOSYS)?.ioctl(other),
        }
    }
}

/// Reads sector 0 of `dev` and, when it carries the MS-DOS signature,
/// registers one child device per non-empty primary partition entry.
/// Per-entry failures are logged and do not stop the scan; extended
/// partition entries are not descended into.
pub(crate) fn scan_partitions(dev: &DevRef, events: &dyn DeviceEvents) {
    let mut sector = [0u8; SECTOR_SIZE];
    match dev.read_sector(&mut sector, 0, 1) {
        Ok(1) => {
            if sector[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 2] == SIGNATURE {
                debug!("found MS-DOS partition table, scanning partitions");
                for index in 0..ENTRY_COUNT {
                    scan_entry(dev, &sector[TABLE_OFFSET..], index, events);
                }
            }
        }
        Ok(n) => error!("cannot read partition table: short transfer of {n} sectors"),
        Err(e) => error!("cannot read first sector for partition table: {e}"),
    }
}

fn scan_entry(dev: &DevRef, table: &[u8], index: usize, events: &dyn DeviceEvents) {
    let entry = &table[index * ENTRY_LEN..(index + 1) * ENTRY_LEN];
    // System-indicator byte; zero marks an unused slot.
    if entry[4] == 0 {
        return;
    }
    let start = u32::from_le_bytes([entry[8], entry[9], entry[10], entry[11]]);
    let size = u32::from_le_bytes([entry[12], entry[13], entry[14], entry[15]]);

    let part = BlockDevice::new(PartitionDriver {
        start_sector: start,
        num_sectors: size,
    });
    match add_child(dev, &part) {
        Ok(()) => {
            info!("new partition found start={start} sectors={size}");
            register(part, events);
        }
        Err(e) => error!("cannot add partition: {e}"),
    }
}
