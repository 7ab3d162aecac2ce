use strata_errno::Errno;

use crate::{backend::LocalFd, MAX_FDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FdSlot {
    pub(crate) vfs_index: usize,
    pub(crate) local_fd: LocalFd,
    pub(crate) permanent: bool,
}

/// The process-wide descriptor table. All mutation happens under the one
/// mutex wrapping this table; reads copy a row out and never hold the lock
/// across a backend call.
pub(crate) struct FdTable {
    rows: [Option<FdSlot>; MAX_FDS],
}

impl FdTable {
    pub(crate) const fn new() -> Self {
        Self {
            rows: [None; MAX_FDS],
        }
    }

    /// Claims the lowest free row, or `None` when the table is full.
    pub(crate) fn allocate(&mut self, vfs_index: usize, local_fd: LocalFd) -> Option<usize> {
        let fd = self.rows.iter().position(Option::is_none)?;
        self.rows[fd] = Some(FdSlot {
            vfs_index,
            local_fd,
            permanent: false,
        });
        Some(fd)
    }

    pub(crate) fn get(&self, fd: usize) -> Option<FdSlot> {
        *self.rows.get(fd)?
    }

    /// Frees a row unless it was reserved as permanent. Called only after
    /// the backend's close has returned success.
    pub(crate) fn release(&mut self, fd: usize) {
        if let Some(row) = self.rows.get_mut(fd) {
            if row.is_some_and(|slot| !slot.permanent) {
                *row = None;
            }
        }
    }

    /// Reserves rows `[min_fd, max_fd]` as permanent for a backend, with
    /// the local descriptor equal to the row number. If any row is already
    /// occupied the rows set during this call are rolled back and nothing
    /// is reserved.
    pub(crate) fn reserve_range(
        &mut self,
        vfs_index: usize,
        min_fd: usize,
        max_fd: usize,
    ) -> Result<(), Errno> {
        for fd in min_fd..=max_fd {
            if self.rows[fd].is_some() {
                for row in &mut self.rows[min_fd..fd] {
                    if row.is_some_and(|slot| slot.vfs_index == vfs_index) {
                        *row = None;
                    }
                }
                return Err(Errno::EINVAL);
            }
            self.rows[fd] = Some(FdSlot {
                vfs_index,
                local_fd: LocalFd(fd as i32),
                permanent: true,
            });
        }
        Ok(())
    }
}
