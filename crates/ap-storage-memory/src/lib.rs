//! In-memory disks.
//!
//! Provides read-access to slices and a sparse read-write disk that can
//! pretend to be terabytes large while only the touched pages use memory.
#![no_std]

extern crate alloc;

use ap_storage::{Error, Offset, Read, Write};
use core::cell::RefCell;

mod slice;
mod sparse;
pub use slice::*;

/// A sparse disk in memory.
///
/// Unwritten areas read as zero.  Every write is recorded so that callers
/// can check what was written and in which order.
pub struct MemoryDisk(RefCell<sparse::SparseImpl>);

impl MemoryDisk {
    /// Create an empty disk of the given size in bytes.
    pub fn new(size: Offset) -> Self {
        Self(RefCell::new(sparse::SparseImpl::new(size)))
    }

    /// Create a disk with a copy of the data at the beginning.
    pub fn with_data(size: Offset, data: &[u8]) -> Self {
        let disk = Self::new(size);
        disk.0.borrow_mut().write_mut(0, data);
        disk
    }

    /// The size in bytes.
    pub fn size(&self) -> Offset {
        self.0.borrow().size
    }

    /// The offsets of all writes in the order they happened.
    pub fn writes(&self) -> alloc::vec::Vec<Offset> {
        self.0.borrow().log.clone()
    }

    /// Forget the recorded writes.
    pub fn clear_writes(&self) {
        self.0.borrow_mut().log.clear()
    }

    /// Copy a range of the disk into a new vector.
    pub fn snapshot(&self, offset: Offset, len: usize) -> alloc::vec::Vec<u8> {
        let mut buf = alloc::vec![0u8; len];
        self.0.borrow().read(offset, &mut buf);
        buf
    }
}

impl Read for MemoryDisk {
    fn read_bytes(&self, ofs: Offset, buf: &mut [u8]) -> Result<usize, Error> {
        Ok(self.0.borrow().read(ofs, buf))
    }
}

impl Write for MemoryDisk {
    fn write_bytes(&self, ofs: Offset, buf: &[u8]) -> Result<usize, Error> {
        let mut disk = self.0.borrow_mut();
        if ofs >= disk.size {
            return Ok(0);
        }
        disk.log.push(ofs);
        Ok(disk.write_mut(ofs, buf))
    }
}
