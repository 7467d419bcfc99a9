//! Page based sparse storage.

use alloc::{boxed::Box, collections::BTreeMap, vec::Vec};
use ap_storage::Offset;

pub struct SparseImpl {
    /// The logical size in bytes.
    pub size: Offset,
    /// Only pages that were written.
    pages: BTreeMap<Offset, Box<[u8; PAGE_SIZE]>>,
    /// Offsets of the writes.
    pub log: Vec<Offset>,
}

const PAGE_SIZE: usize = 4096;

impl SparseImpl {
    pub fn new(size: Offset) -> Self {
        Self {
            size,
            pages: BTreeMap::new(),
            log: Vec::new(),
        }
    }

    /// Read as much as possible. Returns zero at the end of the disk.
    pub fn read(&self, ofs: Offset, buf: &mut [u8]) -> usize {
        if ofs >= self.size {
            return 0;
        }
        let n = core::cmp::min(self.size - ofs, buf.len() as Offset) as usize;
        let mut done = 0;
        while done < n {
            let pos = ofs + done as Offset;
            let page = pos / PAGE_SIZE as Offset;
            let in_page = (pos % PAGE_SIZE as Offset) as usize;
            let chunk = core::cmp::min(PAGE_SIZE - in_page, n - done);
            match self.pages.get(&page) {
                Some(data) => buf[done..done + chunk].copy_from_slice(&data[in_page..in_page + chunk]),
                None => buf[done..done + chunk].fill(0),
            }
            done += chunk;
        }
        n
    }

    /// Write as much as fits. Returns the bytes written.
    pub fn write_mut(&mut self, ofs: Offset, buf: &[u8]) -> usize {
        if ofs >= self.size {
            return 0;
        }
        let n = core::cmp::min(self.size - ofs, buf.len() as Offset) as usize;
        let mut done = 0;
        while done < n {
            let pos = ofs + done as Offset;
            let page = pos / PAGE_SIZE as Offset;
            let in_page = (pos % PAGE_SIZE as Offset) as usize;
            let chunk = core::cmp::min(PAGE_SIZE - in_page, n - done);
            let data = self.pages.entry(page).or_insert_with(|| Box::new([0; PAGE_SIZE]));
            data[in_page..in_page + chunk].copy_from_slice(&buf[done..done + chunk]);
            done += chunk;
        }
        n
    }
}
