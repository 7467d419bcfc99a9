//! Alignment of partition boundaries.
//!
//! Partitions start on grain boundaries (usually 1 MiB).  Small devices
//! fall back to the physical sector size.

use crate::{Align, Context};

const MIB: u64 = 1 << 20;

impl Context<'_> {
    fn io_size(&self) -> u64 {
        core::cmp::max(self.get_physical_sector_size(), self.min_io())
    }

    /// Whether `lba` is on a grain boundary.
    pub fn lba_is_aligned(&self, lba: u64) -> bool {
        let granularity = core::cmp::max(self.io_size(), self.grain());
        self.is_aligned_to(lba, granularity)
    }

    /// Whether `lba` is on a physical sector boundary.
    pub fn lba_is_phy_aligned(&self, lba: u64) -> bool {
        self.is_aligned_to(lba, self.io_size())
    }

    fn is_aligned_to(&self, lba: u64, granularity: u64) -> bool {
        let offset = lba.wrapping_mul(self.get_sector_size()) & (granularity - 1);
        (granularity + self.align_offset() - offset) & (granularity - 1) == 0
    }

    /// Align `lba` into the given direction.
    pub fn align_lba(&self, lba: u64, direction: Align) -> u64 {
        if self.lba_is_aligned(lba) {
            return lba;
        }
        let per_grain = self.grain_sectors();
        let mut res = if lba < self.first_lba() {
            self.first_lba()
        } else {
            match direction {
                Align::Up => (lba / per_grain + 1) * per_grain,
                Align::Down => lba / per_grain * per_grain,
                Align::Nearest => (lba + per_grain / 2) / per_grain * per_grain,
            }
        };
        let ofs = self.align_offset();
        if ofs != 0 && !self.lba_is_aligned(res) && res > ofs / self.get_sector_size() {
            // physical blocks start before LBA 0
            res -= (self.io_size() - ofs) / self.get_sector_size();
            if direction == Align::Up && res < lba {
                res += per_grain;
            }
        }
        log::trace!("lba {lba} aligned to {res}");
        res
    }

    /// Align `lba` so that it stays in `start..=stop` after aligning both.
    pub fn align_lba_in_range(&self, lba: u64, start: u64, stop: u64) -> u64 {
        let start = self.align_lba(start, Align::Up);
        let stop = self.align_lba(stop, Align::Down);
        let lba = self.align_lba(lba, Align::Nearest);
        if lba < start {
            start
        } else if lba > stop {
            stop
        } else {
            lba
        }
    }

    /// Whether partition ends should be aligned.
    pub fn alignment_required(&self) -> bool {
        self.grain() != self.get_sector_size()
    }

    /// Back to the defaults derived from the topology.
    pub fn reset_alignment(&mut self) {
        let sector_size = self.get_sector_size();
        let total = self.total_sectors();

        let mut grain = core::cmp::max(self.io_size(), MIB);
        if total <= grain * 4 / sector_size {
            grain = self.get_physical_sector_size();
        }

        let x = match self.align_offset() {
            0 if self.io_size() > MIB => self.io_size(),
            0 => MIB,
            ofs => ofs,
        };
        let mut first_lba = x / sector_size;
        if total <= first_lba * 4 {
            first_lba = self.get_physical_sector_size() / sector_size;
        }

        self.set_grain(grain);
        self.set_first_lba(first_lba);
        self.set_last_lba(total.saturating_sub(1));
        log::debug!("alignment reset: first_lba={first_lba} grain={grain}");
    }
}
