//! Repairs: disk order, moving the data start and CHS values.

use crate::pte::chs_range;
use crate::DosLabel;
use ap_fdisk::{fail, Context, NumberQuery, Result};
use ap_mbr::Partition;

impl DosLabel {
    /// The first partition that starts before an earlier one and that earlier one.
    ///
    /// Primary and logical partitions are checked separately.
    pub fn wrong_p_order(&self, cxt: &Context) -> Option<(usize, usize)> {
        let (mut last_start, mut last_i) = (0, 0);
        for i in 0..self.ptes.len() {
            if i == 4 {
                (last_start, last_i) = (0, 4);
            }
            if !self.entry(cxt, i).is_used() {
                continue;
            }
            let start = self.abs_start(cxt, i);
            if last_start > start {
                return Some((i, last_i));
            }
            (last_start, last_i) = (start, i);
        }
        None
    }

    fn ebrs_sorted(&self) -> bool {
        let offsets: Vec<_> = self.ptes.iter().skip(4).map(|pe| pe.offset()).collect();
        offsets.windows(2).all(|w| w[0] < w[1])
    }

    /// Sort the partitions into disk order.
    pub(crate) fn fix_order(&mut self, cxt: &mut Context) -> Result<bool> {
        if self.wrong_p_order(cxt).is_none() && self.ebrs_sorted() {
            cxt.info(format_args!("Nothing to do. Ordering is correct already."));
            return Ok(false);
        }
        while let Some((i, k)) = self.wrong_p_order(cxt).filter(|&(i, _)| i < 4) {
            log::debug!("dos: swapping primary {i} and {k}");
            let (pi, pk) = (self.entry(cxt, i), self.entry(cxt, k));
            self.set_entry(cxt, i, &pk);
            self.set_entry(cxt, k, &pi);
            let role = core::mem::replace(&mut self.ptes[i].role, crate::pte::Role::Primary);
            self.ptes[i].role = core::mem::replace(&mut self.ptes[k].role, role);
            self.set_changed(i);
            self.set_changed(k);
        }
        if self.nlogicals() > 0 {
            self.fix_chain(cxt)?;
        }
        cxt.info(format_args!("Done."));
        Ok(true)
    }

    /// Sort the records and the logical partitions and relink the chain.
    fn fix_chain(&mut self, cxt: &mut Context) -> Result<()> {
        // records without a place go last
        self.ptes[4..].sort_by_key(|pe| match pe.offset() {
            0 => u64::MAX,
            offset => offset,
        });

        // move the data into the records in the same order
        let n = self.ptes.len();
        let mut sorted = false;
        while !sorted {
            sorted = true;
            for j in 4..n - 1 {
                let (sj, sjj) = (self.abs_start(cxt, j), self.abs_start(cxt, j + 1));
                if sj <= sjj {
                    continue;
                }
                let (mut pj, mut pjj) = (self.entry(cxt, j + 1), self.entry(cxt, j));
                pj.lba = relative(sjj, self.offset(j))?;
                pjj.lba = relative(sj, self.offset(j + 1))?;
                self.set_entry(cxt, j, &pj);
                self.set_entry(cxt, j + 1, &pjj);
                sorted = false;
            }
        }

        for j in 4..n {
            if j + 1 < n {
                let offset = self.offset(j + 1);
                let p = self.entry(cxt, j + 1);
                let stop = (offset + p.lba as u64 + p.size as u64).saturating_sub(1).max(offset);
                self.set_link_range(cxt, j, offset, stop)?;
            } else {
                self.set_link(j, &Partition::default());
            }
            self.set_changed(j);
        }
        Ok(())
    }

    /// Ask for a new first sector of partition `n` and keep its end.
    pub(crate) fn move_data_begin(&mut self, cxt: &mut Context, n: usize) -> Result<()> {
        let mut p = self.entry(cxt, n);
        if !p.is_used() || p.is_extended() {
            cxt.warn(format_args!("Partition {}: no data area.", n + 1));
            return Ok(());
        }
        let offset = self.offset(n);
        let curr = self.abs_start(cxt, n);
        let last = curr + p.size as u64 - 1;

        // the free space right before the partition
        let mut free_start = if offset != 0 { offset + 1 } else { 0 };
        for i in (0..self.ptes.len()).filter(|&i| i != n) {
            let q = self.entry(cxt, i);
            if !q.is_used() {
                continue;
            }
            let end = self.abs_start(cxt, i) + q.size as u64;
            if end > free_start && end <= curr {
                free_start = end;
            }
        }

        let reply = cxt.ask_number(&NumberQuery {
            query: "New beginning of data".into(),
            low: free_start,
            default: curr,
            high: last,
            base: free_start,
            unit: cxt.get_sector_size(),
        })?;
        let start = reply.value;
        if start == curr {
            return Ok(());
        }
        p.lba = relative(start, offset)?;
        p.size = (last - start + 1) as u32;
        (p.begin, p.end) = chs_range(cxt, start, last);
        self.set_entry(cxt, n, &p);
        self.set_changed(n);
        if p.lba == 0 {
            cxt.warn(format_args!(
                "Partition {}: the data starts in the sector of its partition table.",
                n + 1
            ));
        }
        Ok(())
    }

    /// Recalculate all CHS values from the sector numbers.
    pub(crate) fn fix_all_chs(&mut self, cxt: &mut Context) -> usize {
        let mut fixed = 0;
        for i in 0..self.ptes.len() {
            let mut changed = false;
            let mut p = self.entry(cxt, i);
            if p.is_used() {
                let start = self.abs_start(cxt, i);
                let chs = chs_range(cxt, start, start + p.size as u64 - 1);
                if chs != (p.begin, p.end) {
                    (p.begin, p.end) = chs;
                    self.set_entry(cxt, i, &p);
                    changed = true;
                }
            }
            if let Some(mut link) = self.link(i).filter(|l| l.is_used()) {
                let start = self.ext_offset + link.lba as u64;
                let chs = chs_range(cxt, start, start + link.size as u64 - 1);
                if chs != (link.begin, link.end) {
                    (link.begin, link.end) = chs;
                    self.set_link(i, &link);
                    changed = true;
                }
            }
            if changed {
                log::debug!("dos: fixed CHS of partition {i}");
                self.set_changed(i);
                fixed += 1;
            }
        }
        if fixed > 0 {
            cxt.info(format_args!("Fixed the CHS addresses of {fixed} partitions."));
        }
        fixed
    }
}

/// The start of data at `abs` relative to its table at `offset`.
fn relative(abs: u64, offset: u64) -> Result<u32> {
    abs.checked_sub(offset)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| fail!(Corrupt, "sector {abs} cannot be described by the table at {offset}"))
}
