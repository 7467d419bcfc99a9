//! Consistency checks.
//!
//! Problems that make the table unusable are counted.  Everything else is
//! only reported.

use crate::DosLabel;
use ap_fdisk::Context;
use ap_mbr::{Chs, Partition};

impl DosLabel {
    /// Check the table and return the number of errors.
    pub(crate) fn verify_label(&self, cxt: &Context) -> usize {
        let mut errors = 0;
        let mut error = |msg: String| {
            cxt.warn(format_args!("{msg}"));
            errors += 1;
        };
        let n = self.ptes.len();
        let bounds: Vec<_> = (0..n).map(|i| self.bounds(cxt, i)).collect();
        let mut total = 1u64;

        for i in 0..n {
            let p = self.entry(cxt, i);
            self.check_empty(cxt, i, &p);
            if !p.is_used() {
                continue;
            }
            for (what, chs) in [("beginning", p.begin), ("end", p.end)] {
                if let Some(msg) = self.chs_problem(cxt, chs) {
                    error(format!("Partition {}: {what} {chs} {msg}.", i + 1));
                }
            }
            let Some((first, last)) = bounds[i] else {
                continue;
            };
            self.check_consistency(cxt, i, &p);
            if !cxt.lba_is_phy_aligned(first) {
                cxt.warn(format_args!(
                    "Partition {} does not start on physical sector boundary.",
                    i + 1
                ));
            }
            if first == 0 {
                error(format!("Partition {}: contains sector 0", i + 1));
            }
            if i >= 4 && p.lba == 0 {
                error(format!("Partition {}: bad start-of-data.", i + 1));
            }
            if last >= cxt.total_sectors() {
                error(format!(
                    "Partition {}: ends at {last} behind the last sector {}.",
                    i + 1,
                    cxt.total_sectors().saturating_sub(1)
                ));
            }
            total += last + 1 - first;
            for (j, bound) in bounds.iter().enumerate().take(i) {
                let Some((jfirst, jlast)) = *bound else {
                    continue;
                };
                if first <= jlast && jfirst <= last {
                    error(format!("Partition {}: overlaps partition {}.", j + 1, i + 1));
                    total -= last.min(jlast) - first.max(jfirst) + 1;
                }
            }
        }

        let extended = (0..4).filter(|&i| self.entry(cxt, i).is_extended()).count();
        if extended > 1 {
            error(format!("There are {extended} extended partitions."));
        }

        if let (Some(ext), Some(ext_last)) = (self.ext_index(), self.ext_last(cxt)) {
            for i in 4..n {
                total += 1;
                let p = self.entry(cxt, i);
                if p.typ == 0 {
                    if i != 4 || i + 1 < n {
                        error(format!("Partition {}: empty.", i + 1));
                    }
                } else if let Some((first, last)) = bounds[i] {
                    if first < self.ext_offset || last > ext_last || self.offset(i) < self.ext_offset {
                        error(format!(
                            "Logical partition {}: not entirely in partition {}.",
                            i + 1,
                            ext + 1
                        ));
                    }
                }
                if i == 4 && self.offset(i) != self.ext_offset {
                    error(format!(
                        "Partition 5: its table is not at the beginning of partition {}.",
                        ext + 1
                    ));
                }
                if i + 1 < n {
                    let link = self.link(i).unwrap_or_default();
                    let target = self.offset(i + 1).checked_sub(self.ext_offset);
                    if !link.is_extended() || Some(link.lba as u64) != target {
                        error(format!(
                            "Partition {}: the link does not point to the table of partition {}.",
                            i + 1,
                            i + 2
                        ));
                    }
                }
                let offset = self.offset(i);
                if let Some(j) = (4..i).find(|&j| offset != 0 && self.offset(j) == offset) {
                    error(format!("Partition {}: shares its table with partition {}.", i + 1, j + 1));
                }
                if let Some((first, last)) = bounds[i] {
                    let covered = (4..n).find(|&j| j != i && (first..=last).contains(&self.offset(j)));
                    if let Some(j) = covered {
                        error(format!("Partition {}: covers the table of partition {}.", i + 1, j + 1));
                    }
                }
            }
            if (5..n).any(|i| self.offset(i) != 0 && self.offset(i) < self.offset(i - 1)) {
                cxt.warn(format_args!("The extended boot records are not in disk order."));
            }
        }

        let bootable = (0..n).filter(|&i| self.entry(cxt, i).is_bootable()).count();
        if bootable > 1 && !self.linux_only {
            error(format!("There are {bootable} bootable partitions."));
        }
        if bootable == 0 && n > 0 && (0..4).any(|i| bounds[i].is_some()) {
            cxt.info(format_args!("No partition is marked bootable."));
        }
        if let Some((i, prev)) = self.wrong_p_order(cxt) {
            cxt.info(format_args!(
                "Partition table entries are not in disk order: {} starts before {}.",
                i + 1,
                prev + 1
            ));
        }

        let n_sectors = cxt.total_sectors();
        if total > n_sectors {
            error(format!(
                "Total allocated sectors {total} greater than the maximum {n_sectors}."
            ));
        } else if total < n_sectors {
            cxt.info(format_args!(
                "Remaining {} unallocated {}-byte sectors.",
                n_sectors - total,
                cxt.get_sector_size()
            ));
        }
        log::debug!("dos: verify found {errors} errors");
        errors
    }

    /// Unused entries should be all zero.
    fn check_empty(&self, cxt: &Context, i: usize, p: &Partition) {
        if p.is_used() || p.is_cleared() {
            return;
        }
        if p.typ != 0 || p.lba != 0 || p.boot != 0 {
            cxt.warn(format_args!(
                "Partition {}: has no sectors but type {:#04x}, start {} and boot flag {:#04x}.",
                i + 1,
                p.typ,
                p.lba,
                p.boot
            ));
        }
    }

    /// Why the address is outside of the geometry.
    fn chs_problem(&self, cxt: &Context, chs: Chs) -> Option<&'static str> {
        let geom = cxt.geom();
        if chs.is_zero() || chs.is_overflowed() || geom.heads == 0 || geom.sectors == 0 {
            return None;
        }
        let cylinders = cxt.total_sectors().div_ceil(geom.heads as u64 * geom.sectors as u64);
        if chs.head as u32 >= geom.heads {
            Some("has a head greater than the maximum")
        } else if chs.sector == 0 || chs.sector as u32 > geom.sectors {
            Some("has an invalid sector")
        } else if chs.cylinder as u64 >= cylinders.max(1) {
            Some("has a cylinder greater than the maximum")
        } else {
            None
        }
    }

    /// Compare the stored CHS values of a primary with the computed ones.
    fn check_consistency(&self, cxt: &Context, i: usize, p: &Partition) {
        let geom = cxt.geom();
        if !self.compatible || i >= 4 || geom.heads == 0 || geom.sectors == 0 {
            return;
        }
        let first = p.lba as u64;
        let last = first + p.size as u64 - 1;
        let begin = Chs::from_lba(first, geom.heads, geom.sectors);
        let end = Chs::from_lba(last, geom.heads, geom.sectors);
        if geom.cylinders <= 1024 && p.begin != begin {
            cxt.warn(format_args!(
                "Partition {}: different physical/logical beginnings (non-Linux?): phys={}, logical={begin}",
                i + 1,
                p.begin
            ));
        }
        if geom.cylinders <= 1024 && p.end != end {
            cxt.warn(format_args!(
                "Partition {}: different physical/logical endings: phys={}, logical={end}",
                i + 1,
                p.end
            ));
        }
        if p.end.head as u32 != geom.heads - 1 || p.end.sector as u32 != geom.sectors {
            cxt.warn(format_args!("Partition {}: does not end on cylinder boundary.", i + 1));
        }
    }
}
