//! Changing existing partitions.

use crate::pte::{chs_range, Role};
use crate::DosLabel;
use ap_fdisk::{fail, Context, Flag, Partition, Result};
use ap_mbr::{is_extended, ACTIVE};

/// Types DOS 6.x cares about.
fn is_dos_partition(typ: u8) -> bool {
    matches!(
        typ,
        0x01 | 0x04 | 0x06 | 0x0b | 0x0c | 0x0e | 0x11 | 0x12 | 0x14 | 0x16 | 0x1b | 0x1c | 0x1e | 0x24 | 0xc1 | 0xc4 | 0xc6
    )
}

impl DosLabel {
    /// Apply the set fields of the template to partition `n`.
    pub(crate) fn set_partition(&mut self, cxt: &mut Context, n: usize, pa: &Partition) -> Result<()> {
        let old = self.entry(cxt, n);
        let mut p = old;

        if let Some(typ) = pa.parttype.filter(|&t| t != old.typ) {
            self.check_type_change(cxt, n, old.typ, typ)?;
            if is_dos_partition(typ) || is_dos_partition(old.typ) {
                cxt.info(format_args!(
                    "If you have created or modified any DOS 6.x partitions, please see the fdisk documentation \
                     for additional information."
                ));
            }
            if typ == 0 {
                cxt.warn(format_args!(
                    "Type 0 means free space to many systems. Having partitions of type 0 is probably unwise."
                ));
            }
            p.typ = typ;
        }

        let old_start = self.abs_start(cxt, n);
        let start = match (pa.start, old.is_used()) {
            (Some(start), _) => start,
            (None, true) => old_start,
            (None, false) => return Err(fail!(InvalidInput, "partition {} needs a start", n + 1)),
        };
        let size = pa.size.unwrap_or(old.size as u64);
        if size == 0 {
            return Err(fail!(InvalidInput, "a partition needs at least one sector"));
        }
        let stop = start
            .checked_add(size - 1)
            .ok_or_else(|| fail!(NoSpace, "partition {} would end behind the last sector", n + 1))?;
        let moved = start != old_start || size != old.size as u64;
        if moved {
            self.check_range(cxt, n, p.typ, start, stop)?;
            p.lba = u32::try_from(start - self.offset(n))
                .map_err(|_| fail!(NoSpace, "sector {start} cannot be addressed"))?;
            p.size = u32::try_from(size).map_err(|_| fail!(NoSpace, "partition {} is too large", n + 1))?;
            (p.begin, p.end) = chs_range(cxt, start, stop);
        }
        if let Some(bootable) = pa.bootable {
            p.boot = if bootable { ACTIVE } else { 0 };
        }
        if p == old {
            return Ok(());
        }

        log::debug!("dos: set partition {n} start={start} stop={stop} type={:#04x}", p.typ);
        self.set_entry(cxt, n, &p);
        self.set_changed(n);
        if moved && n > 4 {
            let offset = self.offset(n);
            self.set_link_range(cxt, n - 1, offset, stop)?;
        }

        if n < 4 {
            match (old.is_extended(), p.is_extended()) {
                (false, true) => {
                    self.ptes[n].role = Role::Extended;
                    self.ext_offset = start;
                }
                (true, false) => {
                    self.ptes.truncate(4);
                    self.ptes[n].role = Role::Primary;
                    self.ext_offset = 0;
                }
                (true, true) => self.ext_offset = start,
                (false, false) => {}
            }
        }
        Ok(())
    }

    fn check_type_change(&self, cxt: &Context, n: usize, old: u8, new: u8) -> Result<()> {
        let conflict = match (is_extended(old), is_extended(new)) {
            (true, false) => self.nlogicals() > 0,
            (false, true) => n >= 4 || self.ext_index().is_some_and(|ext| ext != n),
            _ => false,
        };
        if conflict {
            cxt.warn(format_args!(
                "You cannot change a partition into an extended one or vice versa. Delete it first."
            ));
            return Err(fail!(Conflict, "partition {} cannot change between extended and data", n + 1));
        }
        Ok(())
    }

    /// Whether partition `n` of type `typ` may cover `start..=stop`.
    fn check_range(&self, cxt: &Context, n: usize, typ: u8, start: u64, stop: u64) -> Result<()> {
        if start == 0 {
            return Err(fail!(Conflict, "sector 0 holds the partition table"));
        }
        if stop >= cxt.total_sectors() {
            return Err(fail!(NoSpace, "partition {} would end behind the disk", n + 1));
        }
        let overlaps = |first: u64, last: u64| start <= last && first <= stop;

        if is_extended(typ) {
            if self.nlogicals() > 0 && start != self.ext_offset {
                return Err(fail!(Conflict, "the extended partition holds logical partitions"));
            }
            for i in 4..self.ptes.len() {
                let last = self.bounds(cxt, i).map_or(self.offset(i), |(_, last)| last);
                if last > stop {
                    return Err(fail!(Conflict, "logical partition {} would be outside", i + 1));
                }
            }
        } else if n >= 4 {
            let Some(ext_last) = self.ext_last(cxt) else {
                return Err(fail!(Corrupt, "logical partition without an extended one"));
            };
            if start <= self.offset(n) || stop > ext_last {
                return Err(fail!(Conflict, "partition {} would leave the extended partition", n + 1));
            }
            let ebr = (4..self.ptes.len()).find(|&i| i != n && (start..=stop).contains(&self.offset(i)));
            if let Some(i) = ebr {
                return Err(fail!(Conflict, "partition {} would cover the table of partition {}", n + 1, i + 1));
            }
        } else if let (Some(ext), Some(last)) = (self.ext_index(), self.ext_last(cxt)) {
            if ext != n && overlaps(self.ext_offset, last) {
                return Err(fail!(Conflict, "partition {} would overlap the extended partition", n + 1));
            }
        }

        for i in (0..self.ptes.len()).filter(|&i| i != n) {
            if let Some((first, last)) = self.bounds(cxt, i) {
                if overlaps(first, last) && !(is_extended(typ) && i >= 4) {
                    return Err(fail!(Conflict, "partition {} would overlap partition {}", n + 1, i + 1));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn toggle_partition_flag(&mut self, cxt: &mut Context, n: usize, flag: Flag) -> Result<()> {
        let Flag::Active = flag else {
            return Err(fail!(Unsupported, "flag {flag:?} is not supported by DOS partition tables"));
        };
        let mut p = self.entry(cxt, n);
        if p.is_extended() && p.boot == 0 {
            cxt.warn(format_args!("Partition {}: is an extended partition.", n + 1));
        }
        p.boot = if p.boot != 0 { 0 } else { ACTIVE };
        self.set_entry(cxt, n, &p);
        self.set_changed(n);
        let state = if p.boot != 0 { "enabled" } else { "disabled" };
        cxt.info(format_args!("The bootable flag on partition {} is {state} now.", n + 1));
        Ok(())
    }
}
