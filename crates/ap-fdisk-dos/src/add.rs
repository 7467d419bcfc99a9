//! Adding partitions.
//!
//! Free space is searched the way fdisk always did: the first sector that
//! is not inside a used range, where logical partitions keep `first_lba`
//! sectors in front of them for their extended boot record.

use crate::pte::{chs_range, Pte, Role};
use crate::{Boxes, DosLabel, MAXIMUM_PARTS};
use ap_fdisk::{fail, size_to_human, Context, NumberQuery, Partition, Result};
use ap_mbr::{is_extended, DOS_EXTENDED, LINUX_DATA};

/// Used ranges by slot: `(first, last)` in absolute sectors.
type Bounds = Vec<Option<(u64, u64)>>;

/// What kind of partition to create.
enum Kind {
    Primary(Option<usize>),
    Extended,
    Logical,
}

impl DosLabel {
    /// Add a partition as described by the template. Returns its slot.
    pub(crate) fn add_with_template(&mut self, cxt: &mut Context, pa: &Partition) -> Result<usize> {
        if pa.size == Some(0) {
            return Err(fail!(InvalidInput, "a partition needs at least one sector"));
        }
        let has_ext = self.ext_index().is_some();
        if has_ext && pa.parttype.is_some_and(is_extended) {
            cxt.warn(format_args!("Extended partition already exists."));
            return Err(fail!(Conflict, "there can only be one extended partition"));
        }

        let n = match self.select_kind(cxt, pa)? {
            Kind::Logical => return self.add_logical(cxt, pa),
            Kind::Extended => {
                let pa = Partition {
                    parttype: Some(DOS_EXTENDED),
                    ..pa.clone()
                };
                let n = self.ask_primary(cxt, &pa)?;
                self.add_partition(cxt, n, &pa)?;
                return Ok(n);
            }
            Kind::Primary(Some(n)) => n,
            Kind::Primary(None) => self.ask_primary(cxt, pa)?,
        };
        self.add_partition(cxt, n, pa)?;
        Ok(n)
    }

    fn free_primaries(&self, cxt: &Context) -> Vec<usize> {
        (0..4).filter(|&i| !self.entry(cxt, i).is_used()).collect()
    }

    fn select_kind(&self, cxt: &Context, pa: &Partition) -> Result<Kind> {
        let ext = self.ext_index();

        if let Some(n) = pa.partno.filter(|&n| n >= 4) {
            if n != self.ptes.len() {
                return Err(fail!(InvalidInput, "the next logical partition is {}", self.ptes.len() + 1));
            }
            return Ok(Kind::Logical);
        }
        if let (Some(start), Some(last)) = (pa.start, self.ext_last(cxt)) {
            if (self.ext_offset..=last).contains(&start) {
                return Ok(Kind::Logical);
            }
        }
        if let Some(n) = pa.partno {
            if self.entry(cxt, n).is_used() {
                cxt.warn(format_args!(
                    "Partition {} is already defined. Delete it before re-adding it.",
                    n + 1
                ));
                return Err(fail!(Conflict, "partition {} is already defined", n + 1));
            }
            return Ok(Kind::Primary(Some(n)));
        }

        let free = self.free_primaries(cxt);
        if pa.start.is_some() {
            return match free.first() {
                Some(&n) => Ok(Kind::Primary(Some(n))),
                None => Err(fail!(NoSpace, "all primary partitions are in use")),
            };
        }
        if free.is_empty() {
            if ext.is_some() {
                cxt.info(format_args!("All primary partitions are in use."));
                return Ok(Kind::Logical);
            }
            cxt.info(format_args!(
                "If you want to create more than four partitions, you must replace a primary partition \
                 with an extended partition first."
            ));
            return Err(fail!(NoSpace, "all primary partitions are in use"));
        }
        if self.ptes.len() >= MAXIMUM_PARTS {
            cxt.info(format_args!(
                "All logical partitions are in use. Adding a primary partition."
            ));
            return Ok(Kind::Primary(None));
        }
        if pa.parttype.is_some_and(is_extended) || !cxt.has_dialogs() {
            return Ok(Kind::Primary(None));
        }

        let default = if free.len() == 1 && ext.is_none() { 'e' } else { 'p' };
        let used = 4 - free.len() - ext.map_or(0, |_| 1);
        let query = format!(
            "Partition type ({used} primary, {} extended, {} free)",
            ext.map_or(0, |_| 1),
            free.len()
        );
        let items: &[(char, &str)] = match ext {
            Some(_) => &[('p', "primary"), ('l', "logical (numbered from 5)")],
            None => &[('p', "primary"), ('e', "extended (container for logical partitions)")],
        };
        match cxt.ask_menu(&query, items, default)? {
            'p' => Ok(Kind::Primary(None)),
            'e' if ext.is_none() => Ok(Kind::Extended),
            'l' if ext.is_some() => Ok(Kind::Logical),
            c => {
                cxt.warn(format_args!("Invalid partition type `{c}'."));
                Err(fail!(InvalidInput, "invalid partition type {c:?}"))
            }
        }
    }

    /// The number of a free primary slot.
    fn ask_primary(&self, cxt: &Context, pa: &Partition) -> Result<usize> {
        let free = self.free_primaries(cxt);
        let (Some(&first), Some(&last)) = (free.first(), free.last()) else {
            return Err(fail!(NoSpace, "all primary partitions are in use"));
        };
        if let Some(n) = pa.partno {
            return Ok(n);
        }
        if !cxt.has_dialogs() || free.len() == 1 {
            return Ok(first);
        }
        let reply = cxt.ask_number(&NumberQuery {
            query: "Partition number".into(),
            low: first as u64 + 1,
            default: first as u64 + 1,
            high: last as u64 + 1,
            base: first as u64 + 1,
            unit: 1,
        })?;
        let n = reply.value as usize - 1;
        if !free.contains(&n) {
            cxt.warn(format_args!(
                "Partition {} is already defined. Delete it before re-adding it.",
                n + 1
            ));
            return Err(fail!(Conflict, "partition {} is already defined", n + 1));
        }
        Ok(n)
    }

    /// Build the extended partition a new logical one goes into.
    fn create_extended(&mut self, cxt: &mut Context, pa: &Partition) -> Result<()> {
        let Some(&n) = self.free_primaries(cxt).first() else {
            cxt.info(format_args!(
                "If you want to create more than four partitions, you must replace a primary partition \
                 with an extended partition first."
            ));
            return Err(fail!(NoSpace, "no free primary slot for an extended partition"));
        };
        let first_lba = cxt.first_lba();
        let lead = match self.boxes {
            Boxes::OneSector => 1,
            Boxes::Nested | Boxes::Chained => first_lba,
        };
        let mut ext = Partition::new().parttype(DOS_EXTENDED).follow_default(true);
        if let Some(start) = pa.start {
            match start.checked_sub(lead) {
                Some(v) if v > 0 => ext.start = Some(v),
                _ => return Err(fail!(InvalidInput, "no room for an extended partition before sector {start}")),
            }
        }
        if let (Boxes::Chained, Some(size)) = (self.boxes, pa.size) {
            ext.size = Some(lead + size);
            ext.size_explicit = pa.size_explicit;
        }
        log::debug!("dos: creating {:?} extended partition {n}", self.boxes);
        self.add_partition(cxt, n, &ext)
    }

    fn add_logical(&mut self, cxt: &mut Context, pa: &Partition) -> Result<usize> {
        if pa.parttype.is_some_and(is_extended) {
            return Err(fail!(Conflict, "a logical partition cannot be extended"));
        }
        if self.ext_index().is_none() {
            self.create_extended(cxt, pa)?;
        }
        let n = self.ptes.len();
        if n >= MAXIMUM_PARTS {
            cxt.info(format_args!("The maximum number of partitions has been created."));
            return Err(fail!(NoSpace, "the maximum number of partitions has been created"));
        }
        let offset = if n == 4 { self.ext_offset } else { 0 };
        self.ptes.push(Pte::logical(offset, cxt.get_sector_size()));
        self.changed = true;
        cxt.info(format_args!("Adding logical partition {}", n + 1));

        let mut pa = pa.clone();
        if n == 4 && self.boxes == Boxes::OneSector && pa.start.is_none() {
            pa.start = Some(self.ext_offset + 1);
        }
        self.add_partition(cxt, n, &pa)?;
        Ok(n)
    }

    /// Used ranges of all slots. The extended partition counts for primaries.
    fn fill_bounds(&self, cxt: &Context, n: usize) -> Bounds {
        let mut bounds: Bounds = (0..self.ptes.len()).map(|i| self.bounds(cxt, i)).collect();
        if n < 4 {
            if let (Some(ext), Some(last)) = (self.ext_index(), self.ext_last(cxt)) {
                bounds[ext] = Some((self.ext_offset, last));
            }
        }
        if cxt.use_cylinders() {
            let units = cxt.units_per_sector();
            for (first, _) in bounds.iter_mut().flatten() {
                *first = (cxt.cround(*first) - 1) * units;
            }
        }
        bounds
    }

    /// The first sector at or after `start` that no partition uses.
    fn unused_start(&self, cxt: &Context, n: usize, mut start: u64, bounds: &Bounds) -> u64 {
        let first_lba = cxt.first_lba();
        loop {
            let before = start;
            for (i, bound) in bounds.iter().enumerate() {
                if start == self.offset(i) {
                    start += first_lba;
                }
                if let Some((first, last)) = *bound {
                    let lastplusoff = last + if n < 4 { 0 } else { first_lba };
                    if start >= first && start <= lastplusoff {
                        start = lastplusoff + 1;
                    }
                }
            }
            if start == before {
                return start;
            }
        }
    }

    /// The aligned default start. Falls back to `start` if alignment leaves no room.
    fn default_start(&self, cxt: &Context, n: usize, start: u64, limit: u64, bounds: &Bounds) -> u64 {
        let mut dflt = start;
        loop {
            let aligned = cxt.align_lba_in_range(dflt, dflt, limit);
            let next = self.unused_start(cxt, n, aligned, bounds);
            if next == dflt || !(next != aligned && next > aligned && next < limit) {
                dflt = next;
                break;
            }
            dflt = next;
        }
        if dflt >= limit {
            dflt = start;
        }
        dflt
    }

    /// Place partition `n` and write its entry.
    pub(crate) fn add_partition(&mut self, cxt: &mut Context, n: usize, pa: &Partition) -> Result<()> {
        if self.entry(cxt, n).is_used() {
            cxt.warn(format_args!(
                "Partition {} is already defined. Delete it before re-adding it.",
                n + 1
            ));
            return Err(fail!(Conflict, "partition {} is already defined", n + 1));
        }
        let hybrid = n < 4 && cxt.is_parent_gpt();
        let saved = (cxt.first_lba(), cxt.grain());
        if hybrid {
            // a hybrid MBR may use everything after the protective sector
            cxt.set_first_lba(1);
            cxt.set_grain(cxt.get_sector_size());
        }
        let res = self.place_partition(cxt, n, pa);
        if hybrid {
            cxt.set_first_lba(saved.0);
            cxt.set_grain(saved.1);
        }
        res
    }

    fn place_partition(&mut self, cxt: &mut Context, n: usize, pa: &Partition) -> Result<()> {
        let typ = pa.parttype.unwrap_or(LINUX_DATA);
        let first_lba = cxt.first_lba();
        let units = cxt.units_per_sector();
        let bounds = self.fill_bounds(cxt, n);

        let (low, mut limit) = if n < 4 {
            let geom = cxt.geom();
            let limit = match cxt.use_cylinders() || cxt.total_sectors() == 0 {
                true => (geom.heads as u64 * geom.sectors as u64 * geom.cylinders).saturating_sub(1),
                false => cxt.last_lba(),
            };
            (first_lba, limit.min(u32::MAX as u64))
        } else {
            let last = self
                .ext_last(cxt)
                .ok_or_else(|| fail!(InvalidInput, "there is no extended partition"))?;
            (self.ext_offset + first_lba, last)
        };

        // first sector
        let mut lowest = self.unused_start(cxt, n, low, &bounds);
        let mut start = loop {
            if lowest > limit {
                cxt.info(format_args!("No free sectors available."));
                return Err(fail!(NoSpace, "no free sectors available"));
            }
            let dflt = self.default_start(cxt, n, lowest, limit, &bounds);
            let start = if let Some(start) = pa.start {
                let min = if n < 4 { 1 } else { self.ext_offset + 1 };
                if start > limit {
                    return Err(fail!(NoSpace, "sector {start} is beyond the usable range ending at {limit}"));
                }
                if start < min {
                    return Err(fail!(InvalidInput, "sector {start} is below the usable range"));
                }
                if self.unused_start(cxt, n, start, &bounds) != start {
                    cxt.info(format_args!("Sector {start} is already allocated."));
                    return Err(fail!(Conflict, "sector {start} is already allocated"));
                }
                break start;
            } else if pa.start_follow_default {
                dflt
            } else {
                let query = match cxt.use_cylinders() {
                    true => "First cylinder",
                    false => "First sector",
                };
                let reply = cxt.ask_number(&NumberQuery {
                    query: query.into(),
                    low: cxt.cround(lowest),
                    default: cxt.cround(dflt),
                    high: cxt.cround(limit),
                    base: cxt.cround(lowest),
                    unit: cxt.get_sector_size() * units,
                })?;
                match cxt.use_cylinders() {
                    true => ((reply.value - 1) * units).max(lowest),
                    false => reply.value,
                }
            };
            let unused = self.unused_start(cxt, n, start, &bounds);
            if unused < start + units {
                break unused;
            }
            cxt.info(format_args!("Sector {start} is already allocated."));
            lowest = unused;
        };

        if n > 4 {
            let mut offset = start.saturating_sub(first_lba);
            if offset == self.ext_offset {
                offset += 1;
                if first_lba == 1 {
                    start += 1;
                }
            }
            if offset <= self.ext_offset {
                return Err(fail!(Conflict, "no room for the extended boot record before sector {start}"));
            }
            if let Some(ebr) = self.ptes[n].ebr_mut() {
                ebr.offset = offset;
            }
        }

        for (i, bound) in bounds.iter().enumerate() {
            let offset = self.offset(i);
            if start < offset && limit >= offset {
                limit = offset - 1;
            }
            if let Some((first, _)) = *bound {
                if start < first && limit >= first {
                    limit = first - 1;
                }
            }
        }
        if start > limit {
            cxt.info(format_args!("No free sectors available."));
            return Err(fail!(NoSpace, "no free sectors available"));
        }

        let stop = self.last_sector(cxt, pa, start, limit)?;

        let boot = if pa.bootable == Some(true) { ap_mbr::ACTIVE } else { 0 };
        self.set_data(cxt, n, start, stop, typ, boot)?;
        if n > 4 {
            let offset = self.offset(n);
            self.set_link_range(cxt, n - 1, offset, stop)?;
        }
        if is_extended(typ) && n < 4 {
            self.ptes[n].role = Role::Extended;
            self.ext_offset = start;
        }

        let name = ap_mbr::parttype::name(typ).unwrap_or("Unknown");
        let bytes = (stop - start + 1) * cxt.get_sector_size();
        cxt.info(format_args!(
            "Created a new partition {} of type '{name}' and of size {}.",
            n + 1,
            size_to_human(bytes)
        ));
        self.changed = true;
        Ok(())
    }

    /// The last sector of a partition starting at `start`.
    fn last_sector(&self, cxt: &Context, pa: &Partition, start: u64, limit: u64) -> Result<u64> {
        if cxt.cround(start) == cxt.cround(limit) {
            return Ok(limit);
        }
        let units = cxt.units_per_sector();
        let aligned = cxt.alignment_required();

        // one past the end, unless given in cylinders
        let (mut stop, mut isrel) = if let Some(size) = pa.size {
            let stop = start.saturating_add(size);
            if stop > limit + 1 && pa.size_explicit {
                cxt.info(format_args!("Value out of range."));
                return Err(fail!(NoSpace, "the partition would end at {} beyond {limit}", stop - 1));
            }
            (stop.min(limit + 1), !pa.size_explicit)
        } else if pa.end_follow_default {
            (limit + 1, false)
        } else {
            let query = match cxt.use_cylinders() {
                true => "Last cylinder, +cylinders or +size{K,M,G,T,P}",
                false => "Last sector, +sectors or +size{K,M,G,T,P}",
            };
            let reply = cxt.ask_number(&NumberQuery {
                query: query.into(),
                low: cxt.cround(start),
                default: cxt.cround(limit),
                high: cxt.cround(limit),
                base: cxt.cround(start),
                unit: cxt.get_sector_size() * units,
            })?;
            match (cxt.use_cylinders(), reply.relative) {
                (true, rel) => (reply.value * units, rel),
                (false, true) => (reply.value, true),
                (false, false) => (reply.value + 1, false),
            }
        };

        if (!isrel || !aligned) && stop > start {
            stop -= 1;
        }
        if isrel && aligned && stop - start < cxt.grain_sectors() {
            // too small to align
            isrel = false;
            if stop > start {
                stop -= 1;
            }
        }
        if isrel && aligned {
            let end = cxt.align_lba_in_range(stop, start, limit);
            if end > start {
                stop = end - 1;
            }
        }
        if stop > limit {
            if pa.size.is_some() && pa.size_explicit {
                cxt.info(format_args!("Value out of range."));
                return Err(fail!(NoSpace, "the partition would end at {stop} beyond {limit}"));
            }
            stop = limit;
        }
        Ok(stop)
    }

    /// Write the data entry of slot `n` for `start..=stop`.
    pub(crate) fn set_data(&mut self, cxt: &mut Context, n: usize, start: u64, stop: u64, typ: u8, boot: u8) -> Result<()> {
        let relative = start - self.offset(n);
        let lba = u32::try_from(relative).map_err(|_| fail!(NoSpace, "sector {start} cannot be addressed"))?;
        let size = u32::try_from(stop - start + 1).map_err(|_| fail!(NoSpace, "partition {} is too large", n + 1))?;
        let (begin, end) = chs_range(cxt, start, stop);
        log::debug!("dos: partition {n} start={start} stop={stop} type={typ:#04x}");
        self.set_entry(cxt, n, &ap_mbr::Partition { boot, begin, typ, end, lba, size });
        self.set_changed(n);
        Ok(())
    }

    /// Point the link of slot `n` at the record at `offset` ending at `stop`.
    pub(crate) fn set_link_range(&mut self, cxt: &Context, n: usize, offset: u64, stop: u64) -> Result<()> {
        let lba = u32::try_from(offset - self.ext_offset).map_err(|_| fail!(NoSpace, "sector {offset} cannot be addressed"))?;
        let size = u32::try_from(stop - offset + 1).map_err(|_| fail!(NoSpace, "partition {} is too large", n + 2))?;
        let (begin, end) = chs_range(cxt, offset, stop);
        self.set_link(
            n,
            &ap_mbr::Partition {
                boot: 0,
                begin,
                typ: DOS_EXTENDED,
                end,
                lba,
                size,
            },
        );
        self.set_changed(n);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Boxes, DosLabel};
    use ap_fdisk::{Context, FdiskError, Label, Partition};
    use ap_mbr::Chs;
    use ap_storage_memory::MemoryDisk;

    fn setup(disk: &MemoryDisk, label: DosLabel) -> (Context<'_>, DosLabel) {
        let mut cxt = Context::new(disk).unwrap().script(true);
        let mut label = label;
        label.create(&mut cxt).unwrap();
        (cxt, label)
    }

    #[test]
    fn defaults() {
        let disk = MemoryDisk::new(10 << 30);
        let (mut cxt, mut label) = setup(&disk, DosLabel::new());
        let pa = Partition::new().size(1 << 20);
        assert_eq!(label.add_part(&mut cxt, Some(&pa)).unwrap(), 0);
        assert_eq!(label.add_part(&mut cxt, Some(&pa)).unwrap(), 1);
        let p = label.entry(&cxt, 1);
        assert_eq!((p.lba, p.size, p.typ), (2048 + (1 << 20), 1 << 20, 0x83));

        // the rest of the disk
        let n = label.add_part(&mut cxt, Some(&Partition::new().follow_default(true))).unwrap();
        let p = label.entry(&cxt, n);
        assert_eq!(p.lba as u64 + p.size as u64, 20971520);
    }

    #[test]
    fn explicit_size() {
        let disk = MemoryDisk::new(10 << 30);
        let (mut cxt, mut label) = setup(&disk, DosLabel::new());
        let pa = Partition::new().start(2048).size(1000).explicit(true);
        label.add_part(&mut cxt, Some(&pa)).unwrap();
        assert_eq!(label.entry(&cxt, 0).size, 1000);
        // small sizes are not aligned either
        let pa = Partition::new().size(1000);
        label.add_part(&mut cxt, Some(&pa)).unwrap();
        let p = label.entry(&cxt, 1);
        assert_eq!((p.lba, p.size), (4096, 1000));
    }

    #[test]
    fn oversized() {
        let disk = MemoryDisk::new(10 << 30);
        let (mut cxt, mut label) = setup(&disk, DosLabel::new());
        let res = label.add_part(&mut cxt, Some(&Partition::new().size(u64::MAX).explicit(true)));
        assert!(matches!(res, Err(FdiskError::NoSpace(_))));
        assert!(!label.part_is_used(&cxt, 0));

        // a size that is not explicit is cut at the end of the disk
        assert_eq!(label.add_part(&mut cxt, Some(&Partition::new().size(u64::MAX))).unwrap(), 0);
        let p = label.entry(&cxt, 0);
        assert_eq!(p.lba, 2048);
        assert!(p.size > 20_000_000);
        assert!(p.lba as u64 + p.size as u64 <= 20971520);
    }

    #[test]
    fn allocated() {
        let disk = MemoryDisk::new(10 << 30);
        let (mut cxt, mut label) = setup(&disk, DosLabel::new());
        label.add_part(&mut cxt, Some(&Partition::new().start(2048).size(4096))).unwrap();
        let res = label.add_part(&mut cxt, Some(&Partition::new().start(3000).size(4096)));
        assert!(matches!(res, Err(FdiskError::Conflict(_))));
        let res = label.add_part(&mut cxt, Some(&Partition::new().partno(0).size(4096)));
        assert!(matches!(res, Err(FdiskError::Conflict(_))));
        assert!(!label.part_is_used(&cxt, 1));
        let res = label.add_part(&mut cxt, Some(&Partition::new().start(30000000).size(1)));
        assert!(matches!(res, Err(FdiskError::NoSpace(_))));
    }

    #[test]
    fn full() {
        let disk = MemoryDisk::new(10 << 30);
        let (mut cxt, mut label) = setup(&disk, DosLabel::new());
        for _ in 0..4 {
            label.add_part(&mut cxt, Some(&Partition::new().size(1 << 20))).unwrap();
        }
        let res = label.add_part(&mut cxt, None);
        assert!(matches!(res, Err(FdiskError::NoSpace(_))));
    }

    #[test]
    fn logical_chain() {
        let disk = MemoryDisk::new(10 << 30);
        let (mut cxt, mut label) = setup(&disk, DosLabel::new());
        let ext = Partition::new().start(2048).size(1 << 22).parttype(0x05);
        label.add_part(&mut cxt, Some(&ext)).unwrap();
        assert_eq!(label.extended_offset(), 2048);

        let pa = Partition::new().partno(4).size(1 << 20);
        assert_eq!(label.add_part(&mut cxt, Some(&pa)).unwrap(), 4);
        assert_eq!(label.offset(4), 2048);
        let p = label.entry(&cxt, 4);
        assert_eq!((p.lba, p.size), (2048, 1 << 20));

        // a start inside the container makes it logical
        let pa = Partition::new().start(2048 + 4096 + (1 << 20)).size(1 << 20);
        assert_eq!(label.add_part(&mut cxt, Some(&pa)).unwrap(), 5);
        assert_eq!(label.offset(5), 2048 + 2048 + (1 << 20));
        let link = label.link(4).unwrap();
        assert_eq!(link.typ, 0x05);
        assert_eq!(link.lba as u64, label.offset(5) - 2048);
        assert_eq!(label.verify(&cxt).unwrap(), 0);

        // partition numbers of logicals cannot be chosen
        let pa = Partition::new().partno(9).size(10);
        assert!(matches!(label.add_part(&mut cxt, Some(&pa)), Err(FdiskError::InvalidInput(_))));
    }

    #[test]
    fn extended_on_demand() {
        for boxes in [Boxes::Nested, Boxes::Chained, Boxes::OneSector] {
            let disk = MemoryDisk::new(10 << 30);
            let (mut cxt, mut label) = setup(&disk, DosLabel::new().boxes(boxes));
            let pa = Partition::new().partno(4).size(1 << 20).explicit(true);
            assert_eq!(label.add_part(&mut cxt, Some(&pa)).unwrap(), 4, "{boxes:?}");
            let ext = label.extended_partno().unwrap();
            let container = label.entry(&cxt, ext);
            let data = label.entry(&cxt, 4);
            assert_eq!(data.size, 1 << 20);
            match boxes {
                Boxes::Nested => assert_eq!(container.lba as u64 + container.size as u64, 20971520),
                Boxes::Chained => assert_eq!(container.size, data.lba + data.size),
                Boxes::OneSector => assert_eq!(data.lba, 1),
            }
            assert_eq!(label.verify(&cxt).unwrap(), 0, "{boxes:?}");
        }
    }

    #[test]
    fn hybrid() {
        let disk = MemoryDisk::new(10 << 30);
        let mut cxt = Context::new(&disk).unwrap().script(true).parent_is_gpt(true);
        let mut label = DosLabel::new();
        label.create(&mut cxt).unwrap();
        label.add_part(&mut cxt, Some(&Partition::new().size(33))).unwrap();
        let p = label.entry(&cxt, 0);
        assert_eq!((p.lba, p.size), (1, 33));
        assert_eq!(cxt.first_lba(), 2048);
    }

    #[test]
    fn chs_sentinel() {
        let disk = MemoryDisk::new(4 << 40);
        let (mut cxt, mut label) = setup(&disk, DosLabel::new());
        label.add_part(&mut cxt, Some(&Partition::new().start(2048).size(1 << 32))).unwrap();
        let p = label.entry(&cxt, 0);
        assert_eq!(p.begin, Chs::new(0, 32, 33));
        assert_eq!(p.end, Chs::new(1023, 254, 63));
        assert_eq!(p.size, 4294963200);
    }
}
