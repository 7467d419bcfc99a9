//! Walk the chain of extended boot records.

use crate::pte::{Ebr, Pte, Role};
use crate::{DosLabel, MAXIMUM_PARTS};
use ap_fdisk::Context;
use ap_mbr::Partition;

/// Pick the data and link slots of a record.
///
/// Only the first link and the first data entry count.  Missing ones get
/// the first free slot so that they can be filled later.
fn select_slots(cxt: &Context, sector: &[u8], partno: usize) -> (usize, usize) {
    let (mut data, mut link) = (None, None);
    for i in 0..4 {
        let p = Partition::decode(sector, i);
        if !p.is_used() {
            continue;
        }
        if p.is_extended() {
            match link {
                Some(_) => cxt.warn(format_args!("Extra link pointer in partition table {}.", partno + 1)),
                None => link = Some(i),
            }
        } else if p.typ != 0 {
            match data {
                Some(_) => cxt.warn(format_args!("Ignoring extra data in partition table {}.", partno + 1)),
                None => data = Some(i),
            }
        }
    }
    let data = data.unwrap_or(if link == Some(0) { 1 } else { 0 });
    let link = link.unwrap_or(if data == 0 { 1 } else { 0 });
    (data, link)
}

impl DosLabel {
    /// Read the logical partitions inside the extended primary `ext`.
    pub(crate) fn read_extended(&mut self, cxt: &mut Context, ext: usize) {
        self.ptes[ext].role = Role::Extended;
        let primary = self.entry(cxt, ext);
        if primary.lba == 0 {
            cxt.warn(format_args!("Bad offset in primary extended partition."));
            return;
        }
        self.ext_offset = primary.lba as u64;
        log::debug!("dos: reading extended partition {ext} at {}", self.ext_offset);

        let mut visited = Vec::new();
        let mut next = Some(self.ext_offset);
        while let Some(offset) = next {
            let n = self.ptes.len();
            if n >= MAXIMUM_PARTS {
                cxt.warn(format_args!(
                    "Omitting partitions after #{n}. They will be deleted if you save this partition table."
                ));
                self.set_link(n - 1, &Partition::default());
                self.set_changed(n - 1);
                return;
            }
            if visited.contains(&offset) || offset >= cxt.total_sectors() {
                cxt.warn(format_args!(
                    "The link in partition table {n} points to sector {offset} which is invalid. \
                     The chain is cut here."
                ));
                if n > 4 {
                    self.set_link(n - 1, &Partition::default());
                    self.set_changed(n - 1);
                }
                break;
            }
            visited.push(offset);

            let sector = cxt.read_sector(offset).unwrap_or_else(|err| {
                cxt.warn(format_args!("Failed to read extended partition table (offset={offset}): {err}"));
                vec![0; cxt.get_sector_size() as usize]
            });
            let (data, link) = select_slots(cxt, &sector, n);
            let pointer = Partition::decode(&sector, link);
            log::trace!("dos: EBR {n} at {offset} data={data} link={link}");
            self.ptes.push(Pte {
                role: Role::Logical(Ebr {
                    offset,
                    sector,
                    data,
                    link,
                }),
                changed: false,
            });
            next = pointer.is_extended().then(|| self.ext_offset + pointer.lba as u64);
        }

        // a tail record without data and link describes nothing
        let n = self.ptes.len();
        if n > 4 && self.entry(cxt, n - 1).is_cleared() && self.link(n - 1).is_some_and(|l| l.is_cleared()) {
            log::debug!("dos: dropping the empty record {n}");
            self.ptes.pop();
            if n - 1 > 4 {
                self.set_link(n - 2, &Partition::default());
            }
        }

        self.prune_empty(cxt);
    }

    /// Remove logical partitions without sectors. The numbering changes.
    fn prune_empty(&mut self, cxt: &mut Context) {
        loop {
            let n = self.ptes.len();
            if n <= 4 {
                return;
            }
            let first_typ = self.entry(cxt, 4).typ;
            let empty = (4..n).find(|&i| !self.entry(cxt, i).is_used() && (n > 5 || first_typ != 0));
            let Some(i) = empty else {
                return;
            };
            cxt.info(format_args!("omitting empty partition ({})", i + 1));
            self.delete_slot(cxt, i);
        }
    }
}
