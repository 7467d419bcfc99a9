//! Deleting partitions.

use crate::pte::Role;
use crate::DosLabel;
use ap_fdisk::{Context, Result};
use ap_mbr::Partition;

impl DosLabel {
    pub(crate) fn delete_partition(&mut self, cxt: &mut Context, n: usize) -> Result<()> {
        log::debug!("dos: delete partition {n}");
        self.delete_slot(cxt, n);
        Ok(())
    }

    /// Remove slot `n` and keep the chain of records intact.
    pub(crate) fn delete_slot(&mut self, cxt: &mut Context, n: usize) {
        let empty = Partition::default();
        if n < 4 {
            if matches!(self.ptes[n].role, Role::Extended) {
                // the logical partitions go with their container
                self.ptes.truncate(4);
                self.ptes[n].role = Role::Primary;
                self.ext_offset = 0;
            }
            self.set_entry(cxt, n, &empty);
            self.set_changed(n);
            return;
        }

        let link = self.link(n).unwrap_or_default();
        if link.typ == 0 && n > 4 {
            // the last one in the chain
            self.set_link(n - 1, &empty);
            self.set_changed(n - 1);
            self.ptes.remove(n);
            self.changed = true;
            return;
        }

        if n > 4 {
            // the previous record skips this one
            self.set_link(n - 1, &link);
            self.set_changed(n - 1);
        } else if self.ptes.len() > 5 {
            // the next record moves into the first one
            let abs = self.abs_start(cxt, 5);
            if let Some(ebr) = self.ptes[5].ebr_mut() {
                ebr.offset = self.ext_offset;
            }
            let mut p = self.entry(cxt, 5);
            p.lba = (abs - self.ext_offset) as u32;
            self.set_entry(cxt, 5, &p);
            self.set_changed(5);
        }

        let only = self.ptes.len() == 5;
        self.ptes.remove(n);
        if only {
            // an empty record gets written over the old one
            if let Some(ext) = self.ext_index() {
                self.set_changed(ext);
            }
        }
        self.changed = true;
    }
}
