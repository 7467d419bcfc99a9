//! Reading, creating and writing the label.

use crate::pte::{Pte, Role};
use crate::DosLabel;
use ap_fdisk::{fail, parse_id, Context, Item, ItemValue, Label, LabelItem, Location, Result};

impl DosLabel {
    /// Set up the four primary slots.
    fn init(&mut self, cxt: &mut Context) {
        self.ptes = (0..4).map(|_| Pte::primary()).collect();
        self.ext_offset = 0;
        self.changed = false;
        self.non_pt_changed = false;

        if cxt.is_listonly() {
            return;
        }
        if self.compatible {
            cxt.warn(format_args!(
                "DOS-compatible mode is deprecated. Expect partitions that are not aligned."
            ));
            if cxt.get_sector_size() != cxt.get_physical_sector_size() {
                cxt.info(format_args!(
                    "The device presents a logical sector size that is smaller than the physical sector size. \
                     Aligning to a physical sector (or optimal I/O) size boundary is recommended, \
                     or performance may be impacted."
                ));
            }
        }
        if cxt.use_cylinders() {
            cxt.warn(format_args!(
                "Cylinders as display units are deprecated."
            ));
        }
        let total = cxt.total_sectors();
        if total > u32::MAX as u64 {
            let max = (u32::MAX as u64 + 1) * cxt.get_sector_size();
            cxt.warn(format_args!(
                "The size of this disk is {} bytes. DOS partition tables can only address {max} bytes \
                 with {}-byte sectors. Use GUID partition table format (GPT).",
                total * cxt.get_sector_size(),
                cxt.get_sector_size(),
            ));
        }
    }

    pub(crate) fn probe_label(&mut self, cxt: &mut Context) -> Result<bool> {
        let sector = cxt.first_sector();
        if ap_mbr::has_aix_magic(sector) || !ap_mbr::has_magic(sector) {
            return Ok(false);
        }
        self.init(cxt);
        self.infer_geometry(cxt);

        for i in 0..4 {
            let p = self.entry(cxt, i);
            if !p.is_extended() {
                continue;
            }
            if self.ext_index().is_some() {
                cxt.warn(format_args!("Ignoring extra extended partition {}", i + 1));
                continue;
            }
            self.read_extended(cxt, i);
        }

        for i in 4..self.ptes.len() {
            let valid = self.ptes[i].ebr().map_or(true, |ebr| ap_mbr::has_magic(&ebr.sector));
            if valid {
                continue;
            }
            cxt.info(format_args!(
                "Invalid flag 0x{:02x}{:02x} of EBR (for partition {}) will be corrected by w(rite).",
                self.ptes[i].ebr().map_or(0, |ebr| ebr.sector[0x1ff]),
                self.ptes[i].ebr().map_or(0, |ebr| ebr.sector[0x1fe]),
                i + 1,
            ));
            self.set_changed(i);
            if let Some(ext) = self.ext_index() {
                self.set_changed(ext);
            }
        }

        log::debug!("dos: probed {} partitions", self.ptes.len());
        self.reset_alignment(cxt);
        Ok(true)
    }

    pub(crate) fn create_label(&mut self, cxt: &mut Context) -> Result<()> {
        let id = match cxt.get_script_header("label-id") {
            Some(s) => parse_id(s, 16)?,
            None => cxt.random_id(),
        };
        self.init(cxt);
        cxt.zeroize_first_sector();
        ap_mbr::set_disk_id(cxt.first_sector_mut(), id);
        ap_mbr::set_magic(cxt.first_sector_mut());
        self.non_pt_changed = true;
        self.changed = true;
        cxt.info(format_args!(
            "Created a new DOS disklabel with disk identifier 0x{id:08x}."
        ));
        self.reset_alignment(cxt);
        Ok(())
    }

    pub(crate) fn write_label(&mut self, cxt: &mut Context) -> Result<()> {
        if self.non_pt_changed || self.ptes.iter().take(4).any(|pe| pe.changed) {
            ap_mbr::set_magic(cxt.first_sector_mut());
            cxt.write_sector(0, cxt.first_sector())?;
        }

        // a new extended partition without logical ones gets an empty record
        if self.ptes.len() == 4 && self.ext_offset != 0 {
            if let Some(ext) = self.ext_index() {
                if self.ptes[ext].changed {
                    let mut sector = vec![0; cxt.get_sector_size() as usize];
                    ap_mbr::set_magic(&mut sector);
                    cxt.write_sector(self.ext_offset, &sector)?;
                }
            }
        }

        for pe in self.ptes.iter_mut().skip(4) {
            let Role::Logical(ebr) = &mut pe.role else {
                continue;
            };
            if pe.changed && ebr.offset != 0 {
                ap_mbr::set_magic(&mut ebr.sector);
                cxt.write_sector(ebr.offset, &ebr.sector)?;
            }
        }

        for pe in self.ptes.iter_mut() {
            pe.changed = false;
        }
        self.changed = false;
        self.non_pt_changed = false;
        cxt.flush()
    }

    /// The MBR is `0`, the record of logical partition `n + 3` is `n`.
    pub(crate) fn locate_record(&self, cxt: &Context, n: usize) -> Result<Location> {
        if n == 0 {
            return Ok(Location {
                name: "MBR",
                offset: 0,
                size: ap_mbr::SECTOR_SIZE,
            });
        }
        let i = n - 1 + 4;
        if i >= self.ptes.len() {
            return Err(fail!(InvalidInput, "there is no record {n}"));
        }
        Ok(Location {
            name: "EBR",
            offset: self.offset(i) * cxt.get_sector_size(),
            size: ap_mbr::SECTOR_SIZE,
        })
    }

    pub(crate) fn label_item(&self, cxt: &Context, item: Item) -> Option<LabelItem> {
        match item {
            Item::Id => Some(LabelItem {
                name: "Disk identifier",
                value: ItemValue::Str(format!("0x{:08x}", ap_mbr::disk_id(cxt.first_sector()))),
            }),
            _ => None,
        }
    }

    pub(crate) fn set_disk_id(&mut self, cxt: &mut Context, id: Option<&str>) -> Result<()> {
        let s = match id {
            Some(s) => s.to_string(),
            None => cxt.ask_string("Enter the new disk identifier")?,
        };
        let new = match parse_id(&s, 10) {
            Ok(v) => v,
            Err(err) => {
                cxt.warn(format_args!("Incorrect value."));
                return Err(err);
            }
        };
        let old = ap_mbr::disk_id(cxt.first_sector());
        ap_mbr::set_disk_id(cxt.first_sector_mut(), new);
        self.non_pt_changed = true;
        self.changed = true;
        cxt.info(format_args!(
            "Disk identifier changed from 0x{old:08x} to 0x{new:08x}."
        ));
        Ok(())
    }
}
