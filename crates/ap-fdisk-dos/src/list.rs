//! Views of the table for listings.

use crate::DosLabel;
use ap_fdisk::{Context, Partition};
use serde::Serialize;

/// One raw entry of a partition table sector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawEntry {
    /// The partition the entry belongs to.
    pub partno: usize,
    /// Either "data" or "link".
    pub kind: &'static str,
    /// The sector holding the entry.
    pub sector: u64,
    pub boot: u8,
    pub begin: String,
    #[serde(rename = "type")]
    pub typ: u8,
    pub end: String,
    pub lba: u32,
    pub size: u32,
}

impl RawEntry {
    fn new(partno: usize, kind: &'static str, sector: u64, p: &ap_mbr::Partition) -> Self {
        Self {
            partno,
            kind,
            sector,
            boot: p.boot,
            begin: p.begin.to_string(),
            typ: p.typ,
            end: p.end.to_string(),
            lba: p.lba,
            size: p.size,
        }
    }
}

impl DosLabel {
    pub(crate) fn partition_view(&self, cxt: &Context, n: usize) -> Partition {
        let p = self.entry(cxt, n);
        let mut view = Partition::new().partno(n).bootable(p.is_bootable());
        view.used = p.is_used();
        view.container = n < 4 && p.is_extended();
        view.logical = n >= 4;
        if n >= 4 {
            view.parent = self.ext_index();
        }
        if p.typ != 0 || view.used {
            view.parttype = Some(p.typ);
            view.type_name = ap_mbr::parttype::name(p.typ);
        }
        if view.used {
            view.start = Some(self.abs_start(cxt, n));
            view.size = Some(p.size as u64);
            view.start_chs = Some(p.begin.to_string());
            view.end_chs = Some(p.end.to_string());
        }
        view
    }

    /// Every entry of every table sector in use, the link entries included.
    pub fn list_entries(&self, cxt: &Context) -> Vec<RawEntry> {
        let mut entries = Vec::new();
        for i in 0..self.ptes.len() {
            entries.push(RawEntry::new(i, "data", self.offset(i), &self.entry(cxt, i)));
            if let Some(link) = self.link(i) {
                entries.push(RawEntry::new(i, "link", self.offset(i), &link));
            }
        }
        entries
    }

    /// Whether boot flags other than active or inactive are set.
    pub fn is_garbage_table(&self, cxt: &Context) -> bool {
        let garbage = (0..self.ptes.len()).any(|i| {
            let boot = self.entry(cxt, i).boot;
            boot != 0 && boot != ap_mbr::ACTIVE
        });
        if garbage {
            cxt.warn(format_args!("The partition table looks like garbage. Some boot flags are invalid."));
        }
        garbage
    }
}
