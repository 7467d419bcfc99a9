//! Partition table entries and their accessors.

use crate::DosLabel;
use ap_fdisk::Context;
use ap_mbr::{Chs, Partition};

/// An extended boot record.
#[derive(Clone, Debug)]
pub(crate) struct Ebr {
    /// Absolute sector of the record.
    pub offset: u64,
    pub sector: Vec<u8>,
    /// Table slot of the data entry.
    pub data: usize,
    /// Table slot of the link to the next record.
    pub link: usize,
}

/// What a slot describes.
#[derive(Clone, Debug)]
pub(crate) enum Role {
    /// An entry in the first sector.
    Primary,
    /// The primary entry holding the logical partitions.
    Extended,
    /// A logical partition with its own table sector.
    Logical(Ebr),
}

#[derive(Clone, Debug)]
pub(crate) struct Pte {
    pub role: Role,
    pub changed: bool,
}

impl Pte {
    pub fn primary() -> Self {
        Self {
            role: Role::Primary,
            changed: false,
        }
    }

    /// A logical slot with an empty table sector at `offset`.
    pub fn logical(offset: u64, sector_size: u64) -> Self {
        Self {
            role: Role::Logical(Ebr {
                offset,
                sector: vec![0; sector_size as usize],
                data: 0,
                link: 1,
            }),
            changed: true,
        }
    }

    pub fn ebr(&self) -> Option<&Ebr> {
        match &self.role {
            Role::Logical(ebr) => Some(ebr),
            _ => None,
        }
    }

    pub fn ebr_mut(&mut self) -> Option<&mut Ebr> {
        match &mut self.role {
            Role::Logical(ebr) => Some(ebr),
            _ => None,
        }
    }

    /// The sector holding the entry. Zero for primaries.
    pub fn offset(&self) -> u64 {
        self.ebr().map_or(0, |ebr| ebr.offset)
    }
}

impl DosLabel {
    /// The data entry of slot `i`.
    pub(crate) fn entry(&self, cxt: &Context, i: usize) -> Partition {
        match &self.ptes[i].role {
            Role::Logical(ebr) => Partition::decode(&ebr.sector, ebr.data),
            _ => Partition::decode(cxt.first_sector(), i),
        }
    }

    pub(crate) fn set_entry(&mut self, cxt: &mut Context, i: usize, p: &Partition) {
        match &mut self.ptes[i].role {
            Role::Logical(ebr) => p.encode(&mut ebr.sector, ebr.data),
            _ => p.encode(cxt.first_sector_mut(), i),
        }
    }

    /// The link entry of a logical slot.
    pub(crate) fn link(&self, i: usize) -> Option<Partition> {
        self.ptes[i].ebr().map(|ebr| Partition::decode(&ebr.sector, ebr.link))
    }

    pub(crate) fn set_link(&mut self, i: usize, p: &Partition) {
        if let Some(ebr) = self.ptes[i].ebr_mut() {
            p.encode(&mut ebr.sector, ebr.link);
        }
    }

    pub(crate) fn offset(&self, i: usize) -> u64 {
        self.ptes[i].offset()
    }

    /// The absolute first sector of slot `i`.
    pub(crate) fn abs_start(&self, cxt: &Context, i: usize) -> u64 {
        self.offset(i) + self.entry(cxt, i).lba as u64
    }

    /// First and last absolute sector of a data partition.
    pub(crate) fn bounds(&self, cxt: &Context, i: usize) -> Option<(u64, u64)> {
        let p = self.entry(cxt, i);
        if p.is_cleared() || p.is_extended() || !p.is_used() {
            return None;
        }
        let first = self.abs_start(cxt, i);
        Some((first, first + p.size as u64 - 1))
    }

    pub(crate) fn set_changed(&mut self, i: usize) {
        log::trace!("dos: partition {i} changed");
        self.ptes[i].changed = true;
        self.changed = true;
    }

    /// The primary slot of the extended partition.
    pub(crate) fn ext_index(&self) -> Option<usize> {
        self.ptes.iter().take(4).position(|pe| matches!(pe.role, Role::Extended))
    }

    /// The last sector of the extended partition.
    pub(crate) fn ext_last(&self, cxt: &Context) -> Option<u64> {
        let p = self.entry(cxt, self.ext_index()?);
        Some((p.lba as u64 + p.size as u64).saturating_sub(1))
    }

    /// The number of logical partitions.
    pub(crate) fn nlogicals(&self) -> usize {
        self.ptes.len().saturating_sub(4)
    }
}

/// The CHS pair describing `start..=stop` on the disk.
pub(crate) fn chs_range(cxt: &Context, start: u64, stop: u64) -> (Chs, Chs) {
    let geom = cxt.geom();
    (
        Chs::from_lba(start, geom.heads, geom.sectors),
        Chs::from_lba(stop, geom.heads, geom.sectors),
    )
}
