//! DOS partition table.
//!
//! The four primary entries live in the first sector which is owned by the
//! [`Context`].  Logical partitions are described by a chain of extended
//! boot records inside the one extended partition.  Every record holds a
//! data entry relative to itself and a link entry relative to the start of
//! the extended partition.
//!
//! Slots `0..4` are the primary entries, slot `4` and up are the logical
//! partitions in chain order.

use ap_fdisk::{fail, Context, Flag, Item, Label, LabelItem, Location, Partition, Result};

mod add;
mod chain;
mod delete;
mod disk;
mod geometry;
mod list;
mod order;
mod pte;
mod set;
mod verify;

pub use list::RawEntry;
use pte::Pte;

/// The maximal number of partitions, including the primary ones.
pub const MAXIMUM_PARTS: usize = 60;

/// The layout of an extended partition created on demand for a logical one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Boxes {
    /// Fill the free region around the new partition.
    #[default]
    Nested,
    /// Just large enough for the new partition and its record.
    Chained,
    /// Like nested, but the data follows its record directly.
    OneSector,
}

/// The in-memory state of a DOS label.
#[derive(Clone, Debug, Default)]
pub struct DosLabel {
    ptes: Vec<Pte>,
    ext_offset: u64,
    compatible: bool,
    linux_only: bool,
    boxes: Boxes,
    non_pt_changed: bool,
    changed: bool,
}

impl DosLabel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start partitions on track boundaries like DOS does.
    pub fn compatible(self, v: bool) -> Self {
        Self { compatible: v, ..self }
    }

    /// Only Linux uses the disk. More than one bootable partition is fine then.
    pub fn linux_only(self, v: bool) -> Self {
        Self { linux_only: v, ..self }
    }

    pub fn boxes(self, v: Boxes) -> Self {
        Self { boxes: v, ..self }
    }

    /// Switch the compatibility mode of a probed label.
    pub fn enable_compatible(&mut self, cxt: &mut Context, v: bool) {
        self.compatible = v;
        if v && !cxt.is_listonly() {
            cxt.warn(format_args!(
                "DOS-compatible mode is deprecated. Expect partitions that are not aligned."
            ));
        }
        self.reset_alignment(cxt);
    }

    pub fn is_compatible(&self) -> bool {
        self.compatible
    }

    /// The first sector of the extended partition. Zero if there is none.
    pub fn extended_offset(&self) -> u64 {
        self.ext_offset
    }

    /// The slot of the extended partition.
    pub fn extended_partno(&self) -> Option<usize> {
        self.ext_index()
    }

    fn ensure_init(&self) -> Result<()> {
        match self.ptes.is_empty() {
            true => Err(fail!(Unsupported, "there is no DOS label")),
            false => Ok(()),
        }
    }

    fn check_partno(&self, n: usize) -> Result<()> {
        self.ensure_init()?;
        if n >= self.ptes.len() {
            return Err(fail!(InvalidInput, "partition {} does not exist", n + 1));
        }
        Ok(())
    }

    /// Run `f` and roll back every change to the table if it fails.
    fn transaction<T>(
        &mut self,
        cxt: &mut Context,
        f: impl FnOnce(&mut Self, &mut Context) -> Result<T>,
    ) -> Result<T> {
        let label = self.clone();
        let sector = cxt.first_sector().to_vec();
        let (first_lba, grain) = (cxt.first_lba(), cxt.grain());
        let res = f(self, cxt);
        if let Err(err) = &res {
            log::debug!("dos: rolling back: {err}");
            *self = label;
            cxt.first_sector_mut().copy_from_slice(&sector);
            cxt.set_first_lba(first_lba);
            cxt.set_grain(grain);
        }
        res
    }

    /// Move the beginning of the data of partition `n`.
    pub fn move_begin(&mut self, cxt: &mut Context, n: usize) -> Result<()> {
        self.check_partno(n)?;
        self.transaction(cxt, |label, cxt| label.move_data_begin(cxt, n))
    }

    /// Recalculate the CHS addresses. Returns the number of changed entries.
    pub fn fix_chs(&mut self, cxt: &mut Context) -> Result<usize> {
        self.ensure_init()?;
        Ok(self.fix_all_chs(cxt))
    }
}

impl Label for DosLabel {
    fn name(&self) -> &'static str {
        "dos"
    }

    fn probe(&mut self, cxt: &mut Context) -> Result<bool> {
        self.probe_label(cxt)
    }

    fn create(&mut self, cxt: &mut Context) -> Result<()> {
        self.create_label(cxt)
    }

    fn write(&mut self, cxt: &mut Context) -> Result<()> {
        self.ensure_init()?;
        self.write_label(cxt)
    }

    fn verify(&self, cxt: &Context) -> Result<usize> {
        self.ensure_init()?;
        Ok(self.verify_label(cxt))
    }

    fn locate(&self, cxt: &Context, n: usize) -> Result<Location> {
        self.ensure_init()?;
        self.locate_record(cxt, n)
    }

    fn get_item(&self, cxt: &Context, item: Item) -> Option<LabelItem> {
        self.ensure_init().ok()?;
        self.label_item(cxt, item)
    }

    fn set_id(&mut self, cxt: &mut Context, id: Option<&str>) -> Result<()> {
        self.ensure_init()?;
        self.transaction(cxt, |label, cxt| label.set_disk_id(cxt, id))
    }

    fn get_part(&self, cxt: &Context, n: usize) -> Result<Partition> {
        self.check_partno(n)?;
        Ok(self.partition_view(cxt, n))
    }

    fn set_part(&mut self, cxt: &mut Context, n: usize, pa: &Partition) -> Result<()> {
        self.check_partno(n)?;
        self.transaction(cxt, |label, cxt| label.set_partition(cxt, n, pa))
    }

    fn add_part(&mut self, cxt: &mut Context, pa: Option<&Partition>) -> Result<usize> {
        self.ensure_init()?;
        let pa = pa.cloned().unwrap_or_default();
        self.transaction(cxt, |label, cxt| label.add_with_template(cxt, &pa))
    }

    fn del_part(&mut self, cxt: &mut Context, n: usize) -> Result<()> {
        self.check_partno(n)?;
        self.transaction(cxt, |label, cxt| label.delete_partition(cxt, n))
    }

    fn reorder(&mut self, cxt: &mut Context) -> Result<bool> {
        self.ensure_init()?;
        self.transaction(cxt, |label, cxt| label.fix_order(cxt))
    }

    fn toggle_flag(&mut self, cxt: &mut Context, n: usize, flag: Flag) -> Result<()> {
        self.check_partno(n)?;
        self.toggle_partition_flag(cxt, n, flag)
    }

    fn part_is_used(&self, cxt: &Context, n: usize) -> bool {
        n < self.ptes.len() && self.entry(cxt, n).is_used()
    }

    fn nparts_max(&self) -> usize {
        self.ptes.len()
    }

    fn is_changed(&self) -> bool {
        self.changed || self.non_pt_changed || self.ptes.iter().any(|pe| pe.changed)
    }

    fn reset_alignment(&self, cxt: &mut Context) {
        cxt.reset_alignment();
        if self.compatible {
            let sectors = cxt.geom().sectors as u64;
            if sectors != 0 {
                cxt.set_first_lba(sectors);
            }
            cxt.set_grain(cxt.get_sector_size());
        }
    }

    fn deinit(&mut self) {
        *self = Self {
            compatible: self.compatible,
            linux_only: self.linux_only,
            boxes: self.boxes,
            ..Self::default()
        };
    }
}
