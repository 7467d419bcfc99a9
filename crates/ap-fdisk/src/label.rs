//! The interface every partition table type implements.

use crate::{Context, Partition, Result};

/// Generic properties of a label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Item {
    Id,
    FirstLba,
    LastLba,
    AltLba,
    EntriesNum,
}

/// The value of an [`Item`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelItem {
    pub name: &'static str,
    pub value: ItemValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemValue {
    Str(String),
    Num(u64),
}

/// Where a part of the label is stored on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub name: &'static str,
    /// In bytes.
    pub offset: u64,
    pub size: usize,
}

/// Partition flags that can be toggled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    /// The partition is bootable.
    Active,
    /// A label specific bit.
    Other(u64),
}

/// A partition table type.
///
/// Partition numbers are zero-based.  Operations that change the table
/// leave it untouched when they fail.
pub trait Label {
    fn name(&self) -> &'static str;

    /// Read the label from the first sector. `false` if it is not ours.
    fn probe(&mut self, cxt: &mut Context) -> Result<bool>;

    /// Start with an empty label.
    fn create(&mut self, cxt: &mut Context) -> Result<()>;

    /// Write every changed sector to the disk.
    fn write(&mut self, cxt: &mut Context) -> Result<()>;

    /// Check the table and return the number of errors found.
    fn verify(&self, cxt: &Context) -> Result<usize>;

    /// Location of the `n`-th on-disk structure, starting with zero.
    fn locate(&self, cxt: &Context, n: usize) -> Result<Location>;

    fn get_item(&self, cxt: &Context, item: Item) -> Option<LabelItem>;

    /// Change the disk identifier. Asks if no value is given.
    fn set_id(&mut self, cxt: &mut Context, id: Option<&str>) -> Result<()>;

    fn get_part(&self, cxt: &Context, n: usize) -> Result<Partition>;

    fn set_part(&mut self, cxt: &mut Context, n: usize, pa: &Partition) -> Result<()>;

    /// Add a partition and return its number.
    fn add_part(&mut self, cxt: &mut Context, pa: Option<&Partition>) -> Result<usize>;

    fn del_part(&mut self, cxt: &mut Context, n: usize) -> Result<()>;

    /// Sort the partitions by their start. `false` if nothing had to change.
    fn reorder(&mut self, cxt: &mut Context) -> Result<bool>;

    fn toggle_flag(&mut self, cxt: &mut Context, n: usize, flag: Flag) -> Result<()>;

    fn part_is_used(&self, cxt: &Context, n: usize) -> bool;

    /// The current upper bound of partition numbers.
    fn nparts_max(&self) -> usize;

    /// Whether there is something to write.
    fn is_changed(&self) -> bool;

    /// Apply the label specific alignment on top of the defaults.
    fn reset_alignment(&self, cxt: &mut Context) {
        cxt.reset_alignment();
    }

    /// Forget the table.
    fn deinit(&mut self);
}
