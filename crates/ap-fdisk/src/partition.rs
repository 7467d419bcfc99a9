//! A partition as template for changes and as view of the table.

use serde::Serialize;

/// A partition.
///
/// As a template every unset field is asked for or defaulted.  As a view
/// the label fills in what it knows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    /// Zero-based partition number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partno: Option<usize>,
    /// Absolute first sector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// Number of sectors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub parttype: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootable: Option<bool>,

    /// Take the default start without asking.
    #[serde(skip)]
    pub start_follow_default: bool,
    /// Take the default end without asking.
    #[serde(skip)]
    pub end_follow_default: bool,
    /// The size is exact and the end is not aligned.
    #[serde(skip)]
    pub size_explicit: bool,

    pub used: bool,
    /// Holds other partitions.
    pub container: bool,
    pub logical: bool,
    /// The partition number of the container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_chs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_chs: Option<String>,
}

impl Partition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partno(self, v: usize) -> Self {
        Self { partno: Some(v), ..self }
    }

    pub fn start(self, v: u64) -> Self {
        Self { start: Some(v), ..self }
    }

    pub fn size(self, v: u64) -> Self {
        Self { size: Some(v), ..self }
    }

    pub fn parttype(self, v: u8) -> Self {
        Self {
            parttype: Some(v),
            ..self
        }
    }

    pub fn bootable(self, v: bool) -> Self {
        Self {
            bootable: Some(v),
            ..self
        }
    }

    /// Do not align the end.
    pub fn explicit(self, v: bool) -> Self {
        Self {
            size_explicit: v,
            ..self
        }
    }

    /// Take the defaults for unset start and end instead of asking.
    pub fn follow_default(self, v: bool) -> Self {
        Self {
            start_follow_default: v,
            end_follow_default: v,
            ..self
        }
    }

    /// The last sector, if start and size are known.
    pub fn end(&self) -> Option<u64> {
        match (self.start, self.size) {
            (Some(start), Some(size)) if size > 0 => Some(start + size - 1),
            _ => None,
        }
    }
}
