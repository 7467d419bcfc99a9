//! Partition table editing.
//!
//! A [`Context`] wraps a disk together with its geometry, alignment and a
//! [`Dialog`] to the user.  Partition table types implement [`Label`] and
//! keep their own in-memory state while borrowing the context.

mod alignment;
mod context;
mod dialog;
mod error;
mod label;
mod partition;

pub use context::{Align, Context, Geometry, Units};
pub use dialog::{Dialog, Level, NumberQuery, NumberReply};
pub use error::{FdiskError, Result};
pub use label::{Flag, Item, ItemValue, Label, LabelItem, Location};
pub use partition::Partition;

/// Parse an identifier given as `0x`-prefixed hex or in the default radix.
pub fn parse_id(s: &str, radix: u32) -> Result<u32> {
    let s = s.trim();
    let res = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => u32::from_str_radix(s, radix),
    };
    res.map_err(|e| fail!(InvalidInput, "identifier {s:?}: {e}"))
}

/// Format a byte count with binary units and at most one decimal.
pub fn size_to_human(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
    let mut exp = 0;
    while exp + 1 < UNITS.len() && bytes >> (10 * (exp + 1)) != 0 {
        exp += 1;
    }
    if exp == 0 {
        return format!("{bytes} B");
    }
    let unit = 1u128 << (10 * exp);
    let tenths = (bytes as u128 * 10 + unit / 2) / unit;
    match tenths % 10 {
        0 => format!("{} {}", tenths / 10, UNITS[exp]),
        frac => format!("{}.{frac} {}", tenths / 10, UNITS[exp]),
    }
}
