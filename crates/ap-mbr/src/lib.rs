//! MBR partition table - on-disk format.
//!
//! A table sector holds four 16-byte entries at [`PT_OFFSET`] followed by
//! the `55 aa` signature.  The master boot record additionally carries the
//! disk identifier at [`ID_OFFSET`].  Extended boot records use the same
//! layout but only the first two entries.
//!
//! All integers are little-endian.
#![no_std]

mod chs;
pub mod parttype;

pub use chs::Chs;

/// The size of the table sector that is actually used.
pub const SECTOR_SIZE: usize = 512;

/// Offset of the first partition entry.
pub const PT_OFFSET: usize = 0x1be;

/// The size of a single partition entry.
pub const ENTRY_SIZE: usize = 16;

/// Offset of the `55 aa` signature.
pub const MAGIC_OFFSET: usize = 0x1fe;

/// Offset of the 32-bit disk identifier in the MBR.
pub const ID_OFFSET: usize = 0x1b8;

/// The bytes before the disk identifier belong to the boot loader.
pub const BOOTBITS_SIZE: usize = 440;

/// Signature of an AIX boot record at the beginning of the disk.
pub const AIX_MAGIC: [u8; 4] = [0xc9, 0xc2, 0xd4, 0xc1];

/// The boot indicator of an active partition.
pub const ACTIVE: u8 = 0x80;

/// Type codes the label engine cares about.
pub const EMPTY: u8 = 0x00;
pub const DOS_EXTENDED: u8 = 0x05;
pub const W95_EXTENDED: u8 = 0x0f;
pub const LINUX_EXTENDED: u8 = 0x85;
pub const LINUX_DATA: u8 = 0x83;

/// Whether the type marks a container of logical partitions.
pub const fn is_extended(typ: u8) -> bool {
    matches!(typ, DOS_EXTENDED | W95_EXTENDED | LINUX_EXTENDED)
}

/// A single partition entry - in memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Boot indicator. Either `0` or [`ACTIVE`] on a sane disk.
    pub boot: u8,
    pub begin: Chs,
    pub typ: u8,
    pub end: Chs,
    /// First sector, relative to the table that holds the entry.
    pub lba: u32,
    /// Number of sectors.
    pub size: u32,
}

impl Partition {
    /// Decode entry `idx` of the table in `buf`.
    ///
    /// Panics if `idx > 3` or the buffer is shorter than a table sector.
    pub fn decode(buf: &[u8], idx: usize) -> Self {
        let e = &buf[entry_offset(idx)..][..ENTRY_SIZE];
        Self {
            boot: e[0],
            begin: Chs::from_bytes([e[1], e[2], e[3]]),
            typ: e[4],
            end: Chs::from_bytes([e[5], e[6], e[7]]),
            lba: u32::from_le_bytes([e[8], e[9], e[10], e[11]]),
            size: u32::from_le_bytes([e[12], e[13], e[14], e[15]]),
        }
    }

    /// Encode into entry `idx` of the table in `buf`. No other byte is touched.
    pub fn encode(&self, buf: &mut [u8], idx: usize) {
        let e = &mut buf[entry_offset(idx)..][..ENTRY_SIZE];
        e[0] = self.boot;
        e[1..4].copy_from_slice(&self.begin.to_bytes());
        e[4] = self.typ;
        e[5..8].copy_from_slice(&self.end.to_bytes());
        e[8..12].copy_from_slice(&self.lba.to_le_bytes());
        e[12..16].copy_from_slice(&self.size.to_le_bytes());
    }

    /// A used entry covers at least one sector.
    pub fn is_used(&self) -> bool {
        self.size != 0
    }

    /// Every field is zero.
    pub fn is_cleared(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_extended(&self) -> bool {
        is_extended(self.typ)
    }

    pub fn is_bootable(&self) -> bool {
        self.boot == ACTIVE
    }
}

/// Byte offset of entry `idx` inside a table sector.
pub const fn entry_offset(idx: usize) -> usize {
    assert!(idx < 4);
    PT_OFFSET + idx * ENTRY_SIZE
}

/// Whether the sector ends with the `55 aa` signature.
pub fn has_magic(buf: &[u8]) -> bool {
    buf.len() >= SECTOR_SIZE && buf[MAGIC_OFFSET] == 0x55 && buf[MAGIC_OFFSET + 1] == 0xaa
}

/// Stamp the `55 aa` signature.
pub fn set_magic(buf: &mut [u8]) {
    buf[MAGIC_OFFSET] = 0x55;
    buf[MAGIC_OFFSET + 1] = 0xaa;
}

/// Whether the sector starts with an AIX boot record.
pub fn has_aix_magic(buf: &[u8]) -> bool {
    buf.starts_with(&AIX_MAGIC)
}

/// The disk identifier of a master boot record.
pub fn disk_id(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[ID_OFFSET], buf[ID_OFFSET + 1], buf[ID_OFFSET + 2], buf[ID_OFFSET + 3]])
}

pub fn set_disk_id(buf: &mut [u8], id: u32) {
    buf[ID_OFFSET..ID_OFFSET + 4].copy_from_slice(&id.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Partition {
        Partition {
            boot: ACTIVE,
            begin: Chs::new(0, 32, 33),
            typ: LINUX_DATA,
            end: Chs::new(130, 170, 2),
            lba: 2048,
            size: 0x0020_0000,
        }
    }

    #[test]
    fn entry_layout() {
        let mut buf = [0u8; SECTOR_SIZE];
        sample().encode(&mut buf, 1);
        let e = &buf[0x1ce..0x1de];
        assert_eq!(e, &[0x80, 32, 33, 0, 0x83, 170, 2, 130, 0x00, 0x08, 0, 0, 0, 0, 0x20, 0]);
        assert_eq!(Partition::decode(&buf, 1), sample());
        // nothing else was touched
        assert!(buf[..0x1ce].iter().chain(&buf[0x1de..]).all(|&b| b == 0));
    }

    #[test]
    fn magic_and_id() {
        let mut buf = [0u8; SECTOR_SIZE];
        assert!(!has_magic(&buf));
        set_magic(&mut buf);
        assert!(has_magic(&buf));
        assert_eq!(&buf[0x1fe..], &[0x55, 0xaa]);

        set_disk_id(&mut buf, 0xdead_beef);
        assert_eq!(&buf[0x1b8..0x1bc], &[0xef, 0xbe, 0xad, 0xde]);
        assert_eq!(disk_id(&buf), 0xdead_beef);
        assert!(!has_magic(&buf[..100]));
    }

    #[test]
    fn extended_types() {
        for typ in 0..=255u8 {
            assert_eq!(is_extended(typ), [0x05, 0x0f, 0x85].contains(&typ), "{typ:#x}");
        }
        assert!(Partition::default().is_cleared());
        assert!(!Partition::default().is_used());
        assert!(sample().is_bootable());
    }
}
