//! Cylinder/Head/Sector addressing.

/// A CHS address as stored in a partition entry.
///
/// The sector is 1-based and at most 63.  The cylinder has 10 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Chs {
    pub cylinder: u16,
    pub head: u8,
    pub sector: u8,
}

impl Chs {
    pub const fn new(cylinder: u16, head: u8, sector: u8) -> Self {
        Self { cylinder, head, sector }
    }

    /// Unpack the three on-disk bytes.
    pub const fn from_bytes(b: [u8; 3]) -> Self {
        Self {
            head: b[0],
            sector: b[1] & 0x3f,
            cylinder: b[2] as u16 | ((b[1] as u16 & 0xc0) << 2),
        }
    }

    /// Pack into the three on-disk bytes.
    pub const fn to_bytes(self) -> [u8; 3] {
        [
            self.head,
            (self.sector & 0x3f) | ((self.cylinder >> 2) as u8 & 0xc0),
            self.cylinder as u8,
        ]
    }

    /// The value stored for addresses that do not fit.
    pub fn sentinel(heads: u32, sectors: u32) -> Self {
        if heads == 0 || sectors == 0 {
            return Self::new(1023, 254, 63);
        }
        Self::new(1023, (heads.min(256) - 1) as u8, sectors.min(63) as u8)
    }

    /// Convert an absolute sector into CHS for the geometry.
    ///
    /// Saturates to the [`sentinel`](Self::sentinel) if the address does not fit.
    pub fn from_lba(lba: u64, heads: u32, sectors: u32) -> Self {
        if heads == 0 || sectors == 0 || lba > u32::MAX as u64 {
            return Self::sentinel(heads, sectors);
        }
        let (heads, sectors) = (heads as u64, sectors as u64);
        let c = lba / (heads * sectors);
        if c >= 1024 || heads > 256 || sectors > 63 {
            return Self::sentinel(heads as u32, sectors as u32);
        }
        Self {
            cylinder: c as u16,
            head: ((lba / sectors) % heads) as u8,
            sector: (lba % sectors + 1) as u8,
        }
    }

    /// The absolute sector of this address, `None` for a zero sector.
    ///
    /// The value of an [overflowed](Self::is_overflowed) address is meaningless.
    pub fn to_lba(self, heads: u32, sectors: u32) -> Option<u64> {
        if self.sector == 0 {
            return None;
        }
        let (heads, sectors) = (heads as u64, sectors as u64);
        Some((self.cylinder as u64 * heads + self.head as u64) * sectors + self.sector as u64 - 1)
    }

    /// Whether this is one of the saturated values written for large disks.
    pub fn is_overflowed(self) -> bool {
        self.cylinder == 1023 && (self.head == 254 || self.head == 255) && self.sector == 63
    }

    /// All-zero is what unused entries carry.
    pub fn is_zero(self) -> bool {
        self == Self::default()
    }
}

impl core::fmt::Display for Chs {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(fmt, "{}/{}/{}", self.cylinder, self.head, self.sector)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::string::ToString;

    #[test]
    fn packing() {
        let chs = Chs::new(1023, 254, 63);
        assert_eq!(chs.to_bytes(), [0xfe, 0xff, 0xff]);
        assert_eq!(Chs::from_bytes([0xfe, 0xff, 0xff]), chs);
        assert_eq!(Chs::new(0x1ab, 3, 5).to_bytes(), [3, 0x45, 0xab]);
        for b1 in 0..=255u8 {
            let b = [7, b1, 0x42];
            if b1 & 0x3f != 0 {
                assert_eq!(Chs::from_bytes(b).to_bytes(), b);
            }
        }
    }

    #[test]
    fn lba_round_trip() {
        let (h, s) = (255, 63);
        let limit = h as u64 * s as u64 * 1024;
        let mut lba = 0;
        while lba < limit {
            let chs = Chs::from_lba(lba, h, s);
            assert_eq!(chs.to_lba(h, s), Some(lba), "{lba} {chs}");
            lba += 997;
        }
        for lba in [0, 62, 63, 16064, 16065, limit - 1] {
            assert_eq!(Chs::from_lba(lba, h, s).to_lba(h, s), Some(lba));
        }
        // small geometries have to round-trip too
        for lba in 0..16 * 4 * 1024 {
            assert_eq!(Chs::from_lba(lba, 16, 4).to_lba(16, 4), Some(lba));
        }
    }

    #[test]
    fn known_values() {
        assert_eq!(Chs::from_lba(2048, 255, 63), Chs::new(0, 32, 33));
        assert_eq!(Chs::from_lba(2099199, 255, 63), Chs::new(130, 170, 40));
        assert_eq!(Chs::from_lba(0, 255, 63), Chs::new(0, 0, 1));
    }

    #[test]
    fn overflow() {
        let big = 255 * 63 * 1024;
        assert_eq!(Chs::from_lba(big, 255, 63), Chs::new(1023, 254, 63));
        assert_eq!(Chs::from_lba(1 << 33, 255, 63), Chs::new(1023, 254, 63));
        assert_eq!(Chs::from_lba(5, 0, 63), Chs::new(1023, 254, 63));
        assert_eq!(Chs::from_lba(big, 16, 32), Chs::new(1023, 15, 32));
        assert!(Chs::new(1023, 255, 63).is_overflowed());
        assert!(Chs::new(1023, 254, 63).is_overflowed());
        assert!(!Chs::new(1023, 253, 63).is_overflowed());
        assert_eq!(Chs::new(1023, 254, 63).to_lba(255, 63), Some(big - 1));
        assert_eq!(Chs::default().to_lba(255, 63), None);
        assert_eq!(Chs::new(1, 2, 3).to_string(), "1/2/3");
    }
}
