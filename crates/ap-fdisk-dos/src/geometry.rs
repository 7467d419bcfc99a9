//! Guess the disk geometry from the CHS values in the primary table.

use crate::DosLabel;
use ap_fdisk::Context;
use ap_mbr::Chs;

/// A sector together with the CHS address the table claims for it.
#[derive(Clone, Copy, Debug)]
struct Tuple {
    lba: u64,
    chs: Chs,
}

impl Tuple {
    fn fits(&self, heads: u32, sectors: u32) -> bool {
        self.chs.head as u32 <= heads - 1
            && self.chs.sector as u32 <= sectors
            && self.chs.to_lba(heads, sectors) == Some(self.lba)
    }
}

/// Find the first geometry that explains a pair of tuples.
///
/// Pairs of close tuples are tried before distant ones.  Pairs that lie on
/// the first cylinder say nothing about the number of heads and are skipped.
fn solve(tuples: &[Tuple]) -> Option<(u32, u32)> {
    for distance in 1..tuples.len() {
        for (a, b) in tuples.iter().zip(&tuples[distance..]) {
            if a.chs.cylinder == 0 && b.chs.cylinder == 0 {
                continue;
            }
            for sectors in 1..=63 {
                for heads in 1..=256 {
                    if a.fits(heads, sectors) && b.fits(heads, sectors) {
                        return Some((heads, sectors));
                    }
                }
            }
        }
    }
    None
}

impl DosLabel {
    /// Use the geometry the table was written with unless the user gave one.
    pub(crate) fn infer_geometry(&self, cxt: &mut Context) {
        let mut tuples = Vec::with_capacity(8);
        for i in 0..4 {
            let p = self.entry(cxt, i);
            if p.typ == 0 || !p.is_used() {
                continue;
            }
            let first = p.lba as u64;
            for (lba, chs) in [(first, p.begin), (first + p.size as u64 - 1, p.end)] {
                if chs.sector != 0 && !chs.is_overflowed() {
                    tuples.push(Tuple { lba, chs });
                }
            }
        }
        let Some((heads, sectors)) = solve(&tuples) else {
            log::debug!("dos: no geometry in {} CHS values", tuples.len());
            return;
        };
        if cxt.has_user_geometry() {
            log::debug!("dos: keeping the user geometry over {heads}/{sectors}");
            return;
        }
        cxt.set_geometry(heads, sectors);
    }
}
