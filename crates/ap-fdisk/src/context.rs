//! The editing context of a single disk.

use crate::{fail, Dialog, FdiskError, Level, NumberQuery, NumberReply, Result};
use ap_storage::{Read, ReadExt, Write, WriteExt};
use std::collections::BTreeMap;
use std::fmt::Arguments;

/// Cylinders, heads and sectors per track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub heads: u32,
    pub sectors: u32,
    pub cylinders: u64,
}

/// How positions are shown to the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Units {
    #[default]
    Sectors,
    Cylinders,
}

/// The direction to align a sector to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Up,
    Down,
    Nearest,
}

const DEFAULT_SECTOR_SIZE: u64 = 512;
const DEFAULT_HEADS: u32 = 255;
const DEFAULT_SECTORS: u32 = 63;
const MIB: u64 = 1 << 20;

/// Device properties, alignment and the services a label needs.
///
/// The context owns the first sector of the disk.  Labels keep their own
/// state and borrow the context for every operation.
pub struct Context<'a> {
    disk: &'a dyn Read,
    writer: Option<&'a dyn Write>,
    dialog: Option<&'a dyn Dialog>,
    first_sector: Vec<u8>,

    size: u64,
    sector_size: u64,
    phy_sector_size: u64,
    min_io_size: u64,
    alignment_offset: u64,
    total_sectors: u64,
    geom: Geometry,
    user_geom: bool,

    grain: u64,
    first_lba: u64,
    last_lba: u64,

    units: Units,
    listonly: bool,
    script: Option<BTreeMap<String, String>>,
    parent_is_gpt: bool,
    protect_bootbits: bool,
}

impl<'a> Context<'a> {
    /// Open a context on the disk. The size is detected.
    pub fn new(disk: &'a dyn Read) -> Result<Self> {
        Self::with_size(disk, disk.detect_size())
    }

    /// Open a context on a disk of the given size in bytes.
    pub fn with_size(disk: &'a dyn Read, size: u64) -> Result<Self> {
        let mut cxt = Self {
            disk,
            writer: None,
            dialog: None,
            first_sector: Vec::new(),
            size,
            sector_size: DEFAULT_SECTOR_SIZE,
            phy_sector_size: DEFAULT_SECTOR_SIZE,
            min_io_size: DEFAULT_SECTOR_SIZE,
            alignment_offset: 0,
            total_sectors: 0,
            geom: Geometry {
                heads: DEFAULT_HEADS,
                sectors: DEFAULT_SECTORS,
                cylinders: 0,
            },
            user_geom: false,
            grain: MIB,
            first_lba: 0,
            last_lba: 0,
            units: Units::Sectors,
            listonly: false,
            script: None,
            parent_is_gpt: false,
            protect_bootbits: false,
        };
        cxt.recount();
        cxt.read_first_sector()?;
        Ok(cxt)
    }

    /// Allow writes to the disk.
    pub fn writer(self, v: &'a dyn Write) -> Self {
        Self { writer: Some(v), ..self }
    }

    /// Ask questions and show notices through the dialog.
    pub fn dialog(self, v: &'a dyn Dialog) -> Self {
        Self { dialog: Some(v), ..self }
    }

    /// The logical sector size. A power of two of at least 512 bytes.
    pub fn sector_size(self, v: u64) -> Result<Self> {
        if !v.is_power_of_two() || v < DEFAULT_SECTOR_SIZE {
            return Err(fail!(InvalidInput, "sector size {v} is not a power of two >= 512"));
        }
        let mut cxt = Self {
            sector_size: v,
            phy_sector_size: core::cmp::max(v, self.phy_sector_size),
            min_io_size: core::cmp::max(v, self.min_io_size),
            ..self
        };
        cxt.recount();
        cxt.read_first_sector()?;
        Ok(cxt)
    }

    /// The physical sector size in bytes.
    pub fn physical_sector_size(self, v: u64) -> Result<Self> {
        if !v.is_power_of_two() || v < self.sector_size {
            return Err(fail!(InvalidInput, "physical sector size {v} is invalid"));
        }
        let mut cxt = Self { phy_sector_size: v, ..self };
        cxt.recount();
        Ok(cxt)
    }

    /// The minimal I/O size in bytes.
    pub fn min_io_size(self, v: u64) -> Result<Self> {
        if !v.is_power_of_two() || v < self.sector_size {
            return Err(fail!(InvalidInput, "minimal I/O size {v} is invalid"));
        }
        let mut cxt = Self { min_io_size: v, ..self };
        cxt.recount();
        Ok(cxt)
    }

    /// The offset of the first physically aligned byte.
    pub fn alignment_offset(self, v: u64) -> Self {
        let mut cxt = Self { alignment_offset: v, ..self };
        cxt.recount();
        cxt
    }

    /// Override the geometry. Zero cylinders are calculated from the size.
    pub fn geometry(self, cylinders: u64, heads: u32, sectors: u32) -> Result<Self> {
        if !(1..=256).contains(&heads) || !(1..=63).contains(&sectors) {
            return Err(fail!(InvalidInput, "geometry {heads}/{sectors} is out of range"));
        }
        let mut cxt = Self {
            geom: Geometry { heads, sectors, cylinders },
            user_geom: true,
            ..self
        };
        if cylinders == 0 {
            cxt.recount();
        }
        Ok(cxt)
    }

    pub fn units(self, v: Units) -> Self {
        Self { units: v, ..self }
    }

    /// Only print, never modify.
    pub fn listonly(self, v: bool) -> Self {
        Self { listonly: v, ..self }
    }

    /// Non-interactive mode. Every question takes its default.
    pub fn script(self, v: bool) -> Self {
        let script = match (v, self.script) {
            (true, None) => Some(BTreeMap::new()),
            (true, s) => s,
            (false, _) => None,
        };
        Self { script, ..self }
    }

    /// Set a script header. This implies script mode.
    pub fn script_header(self, key: &str, value: &str) -> Self {
        let mut script = self.script.unwrap_or_default();
        script.insert(key.into(), value.into());
        Self {
            script: Some(script),
            ..self
        }
    }

    /// The table is a hybrid MBR below a GPT.
    pub fn parent_is_gpt(self, v: bool) -> Self {
        Self { parent_is_gpt: v, ..self }
    }

    /// Keep the boot loader when creating a new label.
    pub fn protect_bootbits(self, v: bool) -> Self {
        Self {
            protect_bootbits: v,
            ..self
        }
    }

    fn read_first_sector(&mut self) -> Result<()> {
        self.first_sector = self.read_sector(0)?;
        Ok(())
    }

    /// Derive the sector counts from the size.
    fn recount(&mut self) {
        self.total_sectors = self.size / self.sector_size;
        if !self.user_geom || self.geom.cylinders == 0 {
            self.geom.cylinders = self.total_sectors / (self.geom.heads as u64 * self.geom.sectors as u64);
        }
        self.reset_alignment();
    }
}

/// Accessors.
impl Context<'_> {
    pub fn get_sector_size(&self) -> u64 {
        self.sector_size
    }

    pub fn get_physical_sector_size(&self) -> u64 {
        self.phy_sector_size
    }

    pub fn min_io(&self) -> u64 {
        self.min_io_size
    }

    pub fn align_offset(&self) -> u64 {
        self.alignment_offset
    }

    pub fn total_sectors(&self) -> u64 {
        self.total_sectors
    }

    pub fn geom(&self) -> Geometry {
        self.geom
    }

    pub fn has_user_geometry(&self) -> bool {
        self.user_geom
    }

    /// Use the heads and sectors found in a partition table.
    pub fn set_geometry(&mut self, heads: u32, sectors: u32) {
        log::debug!("geometry heads={heads} sectors={sectors}");
        self.geom.heads = heads;
        self.geom.sectors = sectors;
        self.geom.cylinders = self.total_sectors / (heads as u64 * sectors as u64);
    }

    /// The alignment unit in bytes.
    pub fn grain(&self) -> u64 {
        self.grain
    }

    /// The alignment unit in sectors.
    pub fn grain_sectors(&self) -> u64 {
        core::cmp::max(1, self.grain / self.sector_size)
    }

    pub fn set_grain(&mut self, v: u64) {
        self.grain = v;
    }

    /// The first sector usable for partitions.
    pub fn first_lba(&self) -> u64 {
        self.first_lba
    }

    pub fn set_first_lba(&mut self, v: u64) {
        self.first_lba = v;
    }

    pub fn last_lba(&self) -> u64 {
        self.last_lba
    }

    pub fn set_last_lba(&mut self, v: u64) {
        self.last_lba = v;
    }

    pub fn use_cylinders(&self) -> bool {
        self.units == Units::Cylinders
    }

    /// The number of sectors in one display unit.
    pub fn units_per_sector(&self) -> u64 {
        match self.units {
            Units::Sectors => 1,
            Units::Cylinders => self.geom.heads as u64 * self.geom.sectors as u64,
        }
    }

    /// A sector in display units. Cylinders count from one.
    pub fn cround(&self, lba: u64) -> u64 {
        match self.units {
            Units::Sectors => lba,
            Units::Cylinders => lba / self.units_per_sector() + 1,
        }
    }

    pub fn is_listonly(&self) -> bool {
        self.listonly
    }

    pub fn is_script(&self) -> bool {
        self.script.is_some()
    }

    pub fn has_dialogs(&self) -> bool {
        self.dialog.is_some() && self.script.is_none()
    }

    pub fn get_script_header(&self, key: &str) -> Option<&str> {
        self.script.as_ref()?.get(key).map(|s| s.as_str())
    }

    pub fn is_parent_gpt(&self) -> bool {
        self.parent_is_gpt
    }

    pub fn first_sector(&self) -> &[u8] {
        &self.first_sector
    }

    pub fn first_sector_mut(&mut self) -> &mut [u8] {
        &mut self.first_sector
    }

    /// Clear the first sector, keeping the boot loader if protected.
    pub fn zeroize_first_sector(&mut self) {
        let keep = if self.protect_bootbits { ap_mbr::BOOTBITS_SIZE } else { 0 };
        self.first_sector[keep..].fill(0);
    }

    /// A random 32-bit identifier.
    pub fn random_id(&self) -> u32 {
        rand::random()
    }
}

/// Sector I/O.
impl Context<'_> {
    pub fn read_sector(&self, lba: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.sector_size as usize];
        self.disk.read_sector(lba, &mut buf)?;
        Ok(buf)
    }

    pub fn write_sector(&self, lba: u64, buf: &[u8]) -> Result<()> {
        let writer = match self.writer {
            Some(w) if !self.listonly => w,
            _ => return Err(fail!(Unsupported, "the disk is opened read-only")),
        };
        log::debug!("write sector {lba:#x}");
        writer.write_sector(lba, &buf[..self.sector_size as usize])?;
        Ok(())
    }

    /// Make the written sectors durable.
    pub fn flush(&self) -> Result<()> {
        if let Some(w) = self.writer {
            w.flush()?;
        }
        Ok(())
    }
}

/// Questions and notices.
impl Context<'_> {
    fn active_dialog(&self) -> Option<&dyn Dialog> {
        match self.script {
            Some(_) => None,
            None => self.dialog,
        }
    }

    /// Ask for a number. The reply is checked against the range.
    ///
    /// Without a dialog the default is taken.
    pub fn ask_number(&self, query: &NumberQuery) -> Result<NumberReply> {
        let Some(dialog) = self.active_dialog() else {
            return Ok(NumberReply::absolute(query.default));
        };
        let reply = dialog.ask_number(query).ok_or(FdiskError::Cancelled)?;
        let value = match reply.relative {
            true => query.base.checked_add(reply.value),
            false => Some(reply.value),
        };
        match value {
            Some(value) if (query.low..=query.high).contains(&value) => Ok(NumberReply {
                value,
                relative: reply.relative,
            }),
            _ => {
                self.warn(format_args!("Value out of range."));
                Err(fail!(InvalidInput, "{} is not in {}..={}", reply.value, query.low, query.high))
            }
        }
    }

    pub fn ask_menu(&self, query: &str, items: &[(char, &str)], default: char) -> Result<char> {
        match self.active_dialog() {
            None => Ok(default),
            Some(dialog) => dialog.ask_menu(query, items, default).ok_or(FdiskError::Cancelled),
        }
    }

    /// Ask for a string. There is no default.
    pub fn ask_string(&self, query: &str) -> Result<String> {
        self.active_dialog()
            .and_then(|d| d.ask_string(query))
            .ok_or(FdiskError::Cancelled)
    }

    pub fn info(&self, args: Arguments) {
        self.message(Level::Info, args)
    }

    pub fn warn(&self, args: Arguments) {
        self.message(Level::Warn, args)
    }

    fn message(&self, level: Level, args: Arguments) {
        match (self.dialog, level) {
            (Some(dialog), _) => dialog.message(level, &args.to_string()),
            (None, Level::Info) => log::info!("{args}"),
            (None, Level::Warn) => log::warn!("{args}"),
        }
    }
}
