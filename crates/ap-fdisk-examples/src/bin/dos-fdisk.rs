//! Edit a DOS partition table.
//!
//! # Usage
//!
//! The disk is given with `--device` and the operation as sub-command:
//!
//! - `list`              - print the table. `--raw` shows every entry, `--json` dumps it.
//! - `create`            - write an empty table.
//! - `add`               - add a partition. Unset values are asked for.
//! - `delete N`          - delete partition N.
//! - `set N`             - change start, size, type or the boot flag of partition N.
//! - `toggle N`          - toggle the boot flag.
//! - `verify`            - check the table.
//! - `reorder`           - sort the partitions into disk order.
//! - `fix-chs`           - recalculate the CHS addresses.
//! - `move-begin N`      - move the beginning of the data of partition N.
//! - `set-id [ID]`       - change the disk identifier.
//! - `locate [N]`        - where table N is stored. The MBR is 0, the EBRs follow.
//!
//! Partition numbers start at one.  Without `--script` the questions are
//! answered on the terminal; an empty answer takes the default.
use ap_fdisk::{
    size_to_human, Context, Dialog, Flag, Item, ItemValue, Label, LabelItem, Level, NumberQuery, NumberReply, Partition,
    Units,
};
use ap_fdisk_dos::DosLabel;
use ap_storage::{check, msg2err, Error, Offset, Read, Write};
use ap_storage_linux::{LinuxDisk, LinuxDiskRW};
use core::str::FromStr;
use gumdrop::Options;
use std::io::Write as _;

#[derive(Debug, Options)]
struct CommandOptions {
    /// Print the help message.
    help: bool,
    /// The disk image or block device.
    #[options(meta = "PATH", required)]
    device: String,
    /// The bytes to skip in the disk file.
    #[options(meta = "N")]
    offset: Offset,
    /// Do not write.
    dry_run: bool,
    /// Take the defaults instead of asking.
    script: bool,
    /// DOS-compatible mode. Partitions start on track boundaries.
    compat: bool,
    /// Show and ask positions in cylinders.
    cylinders_units: bool,

    /// Logical sector size in bytes.
    #[options(meta = "N")]
    sector_size: UnsetField<u64>,
    /// Number of heads.
    #[options(meta = "N")]
    heads: UnsetField<u32>,
    /// Sectors per track.
    #[options(meta = "N")]
    sectors: UnsetField<u32>,
    /// Number of cylinders.
    #[options(meta = "N")]
    cylinders: UnsetField<u64>,

    #[options(command)]
    command: Option<Command>,
}

#[derive(Debug, Options)]
enum Command {
    #[options(help = "print the partition table")]
    List(ListOptions),
    #[options(help = "create an empty partition table")]
    Create(CreateOptions),
    #[options(help = "add a partition")]
    Add(AddOptions),
    #[options(help = "delete a partition")]
    Delete(PartOptions),
    #[options(help = "change a partition")]
    Set(SetOptions),
    #[options(help = "toggle the bootable flag")]
    Toggle(PartOptions),
    #[options(help = "check the partition table")]
    Verify(NoOptions),
    #[options(help = "sort the partitions into disk order")]
    Reorder(NoOptions),
    #[options(help = "recalculate the CHS addresses")]
    FixChs(NoOptions),
    #[options(help = "move the beginning of the data of a partition")]
    MoveBegin(PartOptions),
    #[options(help = "change the disk identifier")]
    SetId(IdOptions),
    #[options(help = "show where a partition table is stored")]
    Locate(TableOptions),
}

impl Command {
    fn modifies(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Verify(_) | Self::Locate(_))
    }
}

#[derive(Debug, Options)]
struct NoOptions {
    help: bool,
}

#[derive(Debug, Options)]
struct ListOptions {
    help: bool,
    /// Show every entry including the links.
    raw: bool,
    /// Dump the table as JSON.
    json: bool,
}

#[derive(Debug, Options)]
struct CreateOptions {
    help: bool,
    /// The disk identifier. Random if not given.
    label_id: UnsetField<String>,
}

#[derive(Debug, Options)]
struct AddOptions {
    help: bool,
    /// Partition number.
    #[options(meta = "N")]
    partno: UnsetField<usize>,
    /// First sector.
    #[options(meta = "N")]
    start: UnsetField<u64>,
    /// Size in sectors.
    #[options(meta = "N")]
    size: UnsetField<u64>,
    /// Partition type in hex.
    #[options(meta = "HEX", long = "type", no_short)]
    parttype: UnsetField<String>,
    /// Mark it bootable.
    bootable: bool,
    /// Do not align the end.
    explicit: bool,
}

#[derive(Debug, Options)]
struct SetOptions {
    help: bool,
    #[options(free)]
    partno: Vec<usize>,
    /// First sector.
    #[options(meta = "N")]
    start: UnsetField<u64>,
    /// Size in sectors.
    #[options(meta = "N")]
    size: UnsetField<u64>,
    /// Partition type in hex.
    #[options(meta = "HEX", long = "type", no_short)]
    parttype: UnsetField<String>,
    /// Set or clear the bootable flag.
    #[options(meta = "BOOL")]
    bootable: UnsetField<bool>,
}

#[derive(Debug, Options)]
struct PartOptions {
    help: bool,
    #[options(free)]
    partno: Vec<usize>,
}

#[derive(Debug, Options)]
struct TableOptions {
    help: bool,
    #[options(free)]
    table: Vec<usize>,
}

#[derive(Debug, Options)]
struct IdOptions {
    help: bool,
    #[options(free)]
    id: Vec<String>,
}

#[derive(PartialEq, Default, Debug)]
struct UnsetField<T>(Option<T>);

impl<T> core::ops::Deref for UnsetField<T> {
    type Target = Option<T>;
    fn deref(&self) -> &Option<T> {
        &self.0
    }
}

impl<T: FromStr> FromStr for UnsetField<T> {
    type Err = T::Err;
    fn from_str(s: &str) -> Result<Self, <Self as FromStr>::Err> {
        Ok(Self(Some(T::from_str(s)?)))
    }
}

/// Log records on stderr.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// The level comes from `RUST_LOG` and defaults to warnings.
fn init_logging() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(log::LevelFilter::Warn);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Questions on the terminal.
struct Terminal;

impl Terminal {
    fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        std::io::stdout().flush().ok()?;
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().into()),
        }
    }
}

/// Parse `+N` or `+N{K,M,G,T,P}` into units of `unit` bytes.
fn parse_relative(s: &str, unit: u64) -> Option<u64> {
    let (digits, shift) = match s.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => {
            let shift = match c.to_ascii_uppercase() {
                'K' => 10,
                'M' => 20,
                'G' => 30,
                'T' => 40,
                'P' => 50,
                _ => return None,
            };
            (&s[..i], Some(shift))
        }
        _ => (s, None),
    };
    let value = digits.parse::<u64>().ok()?;
    match shift {
        Some(shift) => value.checked_mul(1 << shift).map(|bytes| bytes / unit.max(1)),
        None => Some(value),
    }
}

impl Dialog for Terminal {
    fn ask_number(&self, query: &NumberQuery) -> Option<NumberReply> {
        loop {
            let prompt = format!("{} ({}-{}, default {}): ", query.query, query.low, query.high, query.default);
            let answer = self.read_line(&prompt)?;
            let reply = match answer.strip_prefix('+') {
                _ if answer.is_empty() => Some(NumberReply::absolute(query.default)),
                Some(rest) => parse_relative(rest, query.unit).map(NumberReply::relative),
                None => answer.parse().ok().map(NumberReply::absolute),
            };
            match reply {
                Some(reply) => return Some(reply),
                None => println!("Invalid value."),
            }
        }
    }

    fn ask_menu(&self, query: &str, items: &[(char, &str)], default: char) -> Option<char> {
        for (key, text) in items {
            println!("   {key}   {text}");
        }
        let answer = self.read_line(&format!("{query} (default {default}): "))?;
        Some(answer.chars().next().unwrap_or(default))
    }

    fn ask_string(&self, query: &str) -> Option<String> {
        self.read_line(&format!("{query}: "))
    }

    fn message(&self, level: Level, msg: &str) {
        match level {
            Level::Info => println!("{msg}"),
            Level::Warn => eprintln!("{msg}"),
        }
    }
}

/// The zero-based partition number of a one-based argument.
fn partno(args: &[usize]) -> Result<usize, Error> {
    match args.first() {
        Some(&n) if n > 0 => Ok(n - 1),
        _ => Err(msg2err!("a partition number is required")),
    }
}

fn parse_type(s: &str) -> Result<u8, Error> {
    let hex = s.trim_start_matches("0x");
    u8::from_str_radix(hex, 16).map_err(|_| msg2err!(format!("invalid partition type {s:?}")))
}

fn print_table(cxt: &Context, label: &DosLabel, device: &str) -> Result<(), Error> {
    let sector_size = cxt.get_sector_size();
    let bytes = cxt.total_sectors() * sector_size;
    let geom = cxt.geom();
    println!(
        "Disk {device}: {}, {bytes} bytes, {} sectors",
        size_to_human(bytes),
        cxt.total_sectors()
    );
    println!(
        "Geometry: {} heads, {} sectors/track, {} cylinders",
        geom.heads, geom.sectors, geom.cylinders
    );
    println!("Units: sectors of 1 * {sector_size} = {sector_size} bytes");
    println!("Disklabel type: {}", label.name());
    if let Some(LabelItem { name, value: ItemValue::Str(id) }) = label.get_item(cxt, Item::Id) {
        println!("{name}: {id}");
    }
    println!();
    println!(
        "{:<16} {:>4} {:>12} {:>12} {:>12} {:>8} {:>2} Type",
        "Device", "Boot", "Start", "End", "Sectors", "Size", "Id"
    );
    for n in 0..label.nparts_max() {
        let p = label.get_part(cxt, n)?;
        let (Some(start), Some(size)) = (p.start, p.size) else {
            continue;
        };
        println!(
            "{:<16} {:>4} {start:>12} {:>12} {size:>12} {:>8} {:>2x} {}",
            format!("{device}{}", n + 1),
            if p.bootable == Some(true) { "*" } else { "" },
            start + size - 1,
            size_to_human(size * sector_size),
            p.parttype.unwrap_or_default(),
            p.type_name.unwrap_or("Unknown")
        );
    }
    if label.wrong_p_order(cxt).is_some() {
        println!();
        println!("Partition table entries are not in disk order.");
    }
    Ok(())
}

fn print_raw(cxt: &Context, label: &DosLabel) {
    println!(
        "{:>3} {:<4} {:>12} {:>4} {:>12} {:>4} {:>12} {:>10} {:>10}",
        "Nr", "Kind", "Sector", "Boot", "Begin", "Id", "End", "Start", "Size"
    );
    for e in label.list_entries(cxt) {
        println!(
            "{:>3} {:<4} {:>12} {:>#4x} {:>12} {:>4x} {:>12} {:>10} {:>10}",
            e.partno + 1,
            e.kind,
            e.sector,
            e.boot,
            e.begin,
            e.typ,
            e.end,
            e.lba,
            e.size
        );
    }
}

fn print_json(cxt: &Context, label: &DosLabel, device: &str) -> Result<(), Error> {
    let mut partitions = Vec::new();
    for n in 0..label.nparts_max() {
        let p = label.get_part(cxt, n)?;
        if p.used {
            partitions.push(p);
        }
    }
    let id = match label.get_item(cxt, Item::Id) {
        Some(LabelItem { value: ItemValue::Str(id), .. }) => id,
        _ => String::new(),
    };
    let dump = serde_json::json!({
        "partitiontable": {
            "label": label.name(),
            "id": id,
            "device": device,
            "unit": "sectors",
            "sectorsize": cxt.get_sector_size(),
            "partitions": partitions,
        }
    });
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}

fn main() -> Result<(), Error> {
    init_logging();
    let opts = CommandOptions::parse_args_default_or_exit();
    let Some(command) = &opts.command else {
        println!("{}", CommandOptions::usage());
        if let Some(commands) = CommandOptions::command_list() {
            println!();
            println!("Commands:");
            println!("{commands}");
        }
        return Err(msg2err!("no command given"));
    };
    let writing = command.modifies() && !opts.dry_run;
    log::debug!("{opts:?}");

    let (rw, ro);
    let (disk, size, writer): (&dyn Read, Offset, Option<&dyn Write>) = if writing {
        rw = check!(LinuxDiskRW::new(&opts.device, opts.offset));
        (&rw, check!(rw.size()), Some(&rw))
    } else {
        ro = check!(LinuxDisk::new(&opts.device, opts.offset));
        (&ro, check!(ro.size()), None)
    };

    let terminal = Terminal;
    let mut cxt = Context::with_size(disk, size)?
        .dialog(&terminal)
        .script(opts.script)
        .listonly(matches!(command, Command::List(_)));
    if let Some(writer) = writer {
        cxt = cxt.writer(writer);
    }
    if let Some(v) = *opts.sector_size {
        cxt = cxt.sector_size(v)?;
    }
    if opts.heads.is_some() || opts.sectors.is_some() || opts.cylinders.is_some() {
        cxt = cxt.geometry(
            opts.cylinders.unwrap_or(0),
            opts.heads.unwrap_or(255),
            opts.sectors.unwrap_or(63),
        )?;
    }
    if opts.cylinders_units {
        cxt = cxt.units(Units::Cylinders);
    }

    let mut label = DosLabel::new().compatible(opts.compat);
    if let Command::Create(create) = command {
        if let Some(id) = create.label_id.as_ref() {
            cxt = cxt.script_header("label-id", id);
        }
        label.create(&mut cxt)?;
    } else if !label.probe(&mut cxt)? {
        return Err(msg2err!(format!("{}: no DOS partition table", opts.device)));
    }

    match command {
        Command::List(list) if list.json => print_json(&cxt, &label, &opts.device)?,
        Command::List(list) => {
            label.is_garbage_table(&cxt);
            match list.raw {
                true => print_raw(&cxt, &label),
                false => print_table(&cxt, &label, &opts.device)?,
            }
        }
        Command::Create(_) => {}
        Command::Add(add) => {
            let mut pa = Partition::new().explicit(add.explicit);
            pa.partno = add.partno.map(|n| n.saturating_sub(1));
            pa.start = *add.start;
            pa.size = *add.size;
            pa.parttype = add.parttype.as_deref().map(parse_type).transpose()?;
            pa.bootable = add.bootable.then_some(true);
            let n = label.add_part(&mut cxt, Some(&pa))?;
            log::debug!("added partition {}", n + 1);
        }
        Command::Delete(part) => {
            let n = partno(&part.partno)?;
            label.del_part(&mut cxt, n)?;
            println!("Partition {} has been deleted.", n + 1);
        }
        Command::Set(set) => {
            let mut pa = Partition::new();
            pa.start = *set.start;
            pa.size = *set.size;
            pa.parttype = set.parttype.as_deref().map(parse_type).transpose()?;
            pa.bootable = *set.bootable;
            label.set_part(&mut cxt, partno(&set.partno)?, &pa)?;
        }
        Command::Toggle(part) => label.toggle_flag(&mut cxt, partno(&part.partno)?, Flag::Active)?,
        Command::Verify(_) => match label.verify(&cxt)? {
            0 => println!("No errors detected."),
            1 => println!("1 error detected."),
            n => println!("{n} errors detected."),
        },
        Command::Reorder(_) => {
            label.reorder(&mut cxt)?;
        }
        Command::FixChs(_) => {
            let n = label.fix_chs(&mut cxt)?;
            log::debug!("fixed {n} partitions");
        }
        Command::MoveBegin(part) => label.move_begin(&mut cxt, partno(&part.partno)?)?,
        Command::SetId(id) => label.set_id(&mut cxt, id.id.first().map(String::as_str))?,
        Command::Locate(locate) => {
            let n = locate.table.first().copied().unwrap_or(0);
            let loc = label.locate(&cxt, n)?;
            println!("{}: offset {:#x}, {} bytes", loc.name, loc.offset, loc.size);
        }
    }

    if !command.modifies() || !label.is_changed() {
        return Ok(());
    }
    if opts.dry_run {
        println!("Dry run. The partition table has not been written.");
        return Ok(());
    }
    label.write(&mut cxt)?;
    println!("The partition table has been altered.");
    Ok(())
}
