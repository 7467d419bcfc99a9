//! End-to-end tests for the ap-fdisk-* crates.

#[cfg(test)]
mod tests {
    use ap_fdisk::{Context, Dialog, FdiskError, Flag, Label, Level, NumberQuery, NumberReply, Partition, Units};
    use ap_fdisk_dos::DosLabel;
    use ap_mbr::Chs;
    use ap_storage::Write;
    use ap_storage_memory::{MemoryDisk, ReadSlice};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    const DISK_SIZE: u64 = 20971520 * 512;

    /// Answers questions from prepared queues and records what was said.
    #[derive(Default)]
    struct Script {
        numbers: RefCell<VecDeque<NumberReply>>,
        menu: RefCell<VecDeque<char>>,
        queries: RefCell<Vec<String>>,
        messages: RefCell<Vec<(Level, String)>>,
    }

    impl Script {
        fn numbers(self, v: &[NumberReply]) -> Self {
            self.numbers.borrow_mut().extend(v);
            self
        }

        fn menu(self, v: &[char]) -> Self {
            self.menu.borrow_mut().extend(v);
            self
        }

        fn said(&self, level: Level, text: &str) -> bool {
            self.messages.borrow().iter().any(|(l, m)| *l == level && m.contains(text))
        }
    }

    impl Dialog for Script {
        fn ask_number(&self, query: &NumberQuery) -> Option<NumberReply> {
            self.queries.borrow_mut().push(query.query.clone());
            self.numbers.borrow_mut().pop_front()
        }

        fn ask_menu(&self, query: &str, _items: &[(char, &str)], _default: char) -> Option<char> {
            self.queries.borrow_mut().push(query.into());
            self.menu.borrow_mut().pop_front()
        }

        fn ask_string(&self, query: &str) -> Option<String> {
            self.queries.borrow_mut().push(query.into());
            None
        }

        fn message(&self, level: Level, msg: &str) {
            self.messages.borrow_mut().push((level, msg.into()));
        }
    }

    fn table(entries: &[(usize, u8, u32, u32)]) -> Vec<u8> {
        let mut sector = vec![0u8; 512];
        for &(i, typ, lba, size) in entries {
            ap_mbr::Partition {
                typ,
                lba,
                size,
                ..Default::default()
            }
            .encode(&mut sector, i);
        }
        ap_mbr::set_magic(&mut sector);
        sector
    }

    fn put(disk: &MemoryDisk, lba: u64, sector: &[u8]) {
        assert_eq!(disk.write_bytes(lba * 512, sector).unwrap(), sector.len());
    }

    fn sector(disk: &MemoryDisk, lba: u64) -> Vec<u8> {
        disk.snapshot(lba * 512, 512)
    }

    fn s1(disk: &MemoryDisk) -> (Context<'_>, DosLabel) {
        let mut cxt = Context::new(disk)
            .unwrap()
            .writer(disk)
            .script_header("label-id", "0xDEADBEEF");
        let mut label = DosLabel::new();
        label.create(&mut cxt).unwrap();
        label.write(&mut cxt).unwrap();
        (cxt, label)
    }

    /// An extended partition with two logical ones in DOS-compatible mode.
    fn s3(disk: &MemoryDisk) -> (Context<'_>, DosLabel) {
        let mut cxt = Context::new(disk).unwrap().writer(disk).script(true);
        let mut label = DosLabel::new().compatible(true);
        label.create(&mut cxt).unwrap();
        assert_eq!(cxt.first_lba(), 63);
        let ext = Partition::new().start(4196352).size(8388608).parttype(0x05);
        assert_eq!(label.add_part(&mut cxt, Some(&ext)).unwrap(), 0);
        for n in [4, 5] {
            let pa = Partition::new().partno(n).size(2097089);
            assert_eq!(label.add_part(&mut cxt, Some(&pa)).unwrap(), n);
        }
        (cxt, label)
    }

    #[test]
    fn create_empty() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let (_, label) = s1(&disk);
        assert!(!label.is_changed());
        let mbr = sector(&disk, 0);
        assert_eq!(&mbr[0x1b8..0x1bc], &[0xef, 0xbe, 0xad, 0xde]);
        assert_eq!(&mbr[0x1fe..], &[0x55, 0xaa]);
        assert!(mbr[0x1be..0x1fe].iter().all(|&b| b == 0));
        assert_eq!(disk.writes(), vec![0]);
    }

    #[test]
    fn single_primary() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let (mut cxt, mut label) = s1(&disk);
        let pa = Partition::new().start(2048).size(2097152).parttype(0x83);
        assert_eq!(label.add_part(&mut cxt, Some(&pa)).unwrap(), 0);
        label.write(&mut cxt).unwrap();

        let p = ap_mbr::Partition::decode(&sector(&disk, 0), 0);
        assert_eq!(p.boot, 0);
        assert_eq!(p.typ, 0x83);
        assert_eq!(p.begin, Chs::from_lba(2048, 255, 63));
        assert_eq!(p.end, Chs::from_lba(2099199, 255, 63));
        assert_eq!(&sector(&disk, 0)[0x1c6..0x1ce], &[0x00, 0x08, 0, 0, 0, 0, 0x20, 0]);
        assert_eq!(label.verify(&cxt).unwrap(), 0);
    }

    #[test]
    fn extended_with_logicals() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let (mut cxt, mut label) = s3(&disk);
        label.write(&mut cxt).unwrap();
        assert_eq!(label.verify(&cxt).unwrap(), 0);

        let ext = ap_mbr::Partition::decode(&sector(&disk, 0), 0);
        assert!(ext.is_extended());
        assert_eq!((ext.lba, ext.size), (4196352, 8388608));

        let first = sector(&disk, 4196352);
        assert!(ap_mbr::has_magic(&first));
        let data = ap_mbr::Partition::decode(&first, 0);
        let link = ap_mbr::Partition::decode(&first, 1);
        assert_eq!((data.lba, data.size), (63, 2097089));
        assert_eq!((link.typ, link.lba), (0x05, 2097152));

        let second = sector(&disk, 4196352 + 2097152);
        assert!(ap_mbr::has_magic(&second));
        let data = ap_mbr::Partition::decode(&second, 0);
        assert_eq!((data.lba, data.size), (63, 2097089));
        assert!(ap_mbr::Partition::decode(&second, 1).is_cleared());
    }

    #[test]
    fn delete_logical() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let (mut cxt, mut label) = s3(&disk);
        let nparts = label.nparts_max();
        let start = label.get_part(&cxt, 5).unwrap().start;

        label.del_part(&mut cxt, 4).unwrap();
        assert_eq!(label.nparts_max(), nparts - 1);
        assert_eq!(label.get_part(&cxt, 4).unwrap().start, start);
        assert_eq!(label.verify(&cxt).unwrap(), 0);

        label.write(&mut cxt).unwrap();
        let first = sector(&disk, 4196352);
        let data = ap_mbr::Partition::decode(&first, 0);
        assert_eq!(data.lba as u64, start.unwrap() - 4196352);
        assert!(ap_mbr::Partition::decode(&first, 1).is_cleared());
    }

    #[test]
    fn second_extended() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let (mut cxt, mut label) = s3(&disk);
        let mbr = cxt.first_sector().to_vec();
        let entries = label.list_entries(&cxt);

        let res = label.add_part(&mut cxt, Some(&Partition::new().parttype(0x85)));
        assert!(matches!(res, Err(FdiskError::Conflict(_))));
        assert_eq!(label.nparts_max(), 6);
        assert_eq!(cxt.first_sector(), &mbr[..]);
        assert_eq!(label.list_entries(&cxt), entries);
    }

    #[test]
    fn fix_chs_large_disk() {
        let disk = MemoryDisk::new(4 << 40);
        {
            let mut cxt = Context::new(&disk).unwrap().writer(&disk).script(true);
            let mut label = DosLabel::new();
            label.create(&mut cxt).unwrap();
            let pa = Partition::new().start(2048).size(4294967296);
            label.add_part(&mut cxt, Some(&pa)).unwrap();
            let p = label.get_part(&cxt, 0).unwrap();
            assert_eq!(p.start_chs.as_deref(), Some("0/32/33"));
            assert_eq!(p.end_chs.as_deref(), Some("1023/254/63"));
            label.write(&mut cxt).unwrap();
        }

        // drop the addresses as older tools did
        let mut mbr = sector(&disk, 0);
        mbr[0x1bf..0x1c2].fill(0);
        mbr[0x1c3..0x1c6].fill(0);
        put(&disk, 0, &mbr);

        let mut cxt = Context::new(&disk).unwrap().writer(&disk).script(true);
        let mut label = DosLabel::new();
        assert!(label.probe(&mut cxt).unwrap());
        assert_eq!(label.fix_chs(&mut cxt).unwrap(), 1);
        assert_eq!(label.fix_chs(&mut cxt).unwrap(), 0);
        label.write(&mut cxt).unwrap();
        let p = ap_mbr::Partition::decode(&sector(&disk, 0), 0);
        assert_eq!(p.begin, Chs::new(0, 32, 33));
        assert_eq!(p.end, Chs::new(1023, 254, 63));
    }

    #[test]
    fn probe_legacy_chain() {
        let disk = MemoryDisk::new(DISK_SIZE);
        put(&disk, 0, &table(&[(0, 0x83, 2048, 2048), (1, 0x05, 8192, 100000)]));
        put(&disk, 8192, &table(&[(0, 0x83, 2048, 1000), (1, 0x05, 10000, 10000)]));
        // an empty record in the middle of the chain
        put(&disk, 18192, &table(&[(1, 0x05, 20000, 10000)]));
        put(&disk, 28192, &table(&[(0, 0x83, 2048, 1000)]));

        let script = Script::default();
        let mut cxt = Context::new(&disk).unwrap().dialog(&script).script(true);
        let mut label = DosLabel::new();
        assert!(label.probe(&mut cxt).unwrap());
        assert_eq!(label.nparts_max(), 6);
        assert!(script.said(Level::Info, "omitting empty partition (6)"));
        assert_eq!(label.get_part(&cxt, 5).unwrap().start, Some(28192 + 2048));
        assert_eq!(label.verify(&cxt).unwrap(), 0);
    }

    #[test]
    fn chain_out_of_disk_order() {
        let disk = MemoryDisk::new(DISK_SIZE);
        put(&disk, 0, &table(&[(0, 0x05, 8192, 100000)]));
        put(&disk, 8192, &table(&[(0, 0x83, 2048, 1000), (1, 0x05, 20000, 10000)]));
        put(&disk, 28192, &table(&[(0, 0x83, 2048, 1000), (1, 0x05, 10000, 10000)]));
        put(&disk, 18192, &table(&[(0, 0x83, 2048, 1000)]));

        let script = Script::default();
        let mut cxt = Context::new(&disk).unwrap().dialog(&script).script(true);
        let mut label = DosLabel::new();
        assert!(label.probe(&mut cxt).unwrap());
        assert_eq!(label.nparts_max(), 7);
        assert_eq!(label.verify(&cxt).unwrap(), 0);
        assert!(script.said(Level::Warn, "The extended boot records are not in disk order."));

        // sorted again by a reorder
        assert!(label.reorder(&mut cxt).unwrap());
        let starts: Vec<_> = (4..7).map(|n| label.get_part(&cxt, n).unwrap().start).collect();
        assert_eq!(starts, [Some(10240), Some(20240), Some(30240)]);
        script.messages.borrow_mut().clear();
        assert_eq!(label.verify(&cxt).unwrap(), 0);
        assert!(!script.said(Level::Warn, "not in disk order"));
    }

    #[test]
    fn data_over_record() {
        let disk = MemoryDisk::new(DISK_SIZE);
        put(&disk, 0, &table(&[(0, 0x05, 8192, 100000)]));
        put(&disk, 8192, &table(&[(0, 0x83, 2048, 20000), (1, 0x05, 10000, 30000)]));
        put(&disk, 18192, &table(&[(0, 0x83, 20000, 1000)]));

        let script = Script::default();
        let mut cxt = Context::new(&disk).unwrap().dialog(&script).script(true);
        let mut label = DosLabel::new();
        assert!(label.probe(&mut cxt).unwrap());
        assert_eq!(label.verify(&cxt).unwrap(), 1);
        assert!(script.said(Level::Warn, "Partition 5: covers the table of partition 6."));
    }

    #[test]
    fn record_without_magic() {
        let disk = MemoryDisk::new(DISK_SIZE);
        put(&disk, 0, &table(&[(0, 0x05, 8192, 100000)]));
        put(&disk, 8192, &table(&[(0, 0x83, 2048, 1000), (1, 0x05, 10000, 10000)]));
        let mut ebr = table(&[(0, 0x83, 2048, 1000)]);
        ebr[0x1fe..].fill(0);
        put(&disk, 18192, &ebr);
        disk.clear_writes();

        let script = Script::default();
        let mut cxt = Context::new(&disk).unwrap().writer(&disk).dialog(&script).script(true);
        let mut label = DosLabel::new();
        assert!(label.probe(&mut cxt).unwrap());
        assert!(script.said(Level::Info, "will be corrected by w(rite)"));
        assert!(label.is_changed());

        label.write(&mut cxt).unwrap();
        assert_eq!(disk.writes(), [0, 18192 * 512]);
        assert!(ap_mbr::has_magic(&sector(&disk, 18192)));
        assert_eq!(ap_mbr::Partition::decode(&sector(&disk, 18192), 0).lba, 2048);
        assert!(!label.is_changed());
    }

    #[test]
    fn partition_limit() {
        let disk = MemoryDisk::new(DISK_SIZE);
        put(&disk, 0, &table(&[(0, 0x05, 8192, 1000000)]));
        for k in 0..58u32 {
            let mut entries = vec![(0, 0x83, 2048, 1000)];
            if k < 57 {
                entries.push((1, 0x05, (k + 1) * 10000, 10000));
            }
            put(&disk, 8192 + k as u64 * 10000, &table(&entries));
        }
        disk.clear_writes();

        let script = Script::default();
        let mut cxt = Context::new(&disk).unwrap().writer(&disk).dialog(&script).script(true);
        let mut label = DosLabel::new();
        assert!(label.probe(&mut cxt).unwrap());
        assert_eq!(label.nparts_max(), 60);
        assert!(script.said(Level::Warn, "Omitting partitions after #60."));

        // the last record loses its link
        label.write(&mut cxt).unwrap();
        assert_eq!(disk.writes(), [558192 * 512]);
        assert!(ap_mbr::Partition::decode(&sector(&disk, 558192), 1).is_cleared());

        let res = label.add_part(&mut cxt, Some(&Partition::new().partno(60).size(100)));
        assert!(matches!(res, Err(FdiskError::NoSpace(_))));
        assert_eq!(label.nparts_max(), 60);

        let mut label = DosLabel::new();
        assert!(label.probe(&mut cxt).unwrap());
        assert_eq!(label.nparts_max(), 60);
    }

    #[test]
    fn probed_geometry() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let mut mbr = table(&[]);
        ap_mbr::Partition {
            typ: 0x83,
            begin: Chs::from_lba(2048, 16, 32),
            end: Chs::from_lba(10239, 16, 32),
            lba: 2048,
            size: 8192,
            ..Default::default()
        }
        .encode(&mut mbr, 0);
        put(&disk, 0, &mbr);

        let mut cxt = Context::new(&disk).unwrap().script(true);
        assert_eq!((cxt.geom().heads, cxt.geom().sectors), (255, 63));
        assert!(DosLabel::new().probe(&mut cxt).unwrap());
        assert_eq!((cxt.geom().heads, cxt.geom().sectors), (16, 32));

        // a geometry given by the user stays
        let mut cxt = Context::new(&disk).unwrap().geometry(0, 255, 63).unwrap();
        assert!(DosLabel::new().probe(&mut cxt).unwrap());
        assert_eq!((cxt.geom().heads, cxt.geom().sectors), (255, 63));
    }

    #[test]
    fn cylinder_units() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let script = Script::default().menu(&['p']).numbers(&[
            NumberReply::absolute(1),
            NumberReply::absolute(2),
            NumberReply::absolute(10),
        ]);
        let mut cxt = Context::new(&disk).unwrap().dialog(&script).units(Units::Cylinders);
        let mut label = DosLabel::new();
        label.create(&mut cxt).unwrap();
        assert!(script.said(Level::Warn, "Cylinders as display units are deprecated."));

        assert_eq!(label.add_part(&mut cxt, None).unwrap(), 0);
        let p = label.get_part(&cxt, 0).unwrap();
        assert_eq!((p.start, p.size), (Some(16065), Some(9 * 16065)));
        assert_eq!(
            script.queries.borrow()[1..],
            ["Partition number", "First cylinder", "Last cylinder, +cylinders or +size{K,M,G,T,P}"]
        );
    }

    #[test]
    fn list_image() {
        let mut image = vec![0u8; 64 << 20];
        image[..512].copy_from_slice(&table(&[(0, 0x0c, 2048, 8192), (1, 0x0f, 10240, 20480)]));
        image[10240 * 512..10241 * 512].copy_from_slice(&table(&[(0, 0x07, 2048, 4096)]));
        image[0x1be] = 0x80;

        let disk = ReadSlice(&image);
        let mut cxt = Context::new(&disk).unwrap().listonly(true);
        let mut label = DosLabel::new();
        assert!(label.probe(&mut cxt).unwrap());
        assert_eq!(cxt.total_sectors(), 131072);
        assert_eq!(label.nparts_max(), 5);
        assert!(!label.is_garbage_table(&cxt));

        let p = label.get_part(&cxt, 0).unwrap();
        assert_eq!((p.bootable, p.type_name), (Some(true), Some("W95 FAT32 (LBA)")));
        let p = label.get_part(&cxt, 4).unwrap();
        assert_eq!((p.start, p.parent), (Some(12288), Some(1)));
        assert_eq!(p.type_name, Some("HPFS/NTFS/exFAT"));
        assert_eq!(label.verify(&cxt).unwrap(), 0);

        label.toggle_flag(&mut cxt, 0, Flag::Active).unwrap();
        assert!(matches!(label.write(&mut cxt), Err(FdiskError::Unsupported(_))));
    }

    #[test]
    fn probe_write_identity() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let mut mbr = table(&[(0, 0x83, 2048, 2048), (1, 0x05, 8192, 100000)]);
        mbr[..4].copy_from_slice(&[0xfa, 0x31, 0xc0, 0x8e]);
        ap_mbr::set_disk_id(&mut mbr, 0x1234abcd);
        let mut ebr = table(&[(0, 0x83, 2048, 1000), (1, 0x05, 20000, 10000)]);
        ebr[..16].fill(0xab);
        put(&disk, 0, &mbr);
        put(&disk, 8192, &ebr);
        put(&disk, 28192, &table(&[(0, 0x83, 2048, 1000)]));
        let image: Vec<_> = [0, 8192, 28192].iter().map(|&lba| sector(&disk, lba)).collect();
        disk.clear_writes();

        let mut cxt = Context::new(&disk).unwrap().writer(&disk).script(true);
        let mut label = DosLabel::new();
        assert!(label.probe(&mut cxt).unwrap());
        assert!(!label.is_changed());
        label.write(&mut cxt).unwrap();
        assert!(disk.writes().is_empty());

        // touch both table sectors and restore their entries
        for n in [0, 4] {
            label.toggle_flag(&mut cxt, n, Flag::Active).unwrap();
            label.toggle_flag(&mut cxt, n, Flag::Active).unwrap();
        }
        assert!(label.is_changed());
        label.write(&mut cxt).unwrap();
        assert_eq!(disk.writes(), vec![0, 8192 * 512]);
        let after: Vec<_> = [0, 8192, 28192].iter().map(|&lba| sector(&disk, lba)).collect();
        assert_eq!(after, image);
    }

    #[test]
    fn delete_add_inverse() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let (mut cxt, mut label) = s3(&disk);
        let nparts = label.nparts_max();
        let entries = label.list_entries(&cxt);

        let n = label.add_part(&mut cxt, Some(&Partition::new().partno(6).size(1000))).unwrap();
        assert_eq!(n, 6);
        assert_eq!(label.nparts_max(), nparts + 1);
        label.del_part(&mut cxt, n).unwrap();
        assert_eq!(label.nparts_max(), nparts);
        assert_eq!(label.list_entries(&cxt), entries);
    }

    #[test]
    fn reorder_logicals() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let mut cxt = Context::new(&disk).unwrap().script(true);
        let mut label = DosLabel::new();
        label.create(&mut cxt).unwrap();
        let ext = Partition::new().start(2048).size(1 << 22).parttype(0x05);
        label.add_part(&mut cxt, Some(&ext)).unwrap();
        let late = Partition::new().partno(4).start(2048 + (1 << 21)).size(4096);
        let early = Partition::new().partno(5).start(4096).size(4096);
        label.add_part(&mut cxt, Some(&late)).unwrap();
        label.add_part(&mut cxt, Some(&early)).unwrap();
        assert_eq!(label.wrong_p_order(&cxt), Some((5, 4)));

        assert!(label.reorder(&mut cxt).unwrap());
        assert_eq!(label.wrong_p_order(&cxt), None);
        assert_eq!(label.get_part(&cxt, 4).unwrap().start, Some(4096));
        assert_eq!(label.get_part(&cxt, 5).unwrap().start, Some(2048 + (1 << 21)));
        assert_eq!(label.verify(&cxt).unwrap(), 0);

        let entries = label.list_entries(&cxt);
        assert!(!label.reorder(&mut cxt).unwrap());
        assert_eq!(label.list_entries(&cxt), entries);
    }

    #[test]
    fn interactive_add() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let script = Script::default().menu(&['p']).numbers(&[
            NumberReply::absolute(2),
            NumberReply::absolute(4096),
            NumberReply::relative(1 << 20),
        ]);
        let mut cxt = Context::new(&disk).unwrap().dialog(&script);
        let mut label = DosLabel::new();
        label.create(&mut cxt).unwrap();

        assert_eq!(label.add_part(&mut cxt, None).unwrap(), 1);
        let p = label.get_part(&cxt, 1).unwrap();
        assert_eq!((p.start, p.size), (Some(4096), Some(1 << 20)));
        assert_eq!(
            script.queries.borrow()[1..],
            ["Partition number", "First sector", "Last sector, +sectors or +size{K,M,G,T,P}"]
        );
        assert!(script.said(Level::Info, "Created a new partition 2 of type 'Linux' and of size 512 MiB."));
    }

    #[test]
    fn cancelled_add() {
        let disk = MemoryDisk::new(DISK_SIZE);
        let script = Script::default().menu(&['p']).numbers(&[NumberReply::absolute(1)]);
        let mut cxt = Context::new(&disk).unwrap().dialog(&script);
        let mut label = DosLabel::new();
        label.create(&mut cxt).unwrap();
        let mbr = cxt.first_sector().to_vec();

        assert!(matches!(label.add_part(&mut cxt, None), Err(FdiskError::Cancelled)));
        assert_eq!(cxt.first_sector(), &mbr[..]);
        assert!(!label.part_is_used(&cxt, 0));
    }
}
